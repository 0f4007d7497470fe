//! Interactive browser-redirect surface.
//!
//! OAuth 2.0 opens an authorization URL in a host-provided surface and
//! watches navigation events until one carries an authorization code. The
//! host reports navigations and closure over a channel; dropping the
//! session frees the observer.

use async_trait::async_trait;

use tokio::sync::mpsc;

use crate::Result;

/// Something the redirect surface did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// The surface navigated to a URL.
    Navigated(String),
    /// The surface was closed without further navigation.
    Closed,
}

/// Host capable of opening an interactive redirect surface.
#[async_trait]
pub trait RedirectHost: Send + Sync {
    /// Open `url` interactively and stream navigation events back.
    async fn open(&self, url: &str) -> Result<RedirectSession>;
}

#[async_trait]
impl<T: RedirectHost + ?Sized> RedirectHost for std::sync::Arc<T> {
    async fn open(&self, url: &str) -> Result<RedirectSession> {
        (**self).open(url).await
    }
}

/// A live redirect surface.
///
/// Yields navigation events until the surface closes; a closed channel is
/// equivalent to an explicit [`NavigationEvent::Closed`].
#[derive(Debug)]
pub struct RedirectSession {
    events: mpsc::Receiver<NavigationEvent>,
}

impl RedirectSession {
    /// Wrap a host's event channel.
    pub fn new(events: mpsc::Receiver<NavigationEvent>) -> Self {
        Self { events }
    }

    /// Next navigation event, or `None` once the surface is gone.
    pub async fn next(&mut self) -> Option<NavigationEvent> {
        self.events.recv().await
    }
}
