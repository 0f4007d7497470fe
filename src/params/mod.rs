//! Declarative parameter schemas for authentication strategies.
//!
//! A strategy describes its inputs as an ordered list of [`ParameterSpec`]
//! entries. Visibility rules are pure functions of the current
//! [`ResolvedValues`] and are re-evaluated after every value change; they
//! compute display metadata only and never have side effects. The one
//! exception is select options sourced from a remote lookup, which are
//! fetched through an idempotent, retry-safe [`OptionsProvider`].

mod values;

pub use values::{ResolvedValues, Value};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

/// One choice in a select parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// Human label.
    pub label: String,
    /// Stored value.
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Source of a select parameter's options.
#[derive(Clone)]
pub enum OptionsSource {
    /// Fixed list known at schema construction.
    Static(Vec<SelectOption>),
    /// Options fetched from a remote lookup. Fetches must be idempotent so
    /// the evaluator may retry them freely.
    Dynamic(Arc<dyn OptionsProvider>),
}

impl fmt::Debug for OptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsSource::Static(options) => f.debug_tuple("Static").field(options).finish(),
            OptionsSource::Dynamic(provider) => {
                f.debug_tuple("Dynamic").field(&provider.name()).finish()
            }
        }
    }
}

/// Remote source for select options.
#[async_trait]
pub trait OptionsProvider: Send + Sync {
    /// Provider name for debugging.
    fn name(&self) -> &str;

    /// Fetch the current option list. Must be idempotent.
    async fn options(&self) -> Result<Vec<SelectOption>>;
}

/// The kind of input a parameter accepts.
#[derive(Debug, Clone)]
pub enum ParameterKind {
    /// Free-form text.
    Text,
    /// Secret text (masked in UIs, redacted in logs).
    Secret,
    /// Boolean toggle.
    Checkbox,
    /// One-of-many choice.
    Select(OptionsSource),
    /// A named group of child parameters, evaluated recursively.
    Group(Vec<ParameterSpec>),
}

/// Display metadata computed by a visibility rule.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    /// Hide the parameter entirely.
    pub hidden: bool,
    /// Override the parameter's label.
    pub label: Option<String>,
    /// Override or supply a description.
    pub description: Option<String>,
    /// Override select options.
    pub options: Option<Vec<SelectOption>>,
}

impl DisplayState {
    /// Visible, no overrides.
    pub fn visible() -> Self {
        Self::default()
    }

    /// Hidden.
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::default()
        }
    }

    /// Visible with a replacement label.
    pub fn relabeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// A pure function from current values to display metadata.
pub type VisibilityRule = Arc<dyn Fn(&ResolvedValues) -> DisplayState + Send + Sync>;

/// One typed, optionally-dynamic strategy input.
#[derive(Clone)]
pub struct ParameterSpec {
    /// Unique key within the schema.
    pub name: String,
    /// Human label.
    pub label: String,
    /// Input kind.
    pub kind: ParameterKind,
    /// Fallback applied when the value is unset.
    pub default: Option<Value>,
    /// Unset required values are a validation error.
    pub required: bool,
    /// Value-dependent display rule, re-run after every change.
    pub visibility: Option<VisibilityRule>,
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("visibility", &self.visibility.as_ref().map(|_| "<rule>"))
            .finish()
    }
}

impl ParameterSpec {
    fn new(name: impl Into<String>, label: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            default: None,
            required: false,
            visibility: None,
        }
    }

    /// Free-form text input.
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, ParameterKind::Text)
    }

    /// Secret input.
    pub fn secret(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, ParameterKind::Secret)
    }

    /// Boolean toggle.
    pub fn checkbox(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, ParameterKind::Checkbox)
    }

    /// Static select.
    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self::new(name, label, ParameterKind::Select(OptionsSource::Static(options)))
    }

    /// Composite group of child parameters.
    pub fn group(
        name: impl Into<String>,
        label: impl Into<String>,
        children: Vec<ParameterSpec>,
    ) -> Self {
        Self::new(name, label, ParameterKind::Group(children))
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the parameter required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a visibility rule.
    pub fn with_visibility<F>(mut self, rule: F) -> Self
    where
        F: Fn(&ResolvedValues) -> DisplayState + Send + Sync + 'static,
    {
        self.visibility = Some(Arc::new(rule));
        self
    }
}

/// An ordered parameter list describing a strategy's inputs.
#[derive(Debug, Clone, Default)]
pub struct ParameterSchema {
    specs: Vec<ParameterSpec>,
}

/// One schema entry with its display state computed against current values.
#[derive(Debug)]
pub struct EvaluatedParameter<'a> {
    /// The underlying spec.
    pub spec: &'a ParameterSpec,
    /// Display metadata from the visibility rule (or the visible default).
    pub display: DisplayState,
    /// Evaluated children for group specs.
    pub children: Vec<EvaluatedParameter<'a>>,
}

impl ParameterSchema {
    pub fn new(specs: Vec<ParameterSpec>) -> Self {
        Self { specs }
    }

    /// The ordered spec list.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Find a spec by name, descending into groups.
    pub fn spec(&self, name: &str) -> Option<&ParameterSpec> {
        fn find<'a>(specs: &'a [ParameterSpec], name: &str) -> Option<&'a ParameterSpec> {
            for spec in specs {
                if spec.name == name {
                    return Some(spec);
                }
                if let ParameterKind::Group(children) = &spec.kind
                    && let Some(found) = find(children, name)
                {
                    return Some(found);
                }
            }
            None
        }
        find(&self.specs, name)
    }

    /// Re-run every visibility rule against `values`.
    ///
    /// Pure: computes display metadata only. Call after each value change.
    pub fn evaluate<'a>(&'a self, values: &ResolvedValues) -> Vec<EvaluatedParameter<'a>> {
        fn eval<'a>(
            specs: &'a [ParameterSpec],
            values: &ResolvedValues,
        ) -> Vec<EvaluatedParameter<'a>> {
            specs
                .iter()
                .map(|spec| {
                    let display = spec
                        .visibility
                        .as_ref()
                        .map(|rule| rule(values))
                        .unwrap_or_default();
                    let children = match &spec.kind {
                        ParameterKind::Group(children) => eval(children, values),
                        _ => Vec::new(),
                    };
                    EvaluatedParameter {
                        spec,
                        display,
                        children,
                    }
                })
                .collect()
        }
        eval(&self.specs, values)
    }

    /// Validate that every required, currently-visible parameter is set.
    pub fn validate(&self, values: &ResolvedValues) -> crate::Result<()> {
        fn check(
            evaluated: &[EvaluatedParameter<'_>],
            values: &ResolvedValues,
        ) -> crate::Result<()> {
            for entry in evaluated {
                if entry.display.hidden {
                    continue;
                }
                if entry.spec.required
                    && values.get(&entry.spec.name).is_none()
                    && entry.spec.default.is_none()
                {
                    return Err(crate::Error::invalid_configuration(format!(
                        "required parameter '{}' is not set",
                        entry.spec.name
                    )));
                }
                check(&entry.children, values)?;
            }
            Ok(())
        }
        check(&self.evaluate(values), values)
    }
}
