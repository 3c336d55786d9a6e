//! Provider dispatch: namespace routing for metadata fields
//!
//! A provider resolves fields for one or more namespaces without the
//! engine knowing its schema. The registry maps each namespace to an
//! ordered provider list; a provider may decline a field so the next one
//! in line gets a chance.

pub mod dates;
mod file;
mod format;
mod punctuation;

pub use file::FileProvider;
pub use format::FormatProvider;
pub use punctuation::PunctuationProvider;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EvalError;
use crate::eval::EvalScope;
use crate::parser::{FieldStmt, Template};

/// A field reference handed to providers: the parsed statement parts a
/// provider needs to produce values.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'t> {
    /// Namespace (the identifier before `:`), or the bare field name
    pub field: &'t str,
    pub subfield: Option<&'t str>,
    /// Dot-chained attribute path
    pub attributes: &'t [String],
    /// The statement's default sub-template; some fields consume it as
    /// their payload instead of leaving it for default substitution
    pub default: Option<&'t Template>,
}

impl<'t> FieldRef<'t> {
    pub(crate) fn from_stmt(stmt: &'t FieldStmt) -> Self {
        Self {
            field: &stmt.field,
            subfield: stmt.subfield.as_deref(),
            attributes: &stmt.attributes,
            default: stmt.default.as_ref(),
        }
    }
}

/// A provider's answer for a claimed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Ordered list of rendered values; empty means "field has no value"
    /// and triggers default substitution
    pub values: Vec<String>,
    /// Set when the provider used the default sub-template as payload,
    /// which suppresses default substitution for the statement
    pub consumed_default: bool,
}

impl Resolved {
    pub fn new(values: Vec<String>) -> Self {
        Self {
            values,
            consumed_default: false,
        }
    }

    pub fn one(value: impl Into<String>) -> Self {
        Self::new(vec![value.into()])
    }

    pub fn consuming_default(values: Vec<String>) -> Self {
        Self {
            values,
            consumed_default: true,
        }
    }
}

/// A pluggable resolver for one or more namespaces.
///
/// Providers must be safe for concurrent read invocation across files;
/// per-file state belongs in the render context's provider cache.
pub trait FieldProvider: Send + Sync {
    /// Namespaces this provider wants to be consulted for
    fn namespaces(&self) -> &[&'static str];

    /// Resolve a field, or decline with `Ok(None)` so the registry tries
    /// the next provider registered for the namespace.
    fn resolve(
        &self,
        field: &FieldRef<'_>,
        scope: &mut EvalScope<'_, '_>,
    ) -> Result<Option<Resolved>, EvalError>;
}

/// Namespace to ordered-provider-list mapping. Populated at startup and
/// read-only afterwards.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Vec<Arc<dyn FieldProvider>>>,
}

impl ProviderRegistry {
    /// An empty registry with no namespaces
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry carrying the engine's built-in namespaces
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PunctuationProvider));
        registry.register(Arc::new(FormatProvider));
        registry.register(Arc::new(FileProvider));
        registry
    }

    /// Register a provider after any already claiming its namespaces
    pub fn register(&mut self, provider: Arc<dyn FieldProvider>) {
        for ns in provider.namespaces() {
            self.providers
                .entry((*ns).to_string())
                .or_default()
                .push(provider.clone());
        }
    }

    /// Register a provider ahead of existing ones, overriding them for
    /// any field it does not decline
    pub fn register_override(&mut self, provider: Arc<dyn FieldProvider>) {
        for ns in provider.namespaces() {
            self.providers
                .entry((*ns).to_string())
                .or_default()
                .insert(0, provider.clone());
        }
    }

    /// All registered namespaces, sorted
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch a field to the providers registered for its namespace
    pub fn resolve(
        &self,
        field: &FieldRef<'_>,
        scope: &mut EvalScope<'_, '_>,
    ) -> Result<Resolved, EvalError> {
        let Some(candidates) = self.providers.get(field.field) else {
            return Err(EvalError::unknown_field(field.field, field.subfield));
        };
        for provider in candidates {
            if let Some(resolved) = provider.resolve(field, scope)? {
                return Ok(resolved);
            }
        }
        Err(EvalError::unknown_field(field.field, field.subfield))
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
