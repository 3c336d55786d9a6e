//! Error types for template parsing and evaluation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Malformed template string, reported before any evaluation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at offset {offset}: {reason}")]
pub struct SyntaxError {
    /// Byte offset into the template source
    pub offset: usize,
    pub reason: String,
}

impl SyntaxError {
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let end = (self.offset + 1).min(source.len().max(1));
        let span = self.offset.min(source.len())..end;
        Report::build(ReportKind::Error, filename, self.offset)
            .with_message(&self.reason)
            .with_label(
                Label::new((filename, span))
                    .with_message(&self.reason)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf)
            .ok();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Failures raised while evaluating a parsed template.
///
/// Empty field resolution is not an error; it triggers default
/// substitution instead.
#[derive(Error, Debug)]
pub enum EvalError {
    /// No provider claimed the field
    #[error("unknown template field: {}", field_display(.field, .subfield))]
    UnknownField {
        field: String,
        subfield: Option<String>,
    },

    #[error("unknown filter: {name}")]
    UnknownFilter { name: String },

    #[error("bad argument for filter {name}: {reason}")]
    BadFilterArg { name: String, reason: String },

    /// Value could not be converted to the requested type
    #[error("cannot convert '{value}' to {ty}")]
    Coercion { ty: String, value: String },

    #[error("variable '{name}' is not defined")]
    UnboundVariable { name: String },

    /// A multi-valued variable was expanded where a single value is required
    #[error("variable '{name}' holds {count} values where a single value is required")]
    AmbiguousVariable { name: String, count: usize },

    /// Misused numeric comparison operator
    #[error("invalid comparison: {reason}")]
    Comparison { reason: String },

    /// Provider-reported failure (I/O, parse)
    #[error("provider '{namespace}' failed: {source}")]
    Provider {
        namespace: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl EvalError {
    /// Wrap a provider failure for `namespace`
    pub fn provider(
        namespace: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        EvalError::Provider {
            namespace: namespace.into(),
            source: source.into(),
        }
    }

    pub fn unknown_field(field: impl Into<String>, subfield: Option<&str>) -> Self {
        EvalError::UnknownField {
            field: field.into(),
            subfield: subfield.map(str::to_string),
        }
    }
}

fn field_display(field: &str, subfield: &Option<String>) -> String {
    match subfield {
        Some(sf) => format!("{field}:{sf}"),
        None => field.to_string(),
    }
}
