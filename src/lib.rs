//! Metaplate - render per-file metadata strings with the Metadata
//! Template Language (MTL)
//!
//! A template is a mix of literal text and `{...}` statements. Statements
//! resolve fields through pluggable providers and run the results through
//! a modifier chain: filters, find/replace, conditionals, in-place
//! expansion, combine, boolean selection and default substitution. Every
//! value is an ordered list of strings; multi-valued fields fan out into
//! multiple rendered strings unless joined in place.
//!
//! # Example
//!
//! ```rust
//! use metaplate::{render_string, FileHandle, ProviderRegistry};
//!
//! let registry = ProviderRegistry::with_builtins();
//! let file = FileHandle::new("/music/warm_lights.mp3");
//! let values = render_string("{filepath.name}", &file, &registry).unwrap();
//! assert_eq!(values, vec!["warm_lights.mp3"]);
//! ```

pub mod error;
pub mod eval;
pub mod parser;
pub mod provider;

pub use error::{EvalError, SyntaxError};
pub use eval::{EvalScope, FileHandle, RenderContext, RenderOptions};
pub use parser::{parse, Template};
pub use provider::{FieldProvider, FieldRef, ProviderRegistry, Resolved};

use eval::Evaluator;
use thiserror::Error;

/// Errors surfaced by the one-shot [`render_string`] entry point
#[derive(Debug, Error)]
pub enum RenderError {
    /// Error while parsing the template string
    #[error("parse error: {0}")]
    Parse(#[from] SyntaxError),

    /// Error while evaluating the template
    #[error("render error: {0}")]
    Eval(#[from] EvalError),
}

/// Render a parsed template against one file with default options
pub fn render(
    template: &Template,
    file: &FileHandle,
    registry: &ProviderRegistry,
) -> Result<Vec<String>, EvalError> {
    render_with_options(template, file, registry, &RenderOptions::default())
}

/// Render a parsed template with host-tuned options.
///
/// A fresh evaluation context is created per call; `{var:...}` bindings
/// and the sticky `{today}` timestamp never outlive it.
pub fn render_with_options(
    template: &Template,
    file: &FileHandle,
    registry: &ProviderRegistry,
    options: &RenderOptions,
) -> Result<Vec<String>, EvalError> {
    let evaluator = Evaluator::new(registry, options);
    let mut ctx = RenderContext::new(file.clone());
    evaluator.eval_template(template, &mut ctx)
}

/// Parse and render a template string in one step
///
/// # Example
///
/// ```rust
/// use metaplate::{render_string, FileHandle, ProviderRegistry};
///
/// let registry = ProviderRegistry::with_builtins();
/// let file = FileHandle::new("/tmp/report.pdf");
/// let values = render_string("{filepath.suffix|upper|chomp(1)}", &file, &registry).unwrap();
/// assert_eq!(values, vec!["PDF"]);
/// ```
pub fn render_string(
    source: &str,
    file: &FileHandle,
    registry: &ProviderRegistry,
) -> Result<Vec<String>, RenderError> {
    let template = parse(source)?;
    Ok(render(&template, file, registry)?)
}
