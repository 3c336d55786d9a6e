//! Per-render evaluation state
//!
//! A [`RenderContext`] is created for each `(file, template)` render and
//! discarded afterwards; variable bindings never leak between renders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::parser::Template;

/// Opaque handle identifying the input artifact a template is rendered
/// against. The engine never touches the filesystem itself; providers
/// decide what, if anything, to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Host-tunable rendering options
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Substituted when a field is empty and the statement carries no
    /// default template
    pub none_str: String,
    /// Join every multi-valued field in place, as if `+` were present
    pub expand_inplace: bool,
    /// Separator used by `expand_inplace`
    pub inplace_sep: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            none_str: "_".to_string(),
            expand_inplace: false,
            inplace_sep: ",".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_none_str(mut self, none_str: impl Into<String>) -> Self {
        self.none_str = none_str.into();
        self
    }

    pub fn with_expand_inplace(mut self, sep: impl Into<String>) -> Self {
        self.expand_inplace = true;
        self.inplace_sep = sep.into();
        self
    }
}

type CacheKey = (String, Option<String>, Vec<String>);

/// Mutable state for one top-level render
#[derive(Debug)]
pub struct RenderContext {
    file: FileHandle,
    /// `{var:NAME,VALUE}` bindings, visible to lexically later reads
    pub(crate) variables: HashMap<String, Vec<String>>,
    /// Timestamp captured on first use of a sticky time field
    sticky_now: Option<DateTime<Local>>,
    /// Per-file cache of provider values keyed by
    /// (namespace, subfield, attribute path)
    cache: HashMap<CacheKey, Vec<String>>,
}

impl RenderContext {
    pub fn new(file: FileHandle) -> Self {
        Self {
            file,
            variables: HashMap::new(),
            sticky_now: None,
            cache: HashMap::new(),
        }
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    /// The sticky clock: captured once per context, then reused
    pub fn sticky_now(&mut self) -> DateTime<Local> {
        *self.sticky_now.get_or_insert_with(Local::now)
    }
}

/// Evaluation scope handed to providers.
///
/// Bundles the evaluator callback with the render context so a provider
/// can evaluate sub-templates (`format`, `strftime`, `strip`), read the
/// file handle, use the sticky clock, and cache per-file values.
pub struct EvalScope<'a, 'e> {
    pub(crate) evaluator: &'a Evaluator<'e>,
    pub(crate) ctx: &'a mut RenderContext,
}

impl EvalScope<'_, '_> {
    /// Evaluate a sub-template in the current context
    pub fn render(&mut self, template: &Template) -> Result<Vec<String>, EvalError> {
        self.evaluator.eval_template(template, self.ctx)
    }

    /// Evaluate a sub-template and flatten the result to one string
    pub fn render_joined(&mut self, template: &Template) -> Result<String, EvalError> {
        Ok(self.render(template)?.concat())
    }

    pub fn file(&self) -> &FileHandle {
        self.ctx.file()
    }

    /// Current `{var:...}` bindings, for providers that expand `%NAME`
    /// references in their payloads
    pub fn variables(&self) -> &HashMap<String, Vec<String>> {
        &self.ctx.variables
    }

    pub fn sticky_now(&mut self) -> DateTime<Local> {
        self.ctx.sticky_now()
    }

    /// Look up a previously cached value list
    pub fn cached(
        &self,
        namespace: &str,
        subfield: Option<&str>,
        attributes: &[String],
    ) -> Option<Vec<String>> {
        let key = (
            namespace.to_string(),
            subfield.map(str::to_string),
            attributes.to_vec(),
        );
        self.ctx.cache.get(&key).cloned()
    }

    /// Cache a value list for the remainder of this render
    pub fn cache_insert(
        &mut self,
        namespace: &str,
        subfield: Option<&str>,
        attributes: &[String],
        values: Vec<String>,
    ) {
        let key = (
            namespace.to_string(),
            subfield.map(str::to_string),
            attributes.to_vec(),
        );
        self.ctx.cache.insert(key, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_handle_path() {
        let file = FileHandle::new("/tmp/song.mp3");
        assert_eq!(file.path(), Path::new("/tmp/song.mp3"));
    }

    #[test]
    fn test_default_options() {
        let options = RenderOptions::default();
        assert_eq!(options.none_str, "_");
        assert!(!options.expand_inplace);
        assert_eq!(options.inplace_sep, ",");
    }

    #[test]
    fn test_sticky_now_is_cached() {
        let mut ctx = RenderContext::new(FileHandle::new("x"));
        let first = ctx.sticky_now();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(first, ctx.sticky_now());
    }
}
