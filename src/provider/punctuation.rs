//! Punctuation fields: reserved characters as ordinary fields
//!
//! Because these evaluate after parsing, they cannot embed a separator
//! inside the clause they appear in; variables are the escape mechanism
//! for that.

use crate::error::EvalError;
use crate::eval::EvalScope;
use crate::provider::{FieldProvider, FieldRef, Resolved};

const NAMESPACES: [&str; 16] = [
    "comma",
    "semicolon",
    "questionmark",
    "pipe",
    "percent",
    "ampersand",
    "openbrace",
    "closebrace",
    "openparens",
    "closeparens",
    "openbracket",
    "closebracket",
    "newline",
    "lf",
    "cr",
    "crlf",
];

pub struct PunctuationProvider;

impl FieldProvider for PunctuationProvider {
    fn namespaces(&self) -> &[&'static str] {
        &NAMESPACES
    }

    fn resolve(
        &self,
        field: &FieldRef<'_>,
        _scope: &mut EvalScope<'_, '_>,
    ) -> Result<Option<Resolved>, EvalError> {
        let value = match field.field {
            "comma" => ",",
            "semicolon" => ";",
            "questionmark" => "?",
            "pipe" => "|",
            "percent" => "%",
            "ampersand" => "&",
            "openbrace" => "{",
            "closebrace" => "}",
            "openparens" => "(",
            "closeparens" => ")",
            "openbracket" => "[",
            "closebracket" => "]",
            "newline" | "lf" => "\n",
            "cr" => "\r",
            "crlf" => "\r\n",
            _ => return Ok(None),
        };
        Ok(Some(Resolved::one(value)))
    }
}
