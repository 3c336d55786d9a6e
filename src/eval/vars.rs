//! `%NAME` variable expansion for single-valued positions
//!
//! Delimiters, find/replace sides, and rendered filter arguments accept
//! `%NAME` references; `%%` escapes a literal percent. Expansion requires
//! the variable to hold exactly one value.

use std::collections::HashMap;

use crate::error::EvalError;

/// Expand variable references in `value` against `variables`.
///
/// A `%` not followed by a word character passes through literally.
pub fn expand(
    value: &str,
    variables: &HashMap<String, Vec<String>>,
) -> Result<String, EvalError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            out.push('%');
            continue;
        }
        let values = variables
            .get(&name)
            .ok_or_else(|| EvalError::UnboundVariable { name: name.clone() })?;
        match values.as_slice() {
            [single] => out.push_str(single),
            _ => {
                return Err(EvalError::AmbiguousVariable {
                    name,
                    count: values.len(),
                })
            }
        }
    }
    Ok(out)
}
