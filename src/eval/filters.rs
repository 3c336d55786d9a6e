//! The built-in filter catalog
//!
//! Every filter is `Vec<String> -> Vec<String>`; per-element filters treat
//! each value independently, list filters reshape the whole list. String
//! filters operate on characters, not bytes.

use crate::error::EvalError;

/// Filters that refuse to run without an argument
const REQUIRES_ARG: [&str; 10] = [
    "split", "chop", "chomp", "append", "prepend", "appends", "prepends", "remove", "slice",
    "sslice",
];

/// Apply the named filter. `arg` is the rendered argument text, if any.
pub fn apply(
    name: &str,
    arg: Option<&str>,
    mut values: Vec<String>,
) -> Result<Vec<String>, EvalError> {
    if REQUIRES_ARG.contains(&name) && arg.map_or(true, str::is_empty) {
        return Err(EvalError::BadFilterArg {
            name: name.to_string(),
            reason: "requires an argument".to_string(),
        });
    }
    let arg = arg.unwrap_or("");

    let out = match name {
        "lower" => each(values, |v| v.to_lowercase()),
        "upper" => each(values, |v| v.to_uppercase()),
        "strip" => each(values, |v| v.trim().to_string()),
        "capitalize" => each(values, capitalize),
        "titlecase" => each(values, titlecase),
        "braces" => each(values, |v| format!("{{{v}}}")),
        "parens" => each(values, |v| format!("({v})")),
        "brackets" => each(values, |v| format!("[{v}]")),
        "split" => values
            .iter()
            .flat_map(|v| v.split(arg).map(str::to_string))
            .collect(),
        "autosplit" => values
            .iter()
            .flat_map(|v| {
                v.replace([',', ';'], " ")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect(),
        "chop" => {
            let n = int_arg(name, arg)?;
            each(values, |v| {
                let len = v.chars().count();
                v.chars().take(len.saturating_sub(n)).collect()
            })
        }
        "chomp" => {
            let n = int_arg(name, arg)?;
            each(values, |v| v.chars().skip(n).collect())
        }
        "sort" => {
            values.sort();
            values
        }
        "rsort" => {
            values.sort_by(|a, b| b.cmp(a));
            values
        }
        "reverse" => {
            values.reverse();
            values
        }
        "uniq" => {
            let mut seen = Vec::new();
            for v in values {
                if !seen.contains(&v) {
                    seen.push(v);
                }
            }
            seen
        }
        "join" => vec![values.join(arg)],
        "append" => {
            values.push(arg.to_string());
            values
        }
        "prepend" => {
            values.insert(0, arg.to_string());
            values
        }
        "appends" => each(values, |v| format!("{v}{arg}")),
        "prepends" => each(values, |v| format!("{arg}{v}")),
        "remove" => values.into_iter().filter(|v| v != arg).collect(),
        "slice" => {
            let picked = slice_indices(values.len(), arg)
                .map_err(|reason| bad_arg(name, reason))?;
            picked.into_iter().map(|i| values[i].clone()).collect()
        }
        "sslice" => {
            let mut out = Vec::with_capacity(values.len());
            for v in &values {
                let chars: Vec<char> = v.chars().collect();
                let picked = slice_indices(chars.len(), arg)
                    .map_err(|reason| bad_arg(name, reason))?;
                out.push(picked.into_iter().map(|i| chars[i]).collect());
            }
            out
        }
        _ => {
            return Err(EvalError::UnknownFilter {
                name: name.to_string(),
            })
        }
    };
    Ok(out)
}

fn each(values: Vec<String>, f: impl Fn(String) -> String) -> Vec<String> {
    values.into_iter().map(f).collect()
}

fn bad_arg(name: &str, reason: impl Into<String>) -> EvalError {
    EvalError::BadFilterArg {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn int_arg(name: &str, arg: &str) -> Result<usize, EvalError> {
    arg.parse::<usize>()
        .map_err(|_| bad_arg(name, format!("expected a non-negative integer, got '{arg}'")))
}

/// Lowercase everything, then uppercase only the first character
fn capitalize(v: String) -> String {
    let lowered = v.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => lowered,
    }
}

/// Uppercase each letter that follows a non-letter, lowercase the rest
fn titlecase(v: String) -> String {
    let mut out = String::with_capacity(v.len());
    let mut prev_alpha = false;
    for c in v.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Resolve a `start:stop:step` range over a sequence of `len` elements,
/// with negative indices and negative steps
fn slice_indices(len: usize, arg: &str) -> Result<Vec<usize>, String> {
    let (start, stop, step) = parse_range(arg)?;
    let n = len as i64;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err("slice step cannot be zero".to_string());
    }

    let mut out = Vec::new();
    if step > 0 {
        let clamp = |v: i64| if v < 0 { (v + n).max(0) } else { v.min(n) };
        let start = start.map_or(0, clamp);
        let stop = stop.map_or(n, clamp);
        let mut i = start;
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        let clamp = |v: i64| if v < 0 { (v + n).max(-1) } else { v.min(n - 1) };
        let start = start.map_or(n - 1, clamp);
        let stop = stop.map_or(-1, clamp);
        let mut i = start;
        while i > stop {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

/// Parse `a`, `a:b`, or `a:b:c` with any part omissible
fn parse_range(arg: &str) -> Result<(Option<i64>, Option<i64>, Option<i64>), String> {
    let part = |s: &str| -> Result<Option<i64>, String> {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse::<i64>()
                .map(Some)
                .map_err(|_| format!("invalid slice index '{s}'"))
        }
    };
    let parts: Vec<&str> = arg.split(':').collect();
    match parts.as_slice() {
        [a] => Ok((Some(part(a)?.unwrap_or(0)), None, None)),
        [a, b] => Ok((part(a)?, part(b)?, None)),
        [a, b, c] => Ok((part(a)?, part(b)?, part(c)?)),
        _ => Err(format!("invalid slice '{arg}'")),
    }
}
