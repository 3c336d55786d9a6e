//! Date attribute rendering shared by the built-in time fields
//!
//! Every date-valued field exposes the attribute set
//! `date year yy month mon mm dd dow doy hour min sec strftime`;
//! `strftime` consumes the statement's default sub-template as its format
//! string. Providers for other date-valued namespaces can reuse
//! [`resolve_datetime`] to get the same attribute surface.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::error::EvalError;
use crate::eval::EvalScope;
use crate::parser::Template;
use crate::provider::Resolved;

/// ISO-style rendering used when no attribute or format is given
const DEFAULT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Render `dt` through the date attribute path of a statement.
pub fn resolve_datetime(
    namespace: &str,
    dt: DateTime<Local>,
    attributes: &[String],
    default: Option<&Template>,
    scope: &mut EvalScope<'_, '_>,
) -> Result<Resolved, EvalError> {
    let attribute = match attributes {
        [] => None,
        [single] => Some(single.as_str()),
        _ => {
            return Err(EvalError::unknown_field(
                namespace,
                Some(&attributes.join(".")),
            ))
        }
    };

    match attribute {
        None => Ok(Resolved::one(strftime(namespace, &dt, DEFAULT_FORMAT)?)),
        Some("strftime") => {
            // the format string is not parsed for %variables; '%Y' would
            // read as a reference
            let format = match default {
                Some(tpl) => scope.render_joined(tpl)?,
                None => DEFAULT_FORMAT.to_string(),
            };
            Ok(Resolved::consuming_default(vec![strftime(
                namespace, &dt, &format,
            )?]))
        }
        Some(attr) => {
            let code = match attr {
                "date" => "%Y-%m-%d",
                "year" => "%Y",
                "yy" => "%y",
                "month" => "%B",
                "mon" => "%b",
                "mm" => "%m",
                "dd" => "%d",
                "dow" => "%A",
                "doy" => "%j",
                "hour" => "%H",
                "min" => "%M",
                "sec" => "%S",
                _ => return Err(EvalError::unknown_field(namespace, Some(attr))),
            };
            Ok(Resolved::one(strftime(namespace, &dt, code)?))
        }
    }
}

/// Format with validation: chrono's formatter panics on bad specifiers
/// when driven through `Display`, so scan the items first.
fn strftime(namespace: &str, dt: &DateTime<Local>, format: &str) -> Result<String, EvalError> {
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.contains(&Item::Error) {
        return Err(EvalError::provider(
            namespace,
            format!("invalid strftime format '{format}'"),
        ));
    }
    Ok(dt.format_with_items(items.into_iter()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DateTime<Local> {
        Local.with_ymd_and_hms(2020, 2, 4, 19, 7, 38).unwrap()
    }

    #[test]
    fn test_strftime_valid() {
        assert_eq!(
            strftime("created", &sample(), "%Y-%m-%d-%H%M%S").unwrap(),
            "2020-02-04-190738"
        );
    }

    #[test]
    fn test_strftime_invalid_format_errors() {
        let err = strftime("created", &sample(), "%Q-bogus").unwrap_err();
        assert!(matches!(err, EvalError::Provider { .. }));
    }

    #[test]
    fn test_default_format_is_iso() {
        assert_eq!(
            strftime("created", &sample(), DEFAULT_FORMAT).unwrap(),
            "2020-02-04T19:07:38"
        );
    }
}
