//! String-formatting fields: `{strip,TEMPLATE}` and
//! `{format:TYPE:FORMAT,TEMPLATE}`
//!
//! Both consume the statement's default sub-template as their payload.
//! `format` coerces each rendered value to TYPE (`int`, `float`, `str`)
//! and applies a printf-style specification:
//! `[[fill]align][sign][#][0][width][.precision][type]` with align one of
//! `< > ^ =` and type one of `b d o x X e E f F s`.

use crate::error::EvalError;
use crate::eval::{vars, EvalScope};
use crate::provider::{FieldProvider, FieldRef, Resolved};

const NAMESPACES: [&str; 2] = ["format", "strip"];

pub struct FormatProvider;

impl FieldProvider for FormatProvider {
    fn namespaces(&self) -> &[&'static str] {
        &NAMESPACES
    }

    fn resolve(
        &self,
        field: &FieldRef<'_>,
        scope: &mut EvalScope<'_, '_>,
    ) -> Result<Option<Resolved>, EvalError> {
        let payload = match field.default {
            Some(tpl) => scope.render(tpl)?,
            None => Vec::new(),
        };
        match field.field {
            "strip" => {
                let values = payload.iter().map(|v| v.trim().to_string()).collect();
                Ok(Some(Resolved::consuming_default(values)))
            }
            "format" => {
                // the parser guarantees a TYPE:FORMAT subfield
                let Some((ty, spec)) = field.subfield.and_then(|sf| sf.split_once(':')) else {
                    return Ok(None);
                };
                let expanded = vars::expand(spec, scope.variables())?;
                let spec = parse_spec(&expanded)?;
                let mut values = Vec::with_capacity(payload.len());
                for value in &payload {
                    values.push(format_value(ty, value, &spec)?);
                }
                Ok(Some(Resolved::consuming_default(values)))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    ty: Option<char>,
}

fn bad_spec(spec: &str) -> EvalError {
    EvalError::provider("format", format!("invalid format specification '{spec}'"))
}

fn parse_spec(spec: &str) -> Result<FormatSpec, EvalError> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = FormatSpec::default();
    let mut i = 0;

    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().copied().is_some_and(is_align) {
        out.align = Some(chars[0]);
        i = 1;
    }

    if matches!(chars.get(i).copied(), Some('+' | '-' | ' ')) {
        out.sign = Some(chars[i]);
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        out.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        out.zero = true;
        i += 1;
    }
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        out.width = out.width * 10 + chars[i].to_digit(10).unwrap_or(0) as usize;
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        let mut precision = 0usize;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            precision = precision * 10 + chars[i].to_digit(10).unwrap_or(0) as usize;
            i += 1;
        }
        if i == start {
            return Err(bad_spec(spec));
        }
        out.precision = Some(precision);
    }
    if let Some(&c) = chars.get(i) {
        if !matches!(c, 'b' | 'd' | 'o' | 'x' | 'X' | 'e' | 'E' | 'f' | 'F' | 's') {
            return Err(bad_spec(spec));
        }
        out.ty = Some(c);
        i += 1;
    }
    if i != chars.len() {
        return Err(bad_spec(spec));
    }
    Ok(out)
}

fn format_value(ty: &str, value: &str, spec: &FormatSpec) -> Result<String, EvalError> {
    match ty {
        "int" => {
            // accept float strings, truncating toward zero
            let f: f64 = value.trim().parse().map_err(|_| EvalError::Coercion {
                ty: "int".to_string(),
                value: value.to_string(),
            })?;
            Ok(format_int(f.trunc() as i64, spec))
        }
        "float" => {
            let f: f64 = value.trim().parse().map_err(|_| EvalError::Coercion {
                ty: "float".to_string(),
                value: value.to_string(),
            })?;
            Ok(format_float(f, spec))
        }
        "str" => format_str(value, spec),
        _ => Err(EvalError::Coercion {
            ty: ty.to_string(),
            value: value.to_string(),
        }),
    }
}

fn format_int(v: i64, spec: &FormatSpec) -> String {
    let negative = v < 0;
    let magnitude = v.unsigned_abs();
    let (digits, prefix) = match spec.ty {
        Some('b') => (format!("{magnitude:b}"), "0b"),
        Some('o') => (format!("{magnitude:o}"), "0o"),
        Some('x') => (format!("{magnitude:x}"), "0x"),
        Some('X') => (format!("{magnitude:X}"), "0X"),
        Some('e') | Some('E') | Some('f') | Some('F') => {
            return format_float(v as f64, spec);
        }
        _ => (magnitude.to_string(), ""),
    };
    let prefix = if spec.alternate { prefix } else { "" };
    pad_number(digits, negative, prefix, spec)
}

fn format_float(v: f64, spec: &FormatSpec) -> String {
    let negative = v.is_sign_negative() && !v.is_nan();
    let magnitude = v.abs();
    let digits = match spec.ty {
        Some('e') => scientific(magnitude, spec.precision.unwrap_or(6), false),
        Some('E') => scientific(magnitude, spec.precision.unwrap_or(6), true),
        Some('f') | Some('F') => format!("{:.*}", spec.precision.unwrap_or(6), magnitude),
        _ => match spec.precision {
            Some(p) => format!("{magnitude:.p$}"),
            None => format!("{magnitude}"),
        },
    };
    pad_number(digits, negative, "", spec)
}

fn format_str(v: &str, spec: &FormatSpec) -> Result<String, EvalError> {
    if !matches!(spec.ty, None | Some('s')) || spec.sign.is_some() || spec.alternate {
        return Err(EvalError::provider(
            "format",
            format!("format specification not valid for str value '{v}'"),
        ));
    }
    let truncated: String = match spec.precision {
        Some(p) => v.chars().take(p).collect(),
        None => v.to_string(),
    };
    let fill = spec.fill.unwrap_or(' ');
    let align = spec.align.unwrap_or('<');
    Ok(pad(truncated, spec.width, fill, align))
}

/// Sign placement and zero padding for numeric output
fn pad_number(digits: String, negative: bool, prefix: &str, spec: &FormatSpec) -> String {
    let sign = if negative {
        "-"
    } else {
        match spec.sign {
            Some('+') => "+",
            Some(' ') => " ",
            _ => "",
        }
    };
    let (fill, align) = if spec.zero && spec.align.is_none() {
        ('0', '=')
    } else {
        (spec.fill.unwrap_or(' '), spec.align.unwrap_or('>'))
    };
    if align == '=' {
        let body_len = sign.chars().count() + prefix.chars().count() + digits.chars().count();
        let padding = spec.width.saturating_sub(body_len);
        let mut out = String::new();
        out.push_str(sign);
        out.push_str(prefix);
        for _ in 0..padding {
            out.push(fill);
        }
        out.push_str(&digits);
        out
    } else {
        pad(format!("{sign}{prefix}{digits}"), spec.width, fill, align)
    }
}

fn pad(content: String, width: usize, fill: char, align: char) -> String {
    let len = content.chars().count();
    if len >= width {
        return content;
    }
    let padding = width - len;
    match align {
        '<' => {
            let mut out = content;
            out.extend(std::iter::repeat(fill).take(padding));
            out
        }
        '^' => {
            let left = padding / 2;
            let mut out: String = std::iter::repeat(fill).take(left).collect();
            out.push_str(&content);
            out.extend(std::iter::repeat(fill).take(padding - left));
            out
        }
        _ => {
            let mut out: String = std::iter::repeat(fill).take(padding).collect();
            out.push_str(&content);
            out
        }
    }
}

/// `1.234560e+04`-style scientific notation with a signed two-digit
/// exponent
fn scientific(v: f64, precision: usize, upper: bool) -> String {
    let formatted = format!("{v:.precision$e}");
    let (mantissa, exponent) = match formatted.split_once('e') {
        Some(parts) => parts,
        None => (formatted.as_str(), "0"),
    };
    let exp: i32 = exponent.parse().unwrap_or(0);
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> FormatSpec {
        parse_spec(s).expect("should parse")
    }

    #[test]
    fn test_parse_spec_parts() {
        let s = spec("*^+10.2f");
        assert_eq!(s.fill, Some('*'));
        assert_eq!(s.align, Some('^'));
        assert_eq!(s.sign, Some('+'));
        assert_eq!(s.width, 10);
        assert_eq!(s.precision, Some(2));
        assert_eq!(s.ty, Some('f'));
    }

    #[test]
    fn test_parse_spec_rejects_garbage() {
        assert!(parse_spec("10q").is_err());
        assert!(parse_spec("1.").is_err());
    }

    #[test]
    fn test_int_zero_pad() {
        assert_eq!(format_value("int", "5", &spec("03d")).unwrap(), "005");
        assert_eq!(format_value("int", "-5", &spec("03d")).unwrap(), "-05");
    }

    #[test]
    fn test_int_from_float_string_truncates() {
        assert_eq!(format_value("int", "7.9", &spec("d")).unwrap(), "7");
        assert_eq!(format_value("int", "-7.9", &spec("d")).unwrap(), "-7");
    }

    #[test]
    fn test_int_bases() {
        assert_eq!(format_value("int", "255", &spec("x")).unwrap(), "ff");
        assert_eq!(format_value("int", "255", &spec("#X")).unwrap(), "0XFF");
        assert_eq!(format_value("int", "5", &spec("#b")).unwrap(), "0b101");
        assert_eq!(format_value("int", "8", &spec("o")).unwrap(), "10");
    }

    #[test]
    fn test_int_sign() {
        assert_eq!(format_value("int", "5", &spec("+d")).unwrap(), "+5");
        assert_eq!(format_value("int", "5", &spec(" d")).unwrap(), " 5");
        assert_eq!(format_value("int", "-5", &spec("+d")).unwrap(), "-5");
    }

    #[test]
    fn test_float_precision() {
        assert_eq!(format_value("float", "3.14159", &spec(".2f")).unwrap(), "3.14");
        assert_eq!(format_value("float", "2", &spec(".3f")).unwrap(), "2.000");
    }

    #[test]
    fn test_float_default_is_shortest() {
        assert_eq!(format_value("float", "3.5", &spec("")).unwrap(), "3.5");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(
            format_value("float", "12345.6789", &spec(".2e")).unwrap(),
            "1.23e+04"
        );
        assert_eq!(
            format_value("float", "0.00123", &spec(".1E")).unwrap(),
            "1.2E-03"
        );
    }

    #[test]
    fn test_str_width_and_align() {
        assert_eq!(format_value("str", "ab", &spec("6")).unwrap(), "ab    ");
        assert_eq!(format_value("str", "ab", &spec(">6")).unwrap(), "    ab");
        assert_eq!(format_value("str", "ab", &spec("*^6")).unwrap(), "**ab**");
    }

    #[test]
    fn test_str_precision_truncates() {
        assert_eq!(format_value("str", "abcdef", &spec(".3")).unwrap(), "abc");
    }

    #[test]
    fn test_str_rejects_numeric_spec() {
        assert!(format_value("str", "ab", &spec("+s")).is_err());
        assert!(format_value("str", "ab", &spec("d")).is_err());
    }

    #[test]
    fn test_coercion_failure() {
        let err = format_value("int", "abc", &spec("d")).unwrap_err();
        assert!(matches!(err, EvalError::Coercion { ty, .. } if ty == "int"));
    }

    #[test]
    fn test_numeric_center_align() {
        assert_eq!(format_value("int", "5", &spec("^5d")).unwrap(), "  5  ");
    }

    #[test]
    fn test_zero_pad_via_flag_vs_explicit_align() {
        assert_eq!(format_value("int", "-42", &spec("06d")).unwrap(), "-00042");
        assert_eq!(format_value("int", "-42", &spec("0>6d")).unwrap(), "000-42");
    }
}
