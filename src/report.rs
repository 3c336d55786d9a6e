//! Output shaping for the CLI: record labels, CSV and JSON encoding

use std::collections::BTreeMap;

use serde_json::Value;

use metaplate::Template;

/// Split a `LABEL: {template}` or `LABEL={template}` prefix off a
/// template argument. The label may not contain braces or the separator.
pub fn split_label(source: &str) -> Option<(&str, &str)> {
    for sep in [':', '='] {
        if let Some(idx) = source.find(sep) {
            let label = &source[..idx];
            if !label.is_empty() && !label.contains(['{', '}']) {
                let rest = source[idx + 1..].trim_start();
                return Some((label, rest));
            }
        }
    }
    None
}

/// Column/key label for a template: an explicit prefix label, else the
/// first field name (with subfield), else the template text itself.
pub fn field_label(source: &str, template: &Template) -> String {
    if let Some((label, _)) = split_label(source) {
        return label.to_string();
    }
    match template.first_statement() {
        Some(stmt) => match &stmt.subfield {
            Some(sf) => format!("{}:{}", stmt.field, sf),
            None => stmt.field.clone(),
        },
        None => source.to_string(),
    }
}

/// Encode one CSV row with minimal quoting
pub fn csv_row(fields: &[String], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| csv_field(f, delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

fn csv_field(value: &str, delimiter: char) -> String {
    if value.contains([delimiter, '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One file's JSON record: single values as scalars, multi-values as
/// arrays, empty strings as null
pub fn json_record(columns: Vec<(String, Vec<String>)>) -> Value {
    let mut record = BTreeMap::new();
    for (label, values) in columns {
        let values: Vec<Value> = values
            .into_iter()
            .map(|v| {
                if v.is_empty() {
                    Value::Null
                } else {
                    Value::String(v)
                }
            })
            .collect();
        let value = match values.len() {
            0 => Value::Null,
            1 => values.into_iter().next().unwrap_or(Value::Null),
            _ => Value::Array(values),
        };
        record.insert(label, value);
    }
    serde_json::to_value(record).unwrap_or(Value::Null)
}
