use crate::domain::{AnalysisRecord, RhorError, RhorResult};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// JSON object of the record; non-finite values become `null`.
pub fn record_to_json(record: &AnalysisRecord) -> Value {
    let object: Map<String, Value> = record
        .iter()
        .map(|(key, value)| {
            let value = serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number);
            (key.clone(), value)
        })
        .collect();
    Value::Object(object)
}

pub fn render_record_json(record: &AnalysisRecord) -> RhorResult<String> {
    serde_json::to_string_pretty(&record_to_json(record)).map_err(|source| {
        RhorError::computation(
            "RUN.RECORD_SERIALIZE",
            format!("failed to serialize analysis record: {source}"),
        )
    })
}

pub fn write_record_json(path: &Path, record: &AnalysisRecord) -> RhorResult<()> {
    let rendered = render_record_json(record)?;
    fs::write(path, normalize_text_artifact(&rendered)).map_err(|source| {
        RhorError::io_system(
            "IO.RECORD_WRITE",
            format!(
                "failed to write analysis record '{}': {}",
                path.display(),
                source
            ),
        )
    })
}

/// Two-column `key value` listing, keys left-aligned.
pub fn render_record_table(record: &AnalysisRecord) -> String {
    let key_width = record.keys().map(String::len).max().unwrap_or(0);
    let mut rendered = String::new();
    for (key, value) in record {
        rendered.push_str(&format!(
            "{key:<key_width$} {}\n",
            format_fixed_f64(*value, 16, 6)
        ));
    }
    rendered
}
