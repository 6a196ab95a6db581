//! Window extraction from user records and source dataset files.
//!
//! Parsing is strict: one malformed window fails the whole extraction and
//! names the window, so "no data" is never confused with "some data dropped".

use crate::core::error::ExtractError;
use crate::core::tree::UserRecord;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;

/// Key of the JSON-encoded payload inside a store entry.
pub const PAYLOAD_KEY: &str = "js_data";

/// Default top-level key of the window array in a source dataset file.
pub const DEFAULT_FILE_KEY: &str = "couples";

/// The four biosignal statistics derived from one recording window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Mean galvanic skin response
    pub gsr_mean: f64,
    /// Count of GSR local peaks
    pub gsr_locals: f64,
    /// Mean heart rate
    pub hr_mean: f64,
    /// Mean derivative of the heart rate
    pub hr_mean_derivative: f64,
}

impl Sample {
    /// Feature row in the fixed column order.
    pub fn to_row(&self) -> [f64; 4] {
        [
            self.gsr_mean,
            self.gsr_locals,
            self.hr_mean,
            self.hr_mean_derivative,
        ]
    }
}

/// One parsed recording window with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Store key (or file position) the window came from
    #[serde(skip)]
    pub id: String,
    pub sample: Sample,
    #[serde(deserialize_with = "deserialize_label")]
    pub label: f64,
}

impl Window {
    /// Parse a JSON-encoded window payload.
    pub fn parse(id: &str, payload: &str) -> Result<Self, ExtractError> {
        let mut window: Window =
            serde_json::from_str(payload).map_err(|e| ExtractError::MalformedWindow {
                window_id: id.to_string(),
                reason: e.to_string(),
            })?;
        window.id = id.to_string();
        Ok(window)
    }

    /// Decode a window that is already a JSON object.
    pub fn from_value(id: &str, value: &Value) -> Result<Self, ExtractError> {
        let mut window =
            Window::deserialize(value).map_err(|e| ExtractError::MalformedWindow {
                window_id: id.to_string(),
                reason: e.to_string(),
            })?;
        window.id = id.to_string();
        Ok(window)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Labels arrive as numbers, numeric strings or booleans; all become `f64`.
fn deserialize_label<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawLabel::deserialize(deserializer)? {
        RawLabel::Number(v) => Ok(v),
        RawLabel::Flag(b) => Ok(if b { 1.0 } else { 0.0 }),
        RawLabel::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("label \"{s}\" is not numeric"))),
    }
}

/// Extract every window of `category` from a user record.
pub fn extract_windows(user: &UserRecord<'_>, category: &str) -> Result<Vec<Window>, ExtractError> {
    let entries = user
        .get(category)
        .ok_or_else(|| ExtractError::MissingCategory {
            category: category.to_string(),
        })?
        .as_object()
        .ok_or_else(|| ExtractError::MalformedCategory {
            category: category.to_string(),
        })?;

    let windows = entries
        .iter()
        .map(|(id, entry)| {
            let payload = entry_payload(entry).ok_or_else(|| ExtractError::MalformedWindow {
                window_id: id.clone(),
                reason: format!("entry has no `{PAYLOAD_KEY}` string payload"),
            })?;
            Window::parse(id, payload)
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        user = user.id(),
        category,
        count = windows.len(),
        "extracted windows"
    );
    Ok(windows)
}

/// An entry is either `{ "js_data": "<json>" }` or the bare JSON string.
fn entry_payload(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get(PAYLOAD_KEY).and_then(Value::as_str),
        _ => None,
    }
}

/// Extract windows from an in-memory source document.
pub fn windows_from_document(doc: &Value, key: &str) -> Result<Vec<Window>, ExtractError> {
    let items = doc
        .get(key)
        .ok_or_else(|| ExtractError::MissingCategory {
            category: key.to_string(),
        })?
        .as_array()
        .ok_or_else(|| ExtractError::MalformedCategory {
            category: key.to_string(),
        })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| Window::from_value(&format!("{key}[{i}]"), item))
        .collect()
}

/// Read windows from a source dataset file, bypassing the remote store.
pub fn windows_from_file(path: &Path, key: &str) -> Result<Vec<Window>, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|e| ExtractError::SourceFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let doc: Value = serde_json::from_str(&content).map_err(|e| ExtractError::SourceFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let windows = windows_from_document(&doc, key)?;
    tracing::debug!(path = %path.display(), count = windows.len(), "read windows from file");
    Ok(windows)
}
