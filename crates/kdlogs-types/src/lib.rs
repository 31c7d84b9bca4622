//! Shared types for kdlogs
//!
//! This crate contains the log record model, the filter configuration and the
//! request messages exchanged between the host application and the core.

use crossterm::style::Color;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Action name carried by every parse request
pub const ACTION_PARSE_LOGS: &str = "parseKDLogsMessages";

/// Key under which the host persists the last-used filter
pub const FILTER_STORAGE_KEY: &str = "kdLogFilter";

/// Template used when the caller supplies none
pub const DEFAULT_TEMPLATE: &str = "[{Timestamp:HH:mm:ss} {Level:u3}] {Message:lj}{NewLine}{Exception}";

// ============================================================================
// Log Types
// ============================================================================

/// A structured log line parsed from an element's raw JSON text
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    fields: Map<String, Value>,
}

impl LogRecord {
    /// Parse raw text into a record. Only JSON objects are records.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let fields: Map<String, Value> = serde_json::from_str(raw)?;
        Ok(Self { fields })
    }

    /// Top-level field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Raw `Timestamp` value, if it carries anything
    pub fn timestamp(&self) -> Option<&Value> {
        self.get("Timestamp").filter(|v| is_truthy(v))
    }

    /// `Level` as text; `None` when missing or empty
    pub fn level(&self) -> Option<String> {
        self.get("Level").and_then(truthy_text)
    }

    /// `RenderedMessage`, falling back to `MessageTemplate`, else empty
    pub fn message(&self) -> String {
        self.get("RenderedMessage")
            .and_then(truthy_text)
            .or_else(|| self.get("MessageTemplate").and_then(truthy_text))
            .unwrap_or_default()
    }

    /// `Exception` text; `None` when missing or empty
    pub fn exception(&self) -> Option<String> {
        self.get("Exception").and_then(truthy_text)
    }

    /// Look up a property: top-level key first, then `Properties[key]`
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.get(key).or_else(|| {
            self.get("Properties")
                .and_then(Value::as_object)
                .and_then(|props| props.get(key))
        })
    }
}

/// Whether a JSON value counts as present (non-null, non-empty, non-zero, non-false)
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text of a value, or `None` when the value does not count as present
pub fn truthy_text(value: &Value) -> Option<String> {
    is_truthy(value).then(|| value_text(value))
}

/// Display text of a JSON value: strings verbatim, everything else as compact JSON
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Visual classification of a log level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LevelVariant {
    Info,
    Warn,
    Error,
    #[default]
    Default,
}

impl LevelVariant {
    /// Classify a raw level value by its case-insensitive prefix
    pub fn from_level(level: Option<&str>) -> Self {
        let Some(level) = level.filter(|l| !l.is_empty()) else {
            return Self::Default;
        };
        let lower = level.to_lowercase();
        if lower.starts_with("inf") {
            Self::Info
        } else if lower.starts_with("war") {
            Self::Warn
        } else if lower.starts_with("err") {
            Self::Error
        } else {
            Self::Default
        }
    }

    /// Style class used to mark a level of this variant
    pub fn style(&self) -> StyleClass {
        match self {
            Self::Info => StyleClass::LevelInfo,
            Self::Warn => StyleClass::LevelWarn,
            Self::Error => StyleClass::LevelError,
            Self::Default => StyleClass::LevelDefault,
        }
    }
}

// ============================================================================
// Presentation Types
// ============================================================================

/// Presentational categories a rendered log line is marked up with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleClass {
    Timestamp,
    LevelInfo,
    LevelWarn,
    LevelError,
    LevelDefault,
    Message,
    Exception,
}

impl StyleClass {
    pub const ALL: [StyleClass; 7] = [
        Self::Timestamp,
        Self::LevelInfo,
        Self::LevelWarn,
        Self::LevelError,
        Self::LevelDefault,
        Self::Message,
        Self::Exception,
    ];

    /// CSS class name of this category
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Timestamp => "kd-log-timestamp",
            Self::LevelInfo => "kd-log-level-info",
            Self::LevelWarn => "kd-log-level-warn",
            Self::LevelError => "kd-log-level-err",
            Self::LevelDefault => "kd-log-level-def",
            Self::Message => "kd-log-message",
            Self::Exception => "kd-log-exception",
        }
    }

    /// CSS declarations for this category
    pub fn css_declarations(&self) -> &'static str {
        match self {
            Self::Timestamp => "color: #2196f3; font-weight: bold;",
            Self::LevelInfo => "color: #4caf50; font-weight: bold;",
            Self::LevelWarn => "color: #ff9800; font-weight: bold;",
            Self::LevelError => "color: #f44336; font-weight: bold;",
            Self::LevelDefault => "color: #9e9e9e; font-weight: bold;",
            Self::Message => "color: #fff;",
            Self::Exception => "color: #f44336; font-style: italic;",
        }
    }

    /// Terminal color for this category
    pub fn color(&self) -> Color {
        match self {
            Self::Timestamp => Color::Blue,
            Self::LevelInfo => Color::Green,
            Self::LevelWarn => Color::Yellow,
            Self::LevelError => Color::Red,
            Self::LevelDefault => Color::DarkGrey,
            Self::Message => Color::White,
            Self::Exception => Color::Red,
        }
    }

    pub fn is_bold(&self) -> bool {
        !matches!(self, Self::Message | Self::Exception)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, Self::Exception)
    }
}

// ============================================================================
// Filter Types
// ============================================================================

/// User-facing filter values; an absent or empty field places no constraint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_to: Option<String>,
}

impl FilterConfig {
    pub fn message(&self) -> Option<&str> {
        non_empty(&self.message)
    }

    pub fn level(&self) -> Option<&str> {
        non_empty(&self.level)
    }

    pub fn timestamp_from(&self) -> Option<&str> {
        non_empty(&self.timestamp_from)
    }

    pub fn timestamp_to(&self) -> Option<&str> {
        non_empty(&self.timestamp_to)
    }

    /// Check if the filter constrains nothing
    pub fn is_empty(&self) -> bool {
        self.message().is_none()
            && self.level().is_none()
            && self.timestamp_from().is_none()
            && self.timestamp_to().is_none()
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

// ============================================================================
// Message Types
// ============================================================================

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// Request sent by the host to the core
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "parseKDLogsMessages")]
    ParseLogs {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<FilterConfig>,
    },
}

impl Request {
    /// Decode a request, telling unknown actions apart from malformed JSON
    pub fn from_json(raw: &str) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_str(raw)?;
        match value.get("action").and_then(Value::as_str) {
            Some(ACTION_PARSE_LOGS) => Ok(serde_json::from_value(value)?),
            Some(other) => Err(RequestError::UnknownAction(other.to_string())),
            None => Err(RequestError::UnknownAction(String::new())),
        }
    }
}

/// Response to a parse request: the number of visible records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response {
    pub visible: usize,
}
