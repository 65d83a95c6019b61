use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Severity tag attached to every [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Log,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Log => "log",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log entry, built fresh for every `log`/`error` call and dropped
/// once the backend write has completed or failed.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub id: String,
    pub level: Level,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub service: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    /// Retention marker in epoch seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

impl LogRecord {
    pub fn new(
        level: Level,
        service: impl Into<String>,
        message: impl Into<String>,
        info: Option<Value>,
    ) -> Self {
        LogRecord {
            id: Uuid::new_v4().to_string(),
            level,
            created_at: Utc::now().timestamp_millis(),
            service: service.into(),
            message: message.into(),
            info,
            ttl: None,
        }
    }

    /// Stamp an expiry `retention` past the record's creation time.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        let retention = i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);
        self.ttl = Some((self.created_at / 1000).saturating_add(retention));
        self
    }
}

/// Payload policy shared by every persisting sink, for both levels.
///
/// When the payload is an object carrying a non-null `detail` field, only
/// that field is kept. Anything else passes through untouched.
pub fn unwrap_detail(info: Option<Value>) -> Option<Value> {
    match info {
        Some(Value::Object(mut map)) => match map.remove("detail") {
            Some(detail) if !detail.is_null() => Some(detail),
            Some(detail) => {
                map.insert("detail".to_string(), detail);
                Some(Value::Object(map))
            }
            None => Some(Value::Object(map)),
        },
        other => other,
    }
}
