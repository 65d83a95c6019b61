use crate::record::{unwrap_detail, Level, LogRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;

/// Best-effort destination for log entries.
///
/// Implementations only provide the single external write in [`send`];
/// the provided [`log`] and [`error`] methods build the [`LogRecord`],
/// apply [`unwrap_detail`] and make sure a failed write never reaches the
/// caller.
///
/// [`send`]: LogSink::send
/// [`log`]: LogSink::log
/// [`error`]: LogSink::error
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Logical service name stamped on every record.
    fn service(&self) -> &str;

    /// Write a single record to the underlying backend.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the record.
    /// - `Err(..)` on any transport, serialization or backend failure. No
    ///   retry is attempted.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Record an entry tagged `level = "log"`.
    async fn log(&self, message: &str, info: Option<Value>) {
        self.write(Level::Log, message, info).await
    }

    /// Record an entry tagged `level = "error"`. `info` is conventionally
    /// present on this path but may be omitted.
    async fn error(&self, message: &str, info: Option<Value>) {
        self.write(Level::Error, message, info).await
    }

    /// Build, send and swallow. Any failure produces exactly one diagnostic
    /// event and the call still completes normally.
    async fn write(&self, level: Level, message: &str, info: Option<Value>) {
        let record = LogRecord::new(level, self.service(), message, unwrap_detail(info));
        if let Err(e) = self.send(&record).await {
            tracing::error!(
                sink = self.name(),
                level = %record.level,
                error = %e,
                "failed to write log record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CapturedLogs;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<LogRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn service(&self) -> &str {
            "orders"
        }

        async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
            if self.fail {
                return Err("backend unavailable".into());
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_unwraps_detail_payload() {
        let sink = RecordingSink::default();
        sink.log("m", Some(json!({ "detail": { "a": 1 } }))).await;

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Log);
        assert_eq!(records[0].service, "orders");
        assert_eq!(records[0].info, Some(json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn error_applies_the_same_unwrap_policy() {
        let sink = RecordingSink::default();
        sink.error("m", Some(json!({ "detail": [1, 2] }))).await;
        sink.error("n", None).await;

        let records = sink.records.lock().unwrap();
        assert_eq!(records[0].level, Level::Error);
        assert_eq!(records[0].info, Some(json!([1, 2])));
        assert_eq!(records[1].info, None);
    }

    #[tokio::test]
    async fn failed_write_is_swallowed_with_one_diagnostic() {
        let logs = CapturedLogs::default();
        let _guard = logs.set_default();

        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        sink.error("m", Some(json!({ "a": 1 }))).await;

        assert_eq!(logs.count("failed to write log record"), 1);
        assert!(logs.contents().contains("backend unavailable"));
    }
}
