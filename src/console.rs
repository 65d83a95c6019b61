use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Destination shared by clones of a [`ConsoleSink`].
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Passthrough sink: `log` goes to stdout, `error` to stderr, payloads are
/// printed as given.
#[derive(Clone)]
pub struct ConsoleSink {
    service: String,
    out: Option<SharedWriter>,
    err: Option<SharedWriter>,
}

impl ConsoleSink {
    pub fn new(service: impl Into<String>) -> Self {
        ConsoleSink {
            service: service.into(),
            out: None,
            err: None,
        }
    }

    /// Redirect `log` lines to `out` and `error` lines to `err` instead of
    /// the process streams.
    pub fn with_writers(service: impl Into<String>, out: SharedWriter, err: SharedWriter) -> Self {
        ConsoleSink {
            service: service.into(),
            out: Some(out),
            err: Some(err),
        }
    }

    fn print_out(&self, line: &str) {
        match &self.out {
            Some(out) => emit(out, line),
            None => emit_to(&mut io::stdout().lock(), line),
        }
    }

    fn print_err(&self, line: &str) {
        match &self.err {
            Some(err) => emit(err, line),
            None => emit_to(&mut io::stderr().lock(), line),
        }
    }
}

fn emit(writer: &SharedWriter, line: &str) {
    let mut guard = writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    emit_to(&mut *guard, line);
}

// Console write failures are not caught, same as `println!`.
fn emit_to<W: Write + ?Sized>(writer: &mut W, line: &str) {
    if let Err(e) = writeln!(writer, "{}", line) {
        panic!("failed printing to console: {}", e);
    }
}

/// `message` followed by the compact JSON payload, if any.
pub fn render(message: &str, info: Option<&Value>) -> String {
    match info {
        Some(info) => format!("{} {}", message, info),
        None => message.to_string(),
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn service(&self) -> &str {
        &self.service
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.print_out(&render(&record.message, record.info.as_ref()));
        Ok(())
    }

    async fn log(&self, message: &str, info: Option<Value>) {
        self.print_out(&render(message, info.as_ref()));
    }

    async fn error(&self, message: &str, info: Option<Value>) {
        self.print_err(&render(message, info.as_ref()));
    }
}
