//! Single-instance logger factory with pluggable sinks.
//!
//! A [`factory::DatabaseLogger`] builds exactly one [`sink::LogSink`] from the
//! first [`backend::BackendConfig`] it receives: DynamoDB, Postgres, New Relic
//! or the console. Writes are best effort; a failing backend is reported
//! through `tracing` and never surfaces to the caller.

pub mod backend;
pub mod console;
pub mod env;
pub mod factory;
pub mod init;
pub mod record;
pub mod sink;

#[cfg(feature = "dynamo")]
pub mod dynamo;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "newrelic")]
pub mod newrelic;

#[cfg(feature = "secrets")]
pub mod secrets;

#[cfg(test)]
mod test_support;

pub use backend::{BackendBuildError, BackendConfig, BackendKind};
pub use factory::DatabaseLogger;
pub use record::{Level, LogRecord};
pub use sink::LogSink;
