use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell as SyncOnceCell};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::backend::{make_sink_from_config, BackendBuildError, BackendConfig, BackendKind};
use crate::sink::LogSink;

/// Lifecycle of a [`DatabaseLogger`]. There is no way back to
/// `Uninitialized` once `Ready` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryState {
    Uninitialized,
    Initializing,
    Ready,
}

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

static GLOBAL: Lazy<DatabaseLogger> = Lazy::new(DatabaseLogger::new);

/// Builds one sink from the first configuration it sees and hands the same
/// instance out for the rest of its lifetime.
///
/// Later calls ignore their configuration entirely. Concurrent first
/// callers are serialized so exactly one backend is constructed; if that
/// construction fails the logger stays uninitialized and the next call
/// tries again with its own configuration.
///
/// ```no_run
/// # async fn demo() -> Result<(), db_log_sink::backend::BackendBuildError> {
/// use db_log_sink::backend::{BackendConfig, ConsoleConfig};
/// use db_log_sink::factory::DatabaseLogger;
///
/// let factory = DatabaseLogger::new();
/// let logger = factory
///     .get_instance(&BackendConfig::Console(ConsoleConfig { service: "api".into() }))
///     .await?;
/// logger.log("started", None).await;
/// # Ok(())
/// # }
/// ```
pub struct DatabaseLogger {
    sink: OnceCell<Arc<dyn LogSink>>,
    kind: SyncOnceCell<BackendKind>,
    state: AtomicU8,
}

impl DatabaseLogger {
    pub fn new() -> Self {
        DatabaseLogger {
            sink: OnceCell::new(),
            kind: SyncOnceCell::new(),
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    /// Process-wide instance for callers that cannot thread a factory
    /// through their own context.
    pub fn global() -> &'static DatabaseLogger {
        &GLOBAL
    }

    /// Return the memoized sink, building it from `config` on first use.
    pub async fn get_instance(
        &self,
        config: &BackendConfig,
    ) -> Result<Arc<dyn LogSink>, BackendBuildError> {
        self.get_or_init_with(|| async move {
            let sink = make_sink_from_config(config).await?;
            let kind = config.kind();
            let _ = self.kind.set(kind);
            tracing::info!(backend = %kind, service = sink.service(), "log sink ready");
            Ok(sink)
        })
        .await
    }

    /// Like [`get_instance`](Self::get_instance) but accepts an untyped
    /// `{"type": ..., "config": ...}` document. Once ready the document is
    /// not even parsed.
    pub async fn get_instance_from_value(
        &self,
        value: Value,
    ) -> Result<Arc<dyn LogSink>, BackendBuildError> {
        if let Some(sink) = self.sink.get() {
            return Ok(Arc::clone(sink));
        }
        let config = BackendConfig::from_value(value)?;
        self.get_instance(&config).await
    }

    pub fn state(&self) -> FactoryState {
        match self.state.load(Ordering::Acquire) {
            READY => FactoryState::Ready,
            INITIALIZING => FactoryState::Initializing,
            _ => FactoryState::Uninitialized,
        }
    }

    /// Backend chosen by the winning configuration, once ready.
    pub fn kind(&self) -> Option<BackendKind> {
        self.kind.get().copied()
    }

    async fn get_or_init_with<F, Fut>(&self, build: F) -> Result<Arc<dyn LogSink>, BackendBuildError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn LogSink>, BackendBuildError>>,
    {
        let sink = self
            .sink
            .get_or_try_init(|| async move {
                self.state.store(INITIALIZING, Ordering::Release);
                let mut pending = PendingInit {
                    state: &self.state,
                    finished: false,
                };
                let built = build().await;
                pending.finished = true;
                let next = if built.is_ok() { READY } else { UNINITIALIZED };
                self.state.store(next, Ordering::Release);
                built
            })
            .await?;
        Ok(Arc::clone(sink))
    }
}

/// Rolls `state` back to uninitialized when an in-flight build is dropped
/// before it finishes, e.g. under a caller's timeout.
struct PendingInit<'a> {
    state: &'a AtomicU8,
    finished: bool,
}

impl Drop for PendingInit<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.store(UNINITIALIZED, Ordering::Release);
        }
    }
}

impl Default for DatabaseLogger {
    fn default() -> Self {
        DatabaseLogger::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ConsoleConfig;
    use crate::console::ConsoleSink;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn console(service: &str) -> BackendConfig {
        BackendConfig::Console(ConsoleConfig {
            service: service.into(),
        })
    }

    #[tokio::test]
    async fn second_call_returns_first_instance() {
        let factory = DatabaseLogger::new();
        assert_eq!(factory.state(), FactoryState::Uninitialized);

        let first = factory.get_instance(&console("first")).await.unwrap();
        let second = factory.get_instance(&console("second")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.service(), "first");
        assert_eq!(factory.state(), FactoryState::Ready);
        assert_eq!(factory.kind(), Some(BackendKind::Console));
    }

    #[tokio::test]
    async fn ready_factory_ignores_even_unknown_configs() {
        let factory = DatabaseLogger::new();
        let first = factory.get_instance(&console("svc")).await.unwrap();
        let again = factory
            .get_instance_from_value(json!({ "type": "bogus", "config": {} }))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[tokio::test]
    async fn unknown_kind_leaves_factory_usable() {
        let factory = DatabaseLogger::new();
        let err = factory
            .get_instance_from_value(json!({ "type": "bogus", "config": {} }))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BackendBuildError::UnknownBackendKind(_)));
        assert_eq!(factory.state(), FactoryState::Uninitialized);

        let sink = factory
            .get_instance_from_value(json!({ "type": "console", "config": { "service": "svc" } }))
            .await
            .unwrap();
        assert_eq!(sink.name(), "console");
        assert_eq!(factory.state(), FactoryState::Ready);
    }

    #[tokio::test]
    async fn failed_build_is_surfaced_and_not_memoized() {
        let factory = DatabaseLogger::new();
        let err = factory
            .get_or_init_with(|| async {
                Err(BackendBuildError::Connection {
                    kind: BackendKind::Relational,
                    source: "connection refused".into(),
                })
            })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BackendBuildError::Connection { .. }));
        assert_eq!(factory.state(), FactoryState::Uninitialized);
        assert_eq!(factory.kind(), None);

        factory.get_instance(&console("svc")).await.unwrap();
        assert_eq!(factory.state(), FactoryState::Ready);
    }

    #[tokio::test]
    async fn cancelled_build_leaves_factory_uninitialized() {
        let factory = DatabaseLogger::new();
        let slow = factory.get_or_init_with(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Arc::new(ConsoleSink::new("slow")) as Arc<dyn LogSink>)
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(20), slow).await;
        assert!(timed_out.is_err());
        assert_eq!(factory.state(), FactoryState::Uninitialized);
        assert_eq!(factory.kind(), None);

        let sink = factory.get_instance(&console("svc")).await.unwrap();
        assert_eq!(sink.service(), "svc");
        assert_eq!(factory.state(), FactoryState::Ready);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_build_once() {
        let factory = Arc::new(DatabaseLogger::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..16 {
            let factory = Arc::clone(&factory);
            let builds = Arc::clone(&builds);
            handles.push(tokio::spawn(async move {
                factory
                    .get_or_init_with(|| async move {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Arc::new(ConsoleSink::new(format!("svc-{i}"))) as Arc<dyn LogSink>)
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut sinks = Vec::new();
        for handle in handles {
            sinks.push(handle.await.unwrap());
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(sinks.iter().all(|s| Arc::ptr_eq(s, &sinks[0])));
    }

    #[tokio::test]
    async fn global_is_a_single_factory() {
        assert!(std::ptr::eq(DatabaseLogger::global(), DatabaseLogger::global()));
    }
}
