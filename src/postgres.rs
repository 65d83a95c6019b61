use crate::backend::{BackendBuildError, BackendKind, PostgresConfig};
use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

const INSERT_LOG: &str =
    "INSERT INTO logs(level, message, metadata, service) VALUES($1, $2, $3::json, $4)";

/// Postgres-backed sink that inserts one row per call into the `logs` table.
///
/// The table is assumed to exist:
///
/// ```sql
/// CREATE TABLE logs (
///   level    text NOT NULL,
///   message  text NOT NULL,
///   metadata json,
///   service  text NOT NULL
/// );
/// ```
#[derive(Clone)]
pub struct PostgresSink {
    pool: PgPool,
    service: String,
}

impl PostgresSink {
    /// Build the pool and prove it can hand out a connection.
    ///
    /// One connection is acquired and immediately returned as a liveness
    /// probe; any failure here is fatal for construction.
    pub async fn connect(config: PostgresConfig) -> Result<Self, BackendBuildError> {
        match Self::open(&config).await {
            Ok(pool) => {
                tracing::info!(service = %config.service, "postgres connected");
                Ok(PostgresSink {
                    pool,
                    service: config.service,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "error connecting to postgres");
                Err(BackendBuildError::Connection {
                    kind: BackendKind::Relational,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn open(config: &PostgresConfig) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(connect_options(config)?);
        drop(pool.acquire().await?);
        Ok(pool)
    }

    /// Underlying pool, exposed for health checks and pool statistics.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connection options from either the URL form or the discrete fields.
pub fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions, sqlx::Error> {
    if let Some(url) = &config.connection_string {
        return PgConnectOptions::from_str(url);
    }
    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.dbname))
}

/// Text bound to the `metadata` column. A missing or JSON `null` payload
/// becomes SQL `NULL`.
pub fn metadata_json(info: Option<&Value>) -> Result<Option<String>, serde_json::Error> {
    info.filter(|v| !v.is_null())
        .map(serde_json::to_string)
        .transpose()
}

#[async_trait]
impl LogSink for PostgresSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn service(&self) -> &str {
        &self.service
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let metadata = metadata_json(record.info.as_ref())?;

        // The connection goes back to the pool when `conn` drops, whether or
        // not the insert succeeded.
        let mut conn = self.pool.acquire().await?;
        sqlx::query(INSERT_LOG)
            .bind(record.level.as_str())
            .bind(&record.message)
            .bind(metadata)
            .bind(&record.service)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
