use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::sink::LogSink;

/// Supported backend kinds that can be selected via config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// DynamoDB table store.
    Table,
    /// Postgres `logs` table.
    Relational,
    /// New Relic Log API.
    TelemetrySaaS,
    Console,
}

impl BackendKind {
    /// Resolve a `type` tag, accepting both the generic and the product
    /// names.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "table" | "dynamo" => Some(BackendKind::Table),
            "relational" | "postgres" => Some(BackendKind::Relational),
            "telemetrySaaS" | "newrelic" => Some(BackendKind::TelemetrySaaS),
            "console" => Some(BackendKind::Console),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Table => "table",
            BackendKind::Relational => "relational",
            BackendKind::TelemetrySaaS => "telemetrySaaS",
            BackendKind::Console => "console",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters for the DynamoDB sink.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamoConfig {
    pub region: String,
    #[serde(alias = "dbname")]
    pub table_name: String,
    pub service: String,
}

/// Connection parameters for the Postgres sink.
///
/// When `connection_string` is set the discrete fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresConfig {
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_dbname")]
    pub dbname: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub service: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_dbname() -> String {
    "postgres".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl PostgresConfig {
    /// Discrete-field config with every optional knob at its default.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        PostgresConfig {
            connection_string: None,
            host: host.into(),
            dbname: default_dbname(),
            user: user.into(),
            password: password.into(),
            port: default_port(),
            service: service.into(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }

    /// Config driven by a single `postgres://` URL.
    pub fn from_url(url: impl Into<String>, service: impl Into<String>) -> Self {
        PostgresConfig {
            connection_string: Some(url.into()),
            ..PostgresConfig::new("", "", "", service)
        }
    }
}

/// Credentials and target for the New Relic sink.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelicConfig {
    pub license_key: String,
    pub app_name: String,
    #[serde(default = "default_newrelic_endpoint")]
    pub endpoint: String,
}

/// US-region Log API ingest endpoint.
pub const DEFAULT_NEWRELIC_ENDPOINT: &str = "https://log-api.newrelic.com/log/v1";

fn default_newrelic_endpoint() -> String {
    DEFAULT_NEWRELIC_ENDPOINT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleConfig {
    pub service: String,
}

/// Tagged backend selection, shaped as `{"type": ..., "config": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "config")]
pub enum BackendConfig {
    #[serde(rename = "table", alias = "dynamo")]
    Table(DynamoConfig),
    #[serde(rename = "relational", alias = "postgres")]
    Relational(PostgresConfig),
    #[serde(rename = "telemetrySaaS", alias = "newrelic")]
    TelemetrySaaS(NewRelicConfig),
    #[serde(rename = "console")]
    Console(ConsoleConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Table(_) => BackendKind::Table,
            BackendConfig::Relational(_) => BackendKind::Relational,
            BackendConfig::TelemetrySaaS(_) => BackendKind::TelemetrySaaS,
            BackendConfig::Console(_) => BackendKind::Console,
        }
    }

    /// Parse an untyped configuration document.
    ///
    /// An unrecognised `type` tag is reported as
    /// [`BackendBuildError::UnknownBackendKind`] rather than a generic
    /// deserialization error.
    pub fn from_value(value: Value) -> Result<Self, BackendBuildError> {
        let tag = match value.get("type") {
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => return Err(BackendBuildError::UnknownBackendKind(other.to_string())),
            None => return Err(BackendBuildError::InvalidConfig("missing `type` field".into())),
        };
        if BackendKind::from_tag(&tag).is_none() {
            return Err(BackendBuildError::UnknownBackendKind(tag));
        }
        serde_json::from_value(value).map_err(|e| BackendBuildError::InvalidConfig(e.to_string()))
    }
}

/// Error type returned when building a backend sink from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error("unknown backend kind: {0}")]
    UnknownBackendKind(String),

    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to connect {kind} backend: {source}")]
    Connection {
        kind: BackendKind,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("{0} backend is not enabled in this build")]
    FeatureDisabled(BackendKind),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

/// Create a concrete `LogSink` implementation from a `BackendConfig`.
///
/// The Postgres path opens its pool and probes one connection before
/// returning; a failure there is surfaced as
/// [`BackendBuildError::Connection`].
pub async fn make_sink_from_config(
    cfg: &BackendConfig,
) -> Result<Arc<dyn LogSink>, BackendBuildError> {
    match cfg {
        BackendConfig::Table(config) => {
            #[cfg(feature = "dynamo")]
            {
                use crate::dynamo::DynamoSink;

                let sink = DynamoSink::connect(config.clone()).await;
                Ok(Arc::new(sink) as Arc<dyn LogSink>)
            }

            #[cfg(not(feature = "dynamo"))]
            {
                let _ = config;
                Err(BackendBuildError::FeatureDisabled(BackendKind::Table))
            }
        }
        BackendConfig::Relational(config) => {
            #[cfg(feature = "postgres")]
            {
                use crate::postgres::PostgresSink;

                let sink = PostgresSink::connect(config.clone()).await?;
                Ok(Arc::new(sink) as Arc<dyn LogSink>)
            }

            #[cfg(not(feature = "postgres"))]
            {
                let _ = config;
                Err(BackendBuildError::FeatureDisabled(BackendKind::Relational))
            }
        }
        BackendConfig::TelemetrySaaS(config) => {
            #[cfg(feature = "newrelic")]
            {
                use crate::newrelic::NewRelicSink;

                Ok(Arc::new(NewRelicSink::new(config.clone())) as Arc<dyn LogSink>)
            }

            #[cfg(not(feature = "newrelic"))]
            {
                let _ = config;
                Err(BackendBuildError::FeatureDisabled(BackendKind::TelemetrySaaS))
            }
        }
        BackendConfig::Console(config) => {
            use crate::console::ConsoleSink;

            Ok(Arc::new(ConsoleSink::new(config.service.clone())) as Arc<dyn LogSink>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_backend_tag() {
        let table = BackendConfig::from_value(json!({
            "type": "table",
            "config": { "region": "eu-west-1", "tableName": "logs", "service": "orders" }
        }))
        .unwrap();
        assert_eq!(table.kind(), BackendKind::Table);

        let pg = BackendConfig::from_value(json!({
            "type": "relational",
            "config": { "host": "db", "user": "u", "password": "p", "service": "orders" }
        }))
        .unwrap();
        match pg {
            BackendConfig::Relational(c) => {
                assert_eq!(c.port, 5432);
                assert_eq!(c.dbname, "postgres");
                assert_eq!(c.connection_string, None);
            }
            other => panic!("unexpected config: {other:?}"),
        }

        let nr = BackendConfig::from_value(json!({
            "type": "telemetrySaaS",
            "config": { "licenseKey": "k", "appName": "orders" }
        }))
        .unwrap();
        match nr {
            BackendConfig::TelemetrySaaS(c) => assert_eq!(c.endpoint, DEFAULT_NEWRELIC_ENDPOINT),
            other => panic!("unexpected config: {other:?}"),
        }

        let console = BackendConfig::from_value(json!({
            "type": "console",
            "config": { "service": "orders" }
        }))
        .unwrap();
        assert_eq!(console.kind(), BackendKind::Console);
    }

    #[test]
    fn accepts_product_aliases() {
        let cfg = BackendConfig::from_value(json!({
            "type": "dynamo",
            "config": { "region": "us-east-1", "dbname": "app-logs", "service": "api" }
        }))
        .unwrap();
        assert_eq!(
            cfg,
            BackendConfig::Table(DynamoConfig {
                region: "us-east-1".into(),
                table_name: "app-logs".into(),
                service: "api".into(),
            })
        );
    }

    #[test]
    fn unknown_tag_is_reported_as_such() {
        let err = BackendConfig::from_value(json!({ "type": "bogus", "config": {} })).unwrap_err();
        assert!(matches!(err, BackendBuildError::UnknownBackendKind(ref t) if t == "bogus"));
    }

    #[test]
    fn malformed_body_is_invalid_config() {
        let err = BackendConfig::from_value(json!({ "type": "table", "config": {} })).unwrap_err();
        assert!(matches!(err, BackendBuildError::InvalidConfig(_)));

        let err = BackendConfig::from_value(json!({ "config": {} })).unwrap_err();
        assert!(matches!(err, BackendBuildError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn console_config_builds_console_sink() {
        let cfg = BackendConfig::Console(ConsoleConfig { service: "orders".into() });
        let sink = make_sink_from_config(&cfg).await.unwrap();
        assert_eq!(sink.name(), "console");
        assert_eq!(sink.service(), "orders");
    }
}
