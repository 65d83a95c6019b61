//! Environment variable names used by this crate for convenient
//! configuration of the logger from microservices.
//!
//! These are purely helpers; the sinks themselves never read the
//! environment.

use crate::backend::{
    BackendBuildError, BackendConfig, BackendKind, ConsoleConfig, DynamoConfig, NewRelicConfig,
    PostgresConfig, DEFAULT_NEWRELIC_ENDPOINT,
};

/// Backend tag: `table`, `relational`, `telemetrySaaS`, `console` or one of
/// their product aliases.
pub const DB_LOGGER_TYPE_ENV: &str = "DB_LOGGER_TYPE";

/// Logical service name stamped on every record.
pub const DB_LOGGER_SERVICE_ENV: &str = "DB_LOGGER_SERVICE";

/// AWS region of the DynamoDB table.
pub const DB_LOGGER_REGION_ENV: &str = "DB_LOGGER_REGION";

/// DynamoDB table name.
pub const DB_LOGGER_TABLE_ENV: &str = "DB_LOGGER_TABLE";

/// Full Postgres URL; takes precedence over the discrete `PG` variables.
pub const DB_LOGGER_DATABASE_URL_ENV: &str = "DB_LOGGER_DATABASE_URL";

pub const DB_LOGGER_PG_HOST_ENV: &str = "DB_LOGGER_PG_HOST";
pub const DB_LOGGER_PG_PORT_ENV: &str = "DB_LOGGER_PG_PORT";
pub const DB_LOGGER_PG_USER_ENV: &str = "DB_LOGGER_PG_USER";
pub const DB_LOGGER_PG_PASSWORD_ENV: &str = "DB_LOGGER_PG_PASSWORD";
pub const DB_LOGGER_PG_DBNAME_ENV: &str = "DB_LOGGER_PG_DBNAME";

pub const NEW_RELIC_LICENSE_KEY_ENV: &str = "NEW_RELIC_LICENSE_KEY";
pub const NEW_RELIC_APP_NAME_ENV: &str = "NEW_RELIC_APP_NAME";

/// Override for the Log API endpoint, e.g. the EU region.
pub const NEW_RELIC_LOG_ENDPOINT_ENV: &str = "NEW_RELIC_LOG_ENDPOINT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Assemble a [`BackendConfig`] from the process environment.
pub fn config_from_env() -> Result<BackendConfig, BackendBuildError> {
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Assemble a [`BackendConfig`] from an arbitrary key lookup.
pub fn config_from_lookup<F>(lookup: F) -> Result<BackendConfig, BackendBuildError>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |key: &'static str| lookup(key).ok_or(BackendBuildError::MissingEnv(key));

    let tag = require(DB_LOGGER_TYPE_ENV)?;
    let kind =
        BackendKind::from_tag(&tag).ok_or_else(|| BackendBuildError::UnknownBackendKind(tag))?;

    let config = match kind {
        BackendKind::Table => BackendConfig::Table(DynamoConfig {
            region: require(DB_LOGGER_REGION_ENV)?,
            table_name: require(DB_LOGGER_TABLE_ENV)?,
            service: require(DB_LOGGER_SERVICE_ENV)?,
        }),
        BackendKind::Relational => {
            let service = require(DB_LOGGER_SERVICE_ENV)?;
            let mut config = match lookup(DB_LOGGER_DATABASE_URL_ENV) {
                Some(url) => PostgresConfig::from_url(url, service),
                None => PostgresConfig::new(
                    require(DB_LOGGER_PG_HOST_ENV)?,
                    lookup(DB_LOGGER_PG_USER_ENV).unwrap_or_default(),
                    lookup(DB_LOGGER_PG_PASSWORD_ENV).unwrap_or_default(),
                    service,
                ),
            };
            if let Some(port) = lookup(DB_LOGGER_PG_PORT_ENV) {
                config.port = port.parse().map_err(|_| {
                    BackendBuildError::InvalidConfig(format!(
                        "{DB_LOGGER_PG_PORT_ENV} is not a valid port: {port}"
                    ))
                })?;
            }
            if let Some(dbname) = lookup(DB_LOGGER_PG_DBNAME_ENV) {
                config.dbname = dbname;
            }
            BackendConfig::Relational(config)
        }
        BackendKind::TelemetrySaaS => BackendConfig::TelemetrySaaS(NewRelicConfig {
            license_key: require(NEW_RELIC_LICENSE_KEY_ENV)?,
            app_name: require(NEW_RELIC_APP_NAME_ENV)?,
            endpoint: lookup(NEW_RELIC_LOG_ENDPOINT_ENV)
                .unwrap_or_else(|| DEFAULT_NEWRELIC_ENDPOINT.to_string()),
        }),
        BackendKind::Console => BackendConfig::Console(ConsoleConfig {
            service: require(DB_LOGGER_SERVICE_ENV)?,
        }),
    };
    Ok(config)
}
