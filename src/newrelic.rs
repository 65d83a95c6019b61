use crate::backend::NewRelicConfig;
use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;

/// New Relic sink that ships each record to the Log API over HTTPS.
///
/// The license key travels in the `X-License-Key` header of every request,
/// so nothing about the process environment has to be arranged up front.
#[derive(Clone)]
pub struct NewRelicSink {
    client: Client,
    config: NewRelicConfig,
}

impl NewRelicSink {
    pub fn new(config: NewRelicConfig) -> Self {
        NewRelicSink::with_client(config, Client::new())
    }

    /// Use a caller-built HTTP client (proxy, timeouts, TLS roots).
    pub fn with_client(config: NewRelicConfig, client: Client) -> Self {
        NewRelicSink { client, config }
    }

    fn map_record<'a>(&'a self, record: &'a LogRecord) -> NewRelicLog<'a> {
        NewRelicLog {
            timestamp: record.created_at,
            message: &record.message,
            attributes: NewRelicAttributes {
                id: &record.id,
                level: record.level.as_str(),
                service_name: &self.config.app_name,
                info: record.info.as_ref(),
            },
        }
    }
}

#[derive(Serialize)]
struct NewRelicLog<'a> {
    timestamp: i64,
    message: &'a str,
    attributes: NewRelicAttributes<'a>,
}

#[derive(Serialize)]
struct NewRelicAttributes<'a> {
    id: &'a str,
    level: &'a str,
    #[serde(rename = "service.name")]
    service_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<&'a Value>,
}

#[async_trait]
impl LogSink for NewRelicSink {
    fn name(&self) -> &'static str {
        "newrelic"
    }

    fn service(&self) -> &str {
        &self.config.app_name
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            level = %record.level,
            text = %record.message,
            info = ?record.info,
            "newrelic log"
        );

        let body = serde_json::to_vec(&self.map_record(record))?;
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .header("X-License-Key", &self.config.license_key)
            .body(body)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("New Relic log ingest failed with status {}: {}", status, text).into())
        }
    }
}
