use crate::backend::DynamoConfig;
use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;

/// How long a record lives before DynamoDB TTL reclaims it.
pub const RETENTION: Duration = Duration::from_secs(60 * 60 * 24 * 15);

/// DynamoDB implementation of [`LogSink`]. Each call issues exactly one
/// `PutItem` against the configured table.
#[derive(Clone)]
pub struct DynamoSink {
    client: Client,
    table_name: String,
    service: String,
}

impl DynamoSink {
    /// Build a client bound to `config.region`, with credentials resolved
    /// from the default AWS provider chain.
    pub async fn connect(config: DynamoConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        DynamoSink::from_client(Client::new(&sdk_config), config.table_name, config.service)
    }

    /// Wrap an already configured client.
    pub fn from_client(
        client: Client,
        table_name: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        DynamoSink {
            client,
            table_name: table_name.into(),
            service: service.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Map a record onto item attributes. An absent payload leaves `info`
    /// out of the item entirely.
    pub fn item(record: &LogRecord) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S(record.id.clone()));
        item.insert("level".to_string(), AttributeValue::S(record.level.to_string()));
        item.insert(
            "created_at".to_string(),
            AttributeValue::N(record.created_at.to_string()),
        );
        item.insert("service".to_string(), AttributeValue::S(record.service.clone()));
        item.insert("message".to_string(), AttributeValue::S(record.message.clone()));
        if let Some(info) = &record.info {
            item.insert("info".to_string(), to_attribute(info));
        }
        if let Some(ttl) = record.ttl {
            item.insert("ttl".to_string(), AttributeValue::N(ttl.to_string()));
        }
        item
    }
}

/// Marshal JSON into a DynamoDB attribute. Empty strings stay strings and
/// numbers are stored as native `N` values.
pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

#[async_trait]
impl LogSink for DynamoSink {
    fn name(&self) -> &'static str {
        "dynamo"
    }

    fn service(&self) -> &str {
        &self.service
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let record = record.clone().with_retention(RETENTION);
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(Self::item(&record)))
            .send()
            .await
            .map_err(|e| format!("dynamodb put_item failed: {}", DisplayErrorContext(&e)))?;
        Ok(())
    }
}
