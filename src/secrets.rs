use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use serde_json::Value;

/// Secret string as stored, parsed as JSON when possible.
#[derive(Debug, Clone, PartialEq)]
pub enum SecretValue {
    Json(Value),
    Text(String),
}

impl SecretValue {
    pub fn parse(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => SecretValue::Json(value),
            Err(_) => SecretValue::Text(raw),
        }
    }

    /// String field of a JSON secret, e.g. a password inside a credentials
    /// blob.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            SecretValue::Json(value) => value.get(name)?.as_str(),
            SecretValue::Text(_) => None,
        }
    }
}

/// Secrets Manager client for `region`, or the environment's default region.
pub async fn client(region: Option<String>) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    Client::new(&loader.load().await)
}

/// Fetch `secret_id` from Secrets Manager.
///
/// Never fails: a missing `SecretString` or any SDK error is reported as a
/// diagnostic and yields `None`.
pub async fn get_secret(client: &Client, secret_id: &str) -> Option<SecretValue> {
    let output = match client.get_secret_value().secret_id(secret_id).send().await {
        Ok(output) => output,
        Err(e) => {
            tracing::info!(secret_id, error = %DisplayErrorContext(&e), "error fetching secret");
            return None;
        }
    };
    match output.secret_string() {
        Some(raw) => Some(SecretValue::parse(raw.to_string())),
        None => {
            tracing::info!(secret_id, "error fetching secret: SecretString is undefined");
            None
        }
    }
}
