//! DynamoDB client configuration.

use std::time::Duration;

use aws_sdk_dynamodb::Client;

use dynadoc_core::document::DEFAULT_TOMBSTONE_RETENTION;

pub const DEFAULT_TABLE_NAME: &str = "documents";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection and table settings for [`DynamoDbDocumentStore`](super::DynamoDbDocumentStore).
#[derive(Debug, Clone)]
pub struct DynamoDbConfig {
    /// Name of the documents table.
    pub table_name: String,
    /// AWS region.
    pub region: String,
    /// Custom endpoint URL (for DynamoDB Local).
    pub endpoint_url: Option<String>,
    /// How long tombstones are kept before DynamoDB's TTL removes them.
    pub tombstone_retention: Duration,
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            table_name: std::env::var("DYNADOC_TABLE_NAME")
                .unwrap_or_else(|_| DEFAULT_TABLE_NAME.to_string()),
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            tombstone_retention: std::env::var("DYNADOC_TOMBSTONE_RETENTION_SECS")
                .ok()
                .and_then(|secs| secs.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TOMBSTONE_RETENTION),
        }
    }
}

impl DynamoDbConfig {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

/// Creates a DynamoDB client with the given configuration.
pub async fn create_client(config: &DynamoDbConfig) -> Client {
    let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
    }

    let sdk_config = sdk_config_loader.load().await;
    Client::new(&sdk_config)
}
