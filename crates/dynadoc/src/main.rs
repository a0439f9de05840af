use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dynadoc::document::DEFAULT_TOMBSTONE_RETENTION;
use dynadoc::storage::dynamodb::{DEFAULT_REGION, DEFAULT_TABLE_NAME};
use dynadoc::storage::{DynamoDbConfig, DynamoDbDocumentStore};
use dynadoc::{Document, DocumentKey, DocumentStore};
use futures_util::{pin_mut, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// dynadoc - Versioned JSON documents over DynamoDB
#[derive(Parser, Debug)]
#[command(name = "dynadoc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Name of the documents table
    #[arg(long, short, default_value = DEFAULT_TABLE_NAME, env = "DYNADOC_TABLE_NAME")]
    table_name: String,

    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION, env = "AWS_REGION")]
    region: String,

    /// Custom endpoint URL (for DynamoDB Local)
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Seconds a deleted document is kept before DynamoDB removes it
    #[arg(
        long,
        default_value_t = DEFAULT_TOMBSTONE_RETENTION.as_secs(),
        env = "DYNADOC_TOMBSTONE_RETENTION_SECS"
    )]
    tombstone_retention_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the documents table with TTL enabled on tombstones
    CreateTable,
    /// Print a document
    Get(KeyArgs),
    /// Write a document at the given base version
    Put {
        #[command(flatten)]
        key: KeyArgs,

        /// Version the document is expected to have (0 creates it)
        #[arg(long, short)]
        version: i64,

        /// JSON object body; omit to delete the document
        #[arg(long, short)]
        body: Option<String>,
    },
    /// Print every document in the table
    Scan {
        /// Maximum number of documents to print
        #[arg(long, short)]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// Partition key of the document
    #[arg(long, short)]
    partition_key: String,

    /// Sort key of the document
    #[arg(long, short)]
    sort_key: String,
}

impl KeyArgs {
    fn key(&self) -> DocumentKey {
        DocumentKey::new(&self.partition_key, &self.sort_key)
    }
}

/// Printed form of a document, with the body as nested JSON.
#[derive(Serialize)]
struct DocumentView {
    partition_key: String,
    sort_key: String,
    version: i64,
    body: Option<Value>,
}

impl TryFrom<Document> for DocumentView {
    type Error = anyhow::Error;

    fn try_from(document: Document) -> Result<Self> {
        let body = document
            .body
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .context("Stored document body is not valid JSON")?;

        Ok(Self {
            partition_key: document.id.partition_key,
            sort_key: document.id.sort_key,
            version: document.version,
            body,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynadoc=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = DynamoDbConfig {
        table_name: cli.table_name,
        region: cli.region,
        endpoint_url: cli.endpoint_url,
        tombstone_retention: Duration::from_secs(cli.tombstone_retention_secs),
    };

    tracing::info!(
        table = %config.table_name,
        target = %config.target_display(),
        "Using documents table"
    );

    let store = DynamoDbDocumentStore::from_config(&config).await;

    match cli.command {
        Command::CreateTable => {
            store
                .create_table()
                .await
                .with_context(|| format!("Failed to create table {}", config.table_name))?;
        }
        Command::Get(key) => {
            let document = store.get_document(&key.key()).await?;
            print_document(document)?;
        }
        Command::Put { key, version, body } => {
            let document = Document::new(key.key(), body, version);
            store.update_document(&document).await?;

            let stored = store.get_document(&document.id).await?;
            print_document(stored)?;
        }
        Command::Scan { limit } => {
            let documents = store.scan(|scan| scan).take(limit.unwrap_or(usize::MAX));
            pin_mut!(documents);

            while let Some(document) = documents.next().await {
                print_document(document?)?;
            }
        }
    }

    Ok(())
}

fn print_document(document: Document) -> Result<()> {
    let view = DocumentView::try_from(document)?;
    println!("{}", serde_json::to_string(&view)?);
    Ok(())
}
