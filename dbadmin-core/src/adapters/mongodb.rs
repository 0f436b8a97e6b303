//! MongoDB document store.

use crate::Result;
use crate::config::{StoreConfig, StoreTarget};
use crate::error::{AdminError, redact_database_url};
use crate::sink::DocumentStore;
use async_trait::async_trait;
use mongodb::Client;
use mongodb::bson::Document;
use mongodb::options::ClientOptions;
use serde_json::Value;

/// Result document archive backed by a MongoDB client.
pub struct MongoStore {
    client: Client,
    endpoint: String,
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl MongoStore {
    /// Creates a client for `config`. The driver connects lazily, so an
    /// unreachable server surfaces on the first insert.
    ///
    /// # Errors
    /// Returns [`AdminError::Store`] if the connection string is rejected by
    /// the driver.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let endpoint = redact_database_url(&config.url);

        let mut options = ClientOptions::parse(&config.url).await.map_err(|e| {
            AdminError::store_failed(format!("Invalid store url {}", endpoint), e)
        })?;
        options.app_name = Some(
            config
                .app_name
                .clone()
                .unwrap_or_else(|| format!("dbadmin-{}", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::with_options(options).map_err(|e| {
            AdminError::store_failed(format!("Failed to create client for {}", endpoint), e)
        })?;

        tracing::debug!("Document store client created for {}", endpoint);
        Ok(Self { client, endpoint })
    }
}

/// Converts a JSON object into a BSON document.
pub fn to_bson_document(document: &Value) -> Result<Document> {
    mongodb::bson::to_document(document).map_err(|e| {
        AdminError::store_failed("Result document cannot be converted to BSON", e)
    })
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert(&self, target: &StoreTarget, document: &Value) -> Result<()> {
        let record = to_bson_document(document)?;
        self.client
            .database(&target.database)
            .collection::<Document>(&target.collection)
            .insert_one(record)
            .await
            .map_err(|e| {
                AdminError::store_failed(
                    format!("Insert into {} on {} failed", target, self.endpoint),
                    e,
                )
            })?;
        Ok(())
    }

    async fn close(&self) {
        tracing::debug!("Closing document store client for {}", self.endpoint);
        self.client.clone().shutdown().await;
    }
}
