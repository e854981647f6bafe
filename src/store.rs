use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::rows::{NewRow, StoredRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("could not decode stored rows: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Remote tabular store: list every row, append a batch.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<StoredRow>, StoreError>;
    async fn append_rows(&self, rows: &[NewRow]) -> Result<(), StoreError>;
}

/// sheet.best style JSON endpoint. GET lists rows, POST appends.
pub struct SheetStore {
    client: reqwest::Client,
    endpoint: String,
}

impl SheetStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RowStore for SheetStore {
    async fn fetch_rows(&self) -> Result<Vec<StoredRow>, StoreError> {
        debug!("GET {}", self.endpoint);
        let resp = self.client.get(&self.endpoint).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                code: status.as_u16(),
                body,
            });
        }
        // An empty sheet may come back as an empty body.
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(Vec::new());
        }
        let rows: Vec<StoredRow> = serde_json::from_str(&body)?;
        info!("Fetched {} existing rows", rows.len());
        Ok(rows)
    }

    async fn append_rows(&self, rows: &[NewRow]) -> Result<(), StoreError> {
        debug!("POST {} ({} rows)", self.endpoint, rows.len());
        // .json() also sets Content-Type: application/json
        let resp = self.client.post(&self.endpoint).json(rows).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
