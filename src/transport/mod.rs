//! Transport collaborators: REST client and WebSocket reader
//!
//! The store itself does no I/O. These clients fetch snapshot payloads and
//! push deltas, parse them, and hand them to the caller; delivery order on
//! the event channel is FIFO, which the store relies on.

pub mod ws;

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::TypeNode;
use crate::model::{Item, ItemUpdate};

/// Error types for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server or websocket URL did not parse.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// HTTP request failed or returned an error status.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket connection or protocol failure.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// Payload did not decode.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// WebSocket reconnect budget exhausted.
    #[error("websocket retry budget exhausted after {0} attempts")]
    RetriesExhausted(u32),
}

/// Shape of the `DELETE /unit/{uid}` response: the server echoes the full
/// remaining item list.
#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    units: Vec<ItemUpdate>,
}

/// REST client for the backend's item endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: String,
}

impl RestClient {
    /// Build a client for the given base URL (e.g. `http://host:8080`).
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base = base_url.trim_end_matches('/').to_string();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(TransportError::InvalidUrl(base));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, base })
    }

    /// `GET /unit` - the current full snapshot.
    pub async fn fetch_items(&self) -> Result<Vec<ItemUpdate>, TransportError> {
        let resp = self
            .http
            .get(format!("{}/unit", self.base))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// `POST /unit` - create or update an item. The response is the
    /// server's echo of the record, to be applied as a partial.
    pub async fn create_item(&self, item: &Item) -> Result<ItemUpdate, TransportError> {
        let resp = self
            .http
            .post(format!("{}/unit", self.base))
            .json(item)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// `DELETE /unit/{uid}` - remove an item. The response carries the
    /// remaining items and is applied as a full snapshot.
    pub async fn delete_item(&self, uid: &str) -> Result<Vec<ItemUpdate>, TransportError> {
        let resp = self
            .http
            .delete(format!("{}/unit/{}", self.base, uid))
            .send()
            .await?
            .error_for_status()?;
        let body: DeleteResponse = resp.json().await?;
        Ok(body.units)
    }

    /// `GET /types` - the CoT type taxonomy tree.
    pub async fn fetch_types(&self) -> Result<TypeNode, TransportError> {
        let resp = self
            .http
            .get(format!("{}/types", self.base))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}
