/*!
 * Transport to the remote catalog service.
 */

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

use crate::app_config::CatalogConfig;
use crate::errors::CatalogError;

/// Body of a set submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Six-token pronoun set
    pub set: String,
    /// Identifies the submitting client
    pub source: String,
}

/// Remote catalog operations
///
/// Implementations report non-2xx answers as `CatalogError::Status`.
#[async_trait]
pub trait CatalogClient: Send + Sync + Debug {
    /// Fetch the raw catalog document
    async fn fetch(&self) -> Result<String, CatalogError>;

    /// Submit a new set for inclusion
    async fn submit(&self, request: &SubmitRequest) -> Result<(), CatalogError>;
}

/// reqwest-backed catalog client
#[derive(Debug)]
pub struct HttpCatalogClient {
    /// Catalog URL, used for GET and POST
    endpoint: String,
    /// HTTP client for making requests
    client: Client,
}

impl HttpCatalogClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Create a client from the catalog configuration
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::new(config.endpoint.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

async fn ensure_success(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .ok()
        .filter(|body| !body.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());

    Err(CatalogError::Status {
        status_code: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch(&self) -> Result<String, CatalogError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let body = ensure_success(response).await?.text().await?;
        Ok(body)
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<(), CatalogError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}
