/*!
 * Mock catalog client for testing.
 *
 * - `MockCatalogClient::serving(body)` - Always answers fetches with `body`
 * - `MockCatalogClient::failing()` - Every request fails with a 503
 *
 * Behavior can be switched at runtime and every call is counted.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::client::{CatalogClient, SubmitRequest};
use crate::errors::CatalogError;

/// Mock catalog service
#[derive(Debug, Default)]
pub struct MockCatalogClient {
    /// Body returned by `fetch`, or None to fail
    body: Mutex<Option<String>>,
    /// Whether `submit` fails
    reject_submissions: Mutex<bool>,
    /// Fetch counter
    fetch_count: AtomicUsize,
    /// Accepted and rejected submissions, in order
    submissions: Mutex<Vec<SubmitRequest>>,
}

impl MockCatalogClient {
    /// Create a mock that serves `body` and accepts submissions
    pub fn serving(body: impl Into<String>) -> Self {
        Self {
            body: Mutex::new(Some(body.into())),
            ..Self::default()
        }
    }

    /// Create a mock whose every request fails
    pub fn failing() -> Self {
        Self {
            body: Mutex::new(None),
            reject_submissions: Mutex::new(true),
            ..Self::default()
        }
    }

    /// Change what `fetch` returns; None makes it fail
    pub fn set_body(&self, body: Option<String>) {
        *self.body.lock() = body;
    }

    /// Make `submit` fail or succeed
    pub fn set_reject_submissions(&self, reject: bool) {
        *self.reject_submissions.lock() = reject;
    }

    /// Number of fetches so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Every submission received so far
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.submissions.lock().clone()
    }
}

fn unavailable() -> CatalogError {
    CatalogError::Status {
        status_code: 503,
        message: "Service Unavailable".to_string(),
    }
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn fetch(&self) -> Result<String, CatalogError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.body.lock().clone().ok_or_else(unavailable)
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<(), CatalogError> {
        self.submissions.lock().push(request.clone());
        if *self.reject_submissions.lock() {
            return Err(unavailable());
        }
        Ok(())
    }
}
