//! Cards service.
//!
//! Typed access to the three card store operations: list, create and
//! delete. Create is never retried since the server would assign a second
//! id; delete is retried on transient failures.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use crate::errors::{BookwatchError, BookwatchResult};
use crate::observability::MetricsCollector;
use crate::poll::SnapshotSource;
use crate::resilience::RetryPolicy;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::card::{CardDraft, CardId, CardList, CardRecord};

/// Path of the list endpoint.
pub const CARDS_PATH: &str = "api/cards";

/// Path of the single-card endpoint.
pub const CARD_PATH: &str = "api/card";

/// Client for the card store's HTTP contract.
pub struct CardsService {
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
    metrics: Arc<dyn MetricsCollector>,
    headers: Vec<(String, String)>,
}

impl CardsService {
    /// Creates a new cards service.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Self {
        Self {
            transport,
            retry,
            metrics,
            headers: Vec::new(),
        }
    }

    /// Adds headers sent with every request.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Fetches the authoritative card list.
    #[instrument(skip(self))]
    pub async fn list(&self) -> BookwatchResult<CardList> {
        let request = self.build_request(HttpRequest::get(CARDS_PATH));
        let response = self.send("list", request).await?;
        let response = Self::check_status(response)?;

        let records: Vec<CardRecord> = response.json()?;
        tracing::debug!(count = records.len(), "Fetched cards");
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Creates a card and returns the id the server assigned.
    #[instrument(skip(self, draft), fields(url = %draft.url))]
    pub async fn create(&self, draft: &CardDraft) -> BookwatchResult<CardId> {
        draft.validate()?;

        let body = serde_json::to_vec(&CardRecord::for_create(draft))?;
        let request = self.build_request(
            HttpRequest::post(CARD_PATH)
                .with_header("Content-Type", "application/json")
                .with_body(body),
        );
        let response = self.send("create", request).await?;
        let response = Self::check_status(response)?;

        let text = response.text();
        let id = text.trim().trim_matches('"');
        if id.is_empty() {
            return Err(BookwatchError::server(
                response.status,
                "Create response did not contain a card id",
            ));
        }

        tracing::debug!(id, "Card created");
        Ok(CardId::new(id))
    }

    /// Deletes a card. A card the server no longer knows counts as deleted.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete(&self, id: &CardId) -> BookwatchResult<()> {
        if id.is_pending() {
            return Err(BookwatchError::PendingCard);
        }

        let request = self.build_request(HttpRequest::delete(card_path(id)?));
        let response = self
            .retry
            .run(request.method, || {
                let req = request.clone();
                async move {
                    let response = self.send("delete", req).await?;
                    if response.status == 404 {
                        tracing::debug!("Card already absent on server");
                        return Ok(response);
                    }
                    Self::check_status(response)
                }
            })
            .await?;

        tracing::debug!(status = response.status, "Card deleted");
        Ok(())
    }

    fn build_request(&self, mut request: HttpRequest) -> HttpRequest {
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        request
    }

    /// Sends a request and records metrics for it.
    async fn send(&self, operation: &str, request: HttpRequest) -> BookwatchResult<HttpResponse> {
        let started = Instant::now();
        let result = self
            .transport
            .send(request)
            .await
            .map_err(BookwatchError::from);

        let success = matches!(&result, Ok(response) if response.is_success());
        self.metrics
            .record_request(operation, success, started.elapsed());
        if let Err(err) = &result {
            self.metrics.record_error(error_kind(err));
        }

        result
    }

    fn check_status(response: HttpResponse) -> BookwatchResult<HttpResponse> {
        if response.is_success() {
            return Ok(response);
        }

        let body = response.text();
        let message = if body.trim().is_empty() {
            format!("HTTP error: {}", response.status)
        } else {
            body.trim().to_string()
        };
        Err(BookwatchError::server(response.status, message))
    }
}

#[async_trait]
impl SnapshotSource for CardsService {
    async fn fetch(&self) -> BookwatchResult<CardList> {
        self.list().await
    }
}

impl std::fmt::Debug for CardsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardsService")
            .field("retry", &self.retry)
            .finish()
    }
}

/// Builds `api/card/{id}` with the id percent-encoded as one path segment.
fn card_path(id: &CardId) -> BookwatchResult<String> {
    let mut url = url::Url::parse("http://localhost/")?;
    url.path_segments_mut()
        .map_err(|_| BookwatchError::Configuration {
            message: "Cannot build card path".to_string(),
        })?
        .pop_if_empty()
        .extend(CARD_PATH.split('/'))
        .push(id.as_str());
    Ok(url.path().trim_start_matches('/').to_string())
}

fn error_kind(err: &BookwatchError) -> &'static str {
    match err {
        BookwatchError::Configuration { .. } => "configuration",
        BookwatchError::Validation { .. } => "validation",
        BookwatchError::PendingCard => "pending_card",
        BookwatchError::Server { .. } => "server",
        BookwatchError::Network { .. } => "network",
        BookwatchError::Timeout { .. } => "timeout",
        BookwatchError::Serialization { .. } => "serialization",
    }
}
