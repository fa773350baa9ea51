//! Bookwatch client.
//!
//! Wires the card list store, the card store service, the mutation gateway
//! and the poll loop together behind one handle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::{BookwatchConfig, BookwatchConfigBuilder};
use crate::errors::{BookwatchError, BookwatchResult};
use crate::gateway::MutationGateway;
use crate::observability::{DefaultMetricsCollector, MetricsCollector};
use crate::poll::{PollHandle, PollLoop};
use crate::resilience::{RetryConfig, RetryPolicy};
use crate::services::CardsService;
use crate::store::ReconcilingStore;
use crate::transport::{HttpTransport, HttpTransportImpl};
use crate::types::card::{CardDraft, CardId, CardList};

/// Number of loading placeholders shown before the first fetch.
pub const DEFAULT_PLACEHOLDERS: usize = 3;

/// The main bookwatch client.
///
/// Holds the card list and exposes the operations a view needs: read the
/// list, add and remove cards, and keep the list in sync with the card
/// store.
///
/// # Example
///
/// ```rust,no_run
/// use bookwatch_client::BookwatchClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = BookwatchClient::from_env()?;
///     let poll = client.start_polling();
///
///     let id = client.add("https://tokio.rs", "Tokio", "Async runtime").await?;
///     client.remove(&id).await?;
///
///     poll.join().await;
///     Ok(())
/// }
/// ```
pub struct BookwatchClient {
    config: BookwatchConfig,
    store: Arc<ReconcilingStore>,
    service: Arc<CardsService>,
    gateway: MutationGateway,
    metrics: Arc<dyn MetricsCollector>,
}

impl BookwatchClient {
    /// Creates a new client builder.
    pub fn builder() -> BookwatchClientBuilder {
        BookwatchClientBuilder::new()
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `BOOKWATCH_BASE_URL`, `BOOKWATCH_TIMEOUT`,
    /// `BOOKWATCH_POLL_INTERVAL_MS` and `BOOKWATCH_MAX_RETRIES`, all optional.
    pub fn from_env() -> BookwatchResult<Self> {
        let config = BookwatchConfig::from_env()?;
        BookwatchClientBuilder::from_config(config).build()
    }

    /// Returns the cards currently shown, pending ones included.
    pub fn cards(&self) -> CardList {
        self.store.current()
    }

    /// Returns true until the first snapshot has been applied.
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Subscribes to list changes. The value is the store revision.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    /// Adds a card optimistically and returns the id the server assigned.
    pub async fn add(
        &self,
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> BookwatchResult<CardId> {
        self.gateway
            .add_draft(CardDraft::new(url, title, description))
            .await
    }

    /// Removes a card optimistically.
    pub async fn remove(&self, id: &CardId) -> BookwatchResult<()> {
        self.gateway.remove(id).await
    }

    /// Starts the background poll loop at the configured period.
    ///
    /// Must be called from within a Tokio runtime. The loop stops when the
    /// returned handle is stopped or dropped.
    pub fn start_polling(&self) -> PollHandle {
        PollLoop::new(self.config.poll_interval).start(
            Arc::clone(&self.store),
            Arc::clone(&self.service) as _,
        )
    }

    /// Returns the card list store.
    pub fn store(&self) -> &Arc<ReconcilingStore> {
        &self.store
    }

    /// Returns the card store service.
    pub fn service(&self) -> &Arc<CardsService> {
        &self.service
    }

    /// Returns the mutation gateway.
    pub fn gateway(&self) -> &MutationGateway {
        &self.gateway
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BookwatchConfig {
        &self.config
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }
}

impl std::fmt::Debug for BookwatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookwatchClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for the bookwatch client.
pub struct BookwatchClientBuilder {
    config_builder: BookwatchConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    retry_config: Option<RetryConfig>,
    placeholders: usize,
}

impl BookwatchClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config_builder: BookwatchConfigBuilder::new(),
            transport: None,
            metrics: None,
            retry_config: None,
            placeholders: DEFAULT_PLACEHOLDERS,
        }
    }

    /// Creates a builder from an existing configuration.
    pub fn from_config(config: BookwatchConfig) -> Self {
        let mut config_builder = BookwatchConfigBuilder::new()
            .base_url(config.base_url)
            .timeout(config.timeout)
            .poll_interval(config.poll_interval)
            .max_retries(config.max_retries);
        for (name, value) in config.custom_headers {
            config_builder = config_builder.header(name, value);
        }

        Self {
            config_builder,
            ..Self::new()
        }
    }

    /// Sets the card store base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(base_url);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the poll period.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config_builder = self.config_builder.poll_interval(interval);
        self
    }

    /// Sets the maximum retry attempts for deletes.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config_builder = self.config_builder.max_retries(retries);
        self
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.header(name, value);
        self
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom metrics collector.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the retry configuration, overriding `max_retries`.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Sets how many loading placeholders are shown before the first fetch.
    pub fn placeholders(mut self, count: usize) -> Self {
        self.placeholders = count;
        self
    }

    /// Builds the client.
    pub fn build(self) -> BookwatchResult<BookwatchClient> {
        let config = self.config_builder.build()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransportImpl::new(&config.base_url, config.timeout).map_err(|e| {
                    BookwatchError::Configuration {
                        message: e.to_string(),
                    }
                })?,
            ),
        };

        let metrics: Arc<dyn MetricsCollector> = self
            .metrics
            .unwrap_or_else(|| Arc::new(DefaultMetricsCollector::new()));

        let retry_config = self
            .retry_config
            .unwrap_or_else(|| RetryConfig::new().max_retries(config.max_retries));

        let service = Arc::new(
            CardsService::new(
                transport,
                RetryPolicy::new(retry_config),
                Arc::clone(&metrics),
            )
            .with_headers(config.custom_headers.clone()),
        );

        let store = Arc::new(ReconcilingStore::with_placeholders(self.placeholders));
        let gateway =
            MutationGateway::new(Arc::clone(&store), Arc::clone(&service), Arc::clone(&metrics));

        tracing::debug!(base_url = %config.base_url, "Bookwatch client built");

        Ok(BookwatchClient {
            config,
            store,
            service,
            gateway,
            metrics,
        })
    }
}

impl Default for BookwatchClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
