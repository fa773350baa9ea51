//! Bookwatch Client Library
//!
//! An async Rust client for the bookwatch card store. Cards (a URL, a title
//! and a description) are added and removed optimistically: the local list
//! changes immediately and is patched or rolled back once the card store
//! answers. A background poll loop keeps the list converged with the
//! server's authoritative snapshot without discarding adds the server has
//! not reflected yet.
//!
//! # Features
//!
//! - **Optimistic mutations**: pending cards appear before the server assigns an id
//! - **Reconciliation**: poll snapshots replace resolved cards, pending cards survive
//! - **Rollback**: failed creates and deletes restore the previous local state
//! - **Cancellable polling**: stopping the loop discards any in-flight fetch
//! - **Observability**: tracing spans and structured logging
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bookwatch_client::BookwatchClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BookwatchClient::builder()
//!         .base_url("http://localhost:3001")
//!         .build()?;
//!
//!     let poll = client.start_polling();
//!
//!     client
//!         .add("https://www.rust-lang.org", "Rust", "A systems language")
//!         .await?;
//!
//!     for card in client.cards() {
//!         println!("{} - {}", card.title, card.url);
//!     }
//!
//!     poll.stop();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod observability;
pub mod poll;
pub mod resilience;
pub mod services;
pub mod store;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{BookwatchClient, BookwatchClientBuilder};
pub use config::BookwatchConfig;
pub use errors::{BookwatchError, BookwatchResult};
pub use gateway::MutationGateway;
pub use poll::{PollHandle, PollLoop, PollStats, Poller, SnapshotSource};
pub use services::CardsService;
pub use store::ReconcilingStore;

// Type re-exports
pub use types::card::{Card, CardDraft, CardId, CardList, CardRecord, PendingToken};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
