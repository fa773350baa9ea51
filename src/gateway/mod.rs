//! Mutation gateway.
//!
//! Two-phase optimistic mutations: the store changes first, then the card
//! store is asked to make the same change. Successful creates patch the
//! server id into the pending card; failed creates and deletes are rolled
//! back and the error is returned to the caller.

use std::sync::Arc;
use tracing::instrument;

use crate::errors::{BookwatchError, BookwatchResult};
use crate::observability::MetricsCollector;
use crate::services::CardsService;
use crate::store::ReconcilingStore;
use crate::types::card::{Card, CardDraft, CardId, PendingToken};

/// Owns a pending card for the duration of an add.
///
/// Dropping the guard without resolving it discards the card, so an add
/// whose future is cancelled mid-request leaves nothing behind.
struct PendingGuard<'a> {
    store: &'a ReconcilingStore,
    token: Option<PendingToken>,
}

impl<'a> PendingGuard<'a> {
    fn append(store: &'a ReconcilingStore, draft: CardDraft) -> Self {
        let token = store.append_pending(draft);
        Self {
            store,
            token: Some(token),
        }
    }

    fn resolve(mut self, id: CardId) -> bool {
        self.token
            .take()
            .is_some_and(|token| self.store.resolve_token(token, id))
    }

    fn discard(mut self) -> Option<Card> {
        self.token
            .take()
            .and_then(|token| self.store.discard_pending(token))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if self.store.discard_pending(token).is_some() {
                tracing::debug!("Add cancelled, pending card discarded");
            }
        }
    }
}

/// Applies user intents to the store and the card store.
pub struct MutationGateway {
    store: Arc<ReconcilingStore>,
    service: Arc<CardsService>,
    metrics: Arc<dyn MetricsCollector>,
}

impl MutationGateway {
    /// Creates a new gateway.
    pub fn new(
        store: Arc<ReconcilingStore>,
        service: Arc<CardsService>,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Self {
        Self {
            store,
            service,
            metrics,
        }
    }

    /// Adds a card.
    ///
    /// The card is listed as pending right away. Returns the server id once
    /// the create succeeds. Empty fields are rejected before anything
    /// changes.
    pub async fn add(&self, url: &str, title: &str, description: &str) -> BookwatchResult<CardId> {
        self.add_draft(CardDraft::new(url, title, description))
            .await
    }

    /// Adds a card from a draft.
    #[instrument(skip(self, draft), fields(url = %draft.url))]
    pub async fn add_draft(&self, draft: CardDraft) -> BookwatchResult<CardId> {
        draft.validate()?;

        let pending = PendingGuard::append(&self.store, draft.clone());

        match self.service.create(&draft).await {
            Ok(id) => {
                if !pending.resolve(id.clone()) {
                    tracing::debug!(%id, "Pending card left the list before create completed");
                }
                Ok(id)
            }
            Err(err) => {
                pending.discard();
                self.metrics.record_rollback("add");
                tracing::warn!(error = %err, "Create failed, optimistic card rolled back");
                Err(err)
            }
        }
    }

    /// Removes a card.
    ///
    /// Pending cards cannot be removed: the server has no record of them
    /// yet. The card disappears locally right away and comes back if the
    /// delete fails. If the call is cancelled instead, the next poll
    /// snapshot that still lists the card brings it back.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn remove(&self, id: &CardId) -> BookwatchResult<()> {
        if id.is_pending() {
            return Err(BookwatchError::PendingCard);
        }

        let removed = self.store.take(id);

        if let Err(err) = self.service.delete(id).await {
            if let Some(removed) = removed {
                self.store.restore(removed);
                self.metrics.record_rollback("remove");
            }
            tracing::warn!(error = %err, "Delete failed, card restored");
            return Err(err);
        }

        Ok(())
    }
}

impl std::fmt::Debug for MutationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGateway")
            .field("store", &self.store)
            .finish()
    }
}
