//! Reconciling list store.
//!
//! Owns the card list shown to the user. Optimistic mutations and
//! authoritative poll snapshots both go through the named operations here;
//! nothing outside this module touches the list directly.
//!
//! Reconciliation policy: a snapshot replaces every resolved card, while
//! pending cards (appended locally, not yet acknowledged) are carried over
//! to the tail in their original order. The server wins for everything it
//! reports, but a snapshot taken before a create round-trips can never erase
//! that create.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

use crate::types::card::{Card, CardDraft, CardId, CardList, PendingToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    /// Loading skeleton, dropped by the first snapshot.
    Placeholder,
    Pending(PendingToken),
    Resolved,
}

#[derive(Debug, Clone)]
struct Slot {
    card: Card,
    kind: SlotKind,
}

impl Slot {
    fn is_pending(&self) -> bool {
        matches!(self.kind, SlotKind::Pending(_))
    }

    fn is_resolved(&self) -> bool {
        self.kind == SlotKind::Resolved
    }
}

#[derive(Debug, Default)]
struct StoreState {
    slots: Vec<Slot>,
    loading: bool,
}

impl StoreState {
    /// Resolves the pending slot at `index`.
    ///
    /// If a snapshot already delivered the card under `real_id`, the pending
    /// copy is dropped instead so the card is never listed twice.
    fn resolve_at(&mut self, index: usize, real_id: CardId) {
        let duplicate = self
            .slots
            .iter()
            .any(|s| s.is_resolved() && s.card.id == real_id);
        if duplicate {
            self.slots.remove(index);
            tracing::debug!(id = %real_id, "Dropped pending copy of an already listed card");
        } else {
            let slot = &mut self.slots[index];
            slot.card.id = real_id;
            slot.kind = SlotKind::Resolved;
        }
    }
}

/// A card taken out of the list, remembered so it can be put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    /// The removed card.
    pub card: Card,
    /// Its position at removal time.
    pub index: usize,
}

/// In-memory card list with optimistic mutation and snapshot reconciliation.
#[derive(Debug)]
pub struct ReconcilingStore {
    state: RwLock<StoreState>,
    revision: watch::Sender<u64>,
}

impl ReconcilingStore {
    /// Creates an empty store that is not loading.
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    /// Creates a loading store seeded with `count` placeholder cards.
    pub fn with_placeholders(count: usize) -> Self {
        let slots = (0..count)
            .map(|_| Slot {
                card: Card::placeholder(),
                kind: SlotKind::Placeholder,
            })
            .collect();
        Self::from_state(StoreState {
            slots,
            loading: true,
        })
    }

    fn from_state(state: StoreState) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(state),
            revision,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Returns a snapshot of the current list.
    pub fn current(&self) -> CardList {
        self.read().slots.iter().map(|s| s.card.clone()).collect()
    }

    /// Returns true while the first snapshot has not been applied.
    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Sets the loading flag.
    pub fn set_loading(&self, loading: bool) {
        let changed = {
            let mut state = self.write();
            std::mem::replace(&mut state.loading, loading) != loading
        };
        if changed {
            self.bump();
        }
    }

    /// Number of cards carrying a server-assigned id.
    pub fn resolved_count(&self) -> usize {
        self.read().slots.iter().filter(|s| s.is_resolved()).count()
    }

    /// Number of cards awaiting a server id.
    pub fn pending_count(&self) -> usize {
        self.read().slots.iter().filter(|s| s.is_pending()).count()
    }

    /// Monotonic counter bumped on every visible change.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Appends a pending card at the tail.
    pub fn append_pending(&self, draft: CardDraft) -> PendingToken {
        let token = PendingToken::new();
        self.write().slots.push(Slot {
            card: Card::from_draft(draft),
            kind: SlotKind::Pending(token),
        });
        self.bump();
        tracing::debug!(%token, "Appended pending card");
        token
    }

    /// Gives the first pending card (in insertion order) its server id.
    ///
    /// No-op when nothing is pending. Other fields are left untouched.
    pub fn resolve_pending(&self, real_id: CardId) {
        let resolved = {
            let mut state = self.write();
            let index = state.slots.iter().position(Slot::is_pending);
            match index {
                Some(index) => {
                    state.resolve_at(index, real_id);
                    true
                }
                None => false,
            }
        };
        if resolved {
            self.bump();
        } else {
            tracing::debug!("resolve_pending called with no pending card");
        }
    }

    /// Gives the pending card tagged with `token` its server id.
    ///
    /// Returns false if that card is gone (removed or rolled back).
    pub fn resolve_token(&self, token: PendingToken, real_id: CardId) -> bool {
        let resolved = {
            let mut state = self.write();
            let index = state
                .slots
                .iter()
                .position(|s| s.kind == SlotKind::Pending(token));
            match index {
                Some(index) => {
                    state.resolve_at(index, real_id);
                    true
                }
                None => false,
            }
        };
        if resolved {
            self.bump();
        }
        resolved
    }

    /// Drops the pending card tagged with `token`.
    pub fn discard_pending(&self, token: PendingToken) -> Option<Card> {
        let removed = {
            let mut state = self.write();
            state
                .slots
                .iter()
                .position(|s| s.kind == SlotKind::Pending(token))
                .map(|index| state.slots.remove(index).card)
        };
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Removes the first card with the given id.
    ///
    /// No-op if absent. The sentinel never matches.
    pub fn remove(&self, id: &CardId) {
        let _ = self.take(id);
    }

    /// Removes the first card with the given id and returns it with its
    /// position.
    pub fn take(&self, id: &CardId) -> Option<Removed> {
        if id.is_pending() {
            return None;
        }
        let removed = {
            let mut state = self.write();
            state
                .slots
                .iter()
                .position(|s| s.is_resolved() && &s.card.id == id)
                .map(|index| Removed {
                    card: state.slots.remove(index).card,
                    index,
                })
        };
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Puts a taken card back at its former position.
    ///
    /// The position is clamped to the current length. Nothing happens if a
    /// card with the same id reappeared in the meantime.
    pub fn restore(&self, removed: Removed) {
        let restored = {
            let mut state = self.write();
            if state
                .slots
                .iter()
                .any(|s| s.is_resolved() && s.card.id == removed.card.id)
            {
                false
            } else {
                let index = removed.index.min(state.slots.len());
                state.slots.insert(
                    index,
                    Slot {
                        card: removed.card,
                        kind: SlotKind::Resolved,
                    },
                );
                true
            }
        };
        if restored {
            self.bump();
        }
    }

    /// Replaces the list with an authoritative snapshot.
    ///
    /// Resolved cards and placeholders are dropped; pending cards are kept
    /// and appended after the snapshot in their original order. Snapshot
    /// entries without an id are ignored.
    pub fn replace_all(&self, snapshot: CardList) {
        let (resolved, pending) = {
            let mut state = self.write();
            let pending: Vec<Slot> = state
                .slots
                .drain(..)
                .filter(Slot::is_pending)
                .collect();

            let mut slots: Vec<Slot> = snapshot
                .into_iter()
                .filter(|card| !card.is_pending())
                .map(|card| Slot {
                    card,
                    kind: SlotKind::Resolved,
                })
                .collect();
            let resolved = slots.len();
            let pending_len = pending.len();
            slots.extend(pending);
            state.slots = slots;
            (resolved, pending_len)
        };
        self.bump();
        tracing::debug!(resolved, pending, "Applied snapshot");
    }
}

impl Default for ReconcilingStore {
    fn default() -> Self {
        Self::new()
    }
}
