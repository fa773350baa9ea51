//! Card types.
//!
//! A card is one bookmark: a URL with a title and a description. Its id is
//! either assigned by the card store or the empty sentinel, which marks a
//! card the server has not acknowledged yet.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{BookwatchError, BookwatchResult};

/// Wire value of the pending sentinel id.
pub const PENDING_ID: &str = "";

/// Identifier of a card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Creates an id from a server-assigned token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel id carried by cards awaiting a server id.
    pub fn pending() -> Self {
        Self(PENDING_ID.to_string())
    }

    /// Returns true if this is the sentinel id.
    pub fn is_pending(&self) -> bool {
        self.0 == PENDING_ID
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pending() {
            f.write_str("<pending>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A bookmark card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    /// Server-assigned id, or the pending sentinel.
    pub id: CardId,
    /// Bookmarked URL.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
}

/// Ordered list of cards as shown to the user.
pub type CardList = Vec<Card>;

impl Card {
    /// Creates a resolved card.
    pub fn new(
        id: impl Into<CardId>,
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    /// Creates an all-empty card shown while the first snapshot loads.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Creates a pending card from a draft.
    pub fn from_draft(draft: CardDraft) -> Self {
        Self {
            id: CardId::pending(),
            url: draft.url,
            title: draft.title,
            description: draft.description,
        }
    }

    /// Returns true if the card still carries the sentinel id.
    pub fn is_pending(&self) -> bool {
        is_pending(self)
    }
}

/// Returns true iff the card's id equals the sentinel.
pub fn is_pending(card: &Card) -> bool {
    card.id.is_pending()
}

/// Compares two cards by identity.
///
/// Pending cards have no identity yet and never compare equal, not even to
/// themselves.
pub fn equals_by_id(a: &Card, b: &Card) -> bool {
    !is_pending(a) && !is_pending(b) && a.id == b.id
}

/// User-supplied fields for a new card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    /// URL to bookmark.
    pub url: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
}

impl CardDraft {
    /// Creates a draft.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    /// Checks that every field is present.
    ///
    /// Whitespace-only values count as missing. The error names the first
    /// missing field in url, title, description order.
    pub fn validate(&self) -> BookwatchResult<()> {
        for (field, value) in [
            ("url", &self.url),
            ("title", &self.title),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(BookwatchError::validation_field(
                    format!("{} is required", field),
                    field,
                ));
            }
        }
        Ok(())
    }
}

/// Client-side correlation token attached to an optimistic card.
///
/// Never sent to the server. Lets the gateway resolve or roll back exactly
/// the card it appended, even with several adds in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingToken(Uuid);

impl PendingToken {
    /// Generates a fresh token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PendingToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PendingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Card as exchanged with the card store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Server id; empty in create requests.
    #[serde(default)]
    pub uuid: String,
    /// URL.
    #[serde(default)]
    pub url: String,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

impl CardRecord {
    /// Builds the create-request body for a draft.
    pub fn for_create(draft: &CardDraft) -> Self {
        Self {
            uuid: PENDING_ID.to_string(),
            url: draft.url.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
        }
    }
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        Card {
            id: CardId::from(record.uuid),
            url: record.url,
            title: record.title,
            description: record.description,
        }
    }
}

impl From<Card> for CardRecord {
    fn from(card: Card) -> Self {
        CardRecord {
            uuid: card.id.0,
            url: card.url,
            title: card.title,
            description: card.description,
        }
    }
}
