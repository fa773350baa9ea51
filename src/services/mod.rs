//! Service implementations for the card store API.

mod cards;

pub use cards::{CardsService, CARDS_PATH, CARD_PATH};
