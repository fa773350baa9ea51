//! Type definitions for the bookwatch client.

pub mod card;
