//! Huellas Integration - chat model client
//!
//! Sends the player's questions to a hosted language model and brings the
//! monk's answers back to the game loop without blocking it.

pub mod chat;
pub mod client;
pub mod conversation;
pub mod error;
pub mod settings;
pub mod types;

pub use client::{IntegrationClient, PendingRequest};
pub use conversation::Conversation;
pub use error::IntegrationError;
pub use settings::ChatSettings;
pub use types::*;
