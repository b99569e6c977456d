//! # chat-types
//!
//! Wire format types for the relaychat polling client.
//!
//! This crate provides the foundational types used across all relaychat crates:
//! - [`Identity`], [`Contact`], [`Nonce`], [`SendId`] - Naming and identity types
//! - [`ChatMessage`] - A message as served by the relay's `/messages` endpoint
//! - [`SendRequest`] - The body posted to `/send`
//! - [`ValidationError`] - Local rejections of user intents

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::ValidationError;
pub use ids::{Contact, Identity, Nonce, SendId};
pub use messages::{
    ChatMessage, SendRequest, CONTACTS_PATH, MESSAGES_PATH, PERSONA_PATH, SEND_PATH, SINCE_PARAM,
};
