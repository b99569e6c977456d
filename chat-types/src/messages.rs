//! JSON shapes exchanged with the relay's HTTP endpoints.
//!
//! | Endpoint                     | Response                  |
//! |------------------------------|---------------------------|
//! | `GET /persona`               | identity string           |
//! | `GET /contacts`              | list of identity strings  |
//! | `GET /messages[?since=<n>]`  | list of [`ChatMessage`]   |
//! | `POST /send` ([`SendRequest`]) | acknowledgement (ignored) |

use serde::{Deserialize, Serialize};

use crate::{Identity, Nonce};

/// Path of the endpoint returning the local identity.
pub const PERSONA_PATH: &str = "/persona";
/// Path of the endpoint returning the initial contact list.
pub const CONTACTS_PATH: &str = "/contacts";
/// Path of the incremental message endpoint.
pub const MESSAGES_PATH: &str = "/messages";
/// Path of the send endpoint.
pub const SEND_PATH: &str = "/send";
/// Query parameter carrying the poll cursor.
pub const SINCE_PARAM: &str = "since";

/// A message as delivered by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Originating identity
    pub sender: Identity,
    /// Destination identity
    pub receiver: Identity,
    /// Message text
    pub message: String,
    /// Origin time (unix seconds)
    pub timestamp: i64,
    /// Relay-assigned unique identifier
    pub nonce: Nonce,
    /// When the relay's client observed the message (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_time: Option<i64>,
}

impl ChatMessage {
    /// Time used for display and age ordering.
    ///
    /// `receive_time` wins over `timestamp` when both are present.
    pub fn display_time(&self) -> i64 {
        self.receive_time.unwrap_or(self.timestamp)
    }

    /// The participant on the other end of this message from `me`'s view.
    pub fn counterparty(&self, me: &Identity) -> &Identity {
        if &self.sender == me {
            &self.receiver
        } else {
            &self.sender
        }
    }

    /// Whether `contact` is the sender or the receiver.
    pub fn involves(&self, contact: &Identity) -> bool {
        &self.sender == contact || &self.receiver == contact
    }
}

/// Body of `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Receiver identity
    pub address: Identity,
    /// Message text
    pub message: String,
}
