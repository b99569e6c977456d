//! Error types for relaychat.

use thiserror::Error;

/// Local, synchronous rejection of a user intent.
///
/// These are never retried and never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Message text was empty
    #[error("message text is empty")]
    EmptyMessage,

    /// Contact name was empty
    #[error("contact name is empty")]
    EmptyContact,

    /// Contact name equals the local identity
    #[error("cannot add yourself ({0}) as a contact")]
    SelfContact(String),
}
