//! Seen-nonce tracking for relaychat.
//!
//! The relay may return messages the client already has (a poll can overlap
//! with the previous one, or the relay can re-send at the cursor). This
//! module keeps the set of every nonce ever merged into the message log so
//! each message is accepted exactly once.
//!
//! The set lives for the whole session and is never pruned.

use std::collections::HashSet;

use relaychat_types::{ChatMessage, Nonce};

/// Set of nonces already merged into the message log.
#[derive(Debug, Clone, Default)]
pub struct SeenNonces {
    seen: HashSet<Nonce>,
}

impl SeenNonces {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only messages whose nonce has not been seen, recording them.
    ///
    /// Order is preserved. A nonce repeated inside `batch` is accepted once
    /// (first occurrence wins).
    pub fn accept(&mut self, batch: Vec<ChatMessage>) -> Vec<ChatMessage> {
        batch
            .into_iter()
            .filter(|message| self.seen.insert(message.nonce.clone()))
            .collect()
    }

    /// Check if a nonce has been accepted before.
    pub fn contains(&self, nonce: &Nonce) -> bool {
        self.seen.contains(nonce)
    }

    /// Number of distinct nonces seen this session.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(nonce: &str) -> ChatMessage {
        ChatMessage {
            sender: "alice".into(),
            receiver: "me".into(),
            message: format!("message {}", nonce),
            timestamp: 0,
            nonce: Nonce::from(nonce),
            receive_time: None,
        }
    }

    fn nonces(batch: &[ChatMessage]) -> Vec<&str> {
        batch.iter().map(|m| m.nonce.as_str()).collect()
    }

    #[test]
    fn starts_empty() {
        let seen = SeenNonces::new();
        assert!(seen.is_empty());
        assert_eq!(seen.len(), 0);
    }

    #[test]
    fn first_batch_is_accepted_in_order() {
        let mut seen = SeenNonces::new();
        let fresh = seen.accept(vec![msg("n1"), msg("n2"), msg("n3")]);
        assert_eq!(nonces(&fresh), vec!["n1", "n2", "n3"]);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn overlap_at_cursor_is_dropped() {
        let mut seen = SeenNonces::new();
        seen.accept(vec![msg("n4"), msg("n5")]);

        // Relay re-sends the cursor message along with the new one
        let fresh = seen.accept(vec![msg("n5"), msg("n6")]);

        assert_eq!(nonces(&fresh), vec!["n6"]);
        assert!(seen.contains(&Nonce::from("n5")));
        assert!(seen.contains(&Nonce::from("n6")));
    }

    #[test]
    fn duplicates_within_a_batch_are_accepted_once() {
        let mut seen = SeenNonces::new();
        let fresh = seen.accept(vec![msg("n1"), msg("n1"), msg("n2")]);
        assert_eq!(nonces(&fresh), vec!["n1", "n2"]);
    }

    #[test]
    fn repeated_batches_are_idempotent() {
        let mut seen = SeenNonces::new();
        let batch = vec![msg("a"), msg("b")];

        assert_eq!(seen.accept(batch.clone()).len(), 2);
        assert!(seen.accept(batch.clone()).is_empty());
        assert!(seen.accept(batch).is_empty());
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut seen = SeenNonces::new();
        assert!(seen.accept(Vec::new()).is_empty());
        assert!(seen.is_empty());
    }
}
