//! Append-only message log.
//!
//! The log holds every message merged from the relay, in the order the relay
//! returned them. It is shared behind an `Rc` so the log store and every
//! derived view can hold it without copying; an append produces a new log.

use std::rc::Rc;

use relaychat_types::{ChatMessage, Nonce};

use crate::reactive::SameValue;

/// Ordered, append-only list of messages.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Rc<Vec<ChatMessage>>,
}

impl MessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new log with `batch` appended, preserving its order.
    ///
    /// Appending an empty batch returns a log sharing this one's storage.
    pub fn appended(&self, batch: &[ChatMessage]) -> Self {
        if batch.is_empty() {
            return self.clone();
        }
        let mut entries = Vec::with_capacity(self.entries.len() + batch.len());
        entries.extend_from_slice(&self.entries);
        entries.extend_from_slice(batch);
        Self {
            entries: Rc::new(entries),
        }
    }

    /// Nonce of the last message; the relay cursor.
    pub fn last_nonce(&self) -> Option<&Nonce> {
        self.entries.last().map(|m| &m.nonce)
    }

    /// Messages in log order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.entries.iter()
    }

    /// Messages as a slice.
    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SameValue for MessageLog {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries) || self.entries == other.entries
    }
}

impl PartialEq for MessageLog {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for MessageLog {}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<ChatMessage> for MessageLog {
    fn from_iter<I: IntoIterator<Item = ChatMessage>>(iter: I) -> Self {
        Self {
            entries: Rc::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(nonce: &str) -> ChatMessage {
        ChatMessage {
            sender: "alice".into(),
            receiver: "me".into(),
            message: "hi".into(),
            timestamp: 1_700_000_000,
            nonce: Nonce::from(nonce),
            receive_time: None,
        }
    }

    #[test]
    fn empty_log_has_no_cursor() {
        let log = MessageLog::new();
        assert!(log.is_empty());
        assert_eq!(log.last_nonce(), None);
    }

    #[test]
    fn append_preserves_order() {
        let log = MessageLog::new()
            .appended(&[msg("n1"), msg("n2")])
            .appended(&[msg("n3")]);
        let nonces: Vec<&str> = log.iter().map(|m| m.nonce.as_str()).collect();
        assert_eq!(nonces, vec!["n1", "n2", "n3"]);
        assert_eq!(log.last_nonce(), Some(&Nonce::from("n3")));
    }

    #[test]
    fn append_does_not_touch_previous_log() {
        let before = MessageLog::new().appended(&[msg("n1")]);
        let after = before.appended(&[msg("n2")]);
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert!(!before.same_value(&after));
    }

    #[test]
    fn empty_append_is_the_same_value() {
        let log = MessageLog::new().appended(&[msg("n1")]);
        assert!(log.appended(&[]).same_value(&log));
    }
}
