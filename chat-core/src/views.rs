//! Pure functions behind the session's derived views.
//!
//! Each function takes the current values of its source stores and returns
//! a fresh value. The session wires them into [`crate::Derived`] nodes; they
//! are also usable directly on plain values.

use std::collections::HashMap;

use relaychat_types::{ChatMessage, Contact, Identity, Nonce};

use crate::contacts::ContactList;
use crate::ledger::PendingLedger;
use crate::log::MessageLog;

/// Messages from other participants whose nonce is not in the ledger.
pub fn unseen_messages(
    log: &MessageLog,
    ledger: &PendingLedger,
    me: &Identity,
) -> Vec<ChatMessage> {
    log.iter()
        .filter(|m| m.sender != *me && !ledger.contains(&m.nonce))
        .cloned()
        .collect()
}

/// Unseen message count for each contact, in contact order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnseenCounts {
    counts: Vec<(Contact, usize)>,
}

impl UnseenCounts {
    /// Count `unseen` messages by sender for every contact in `contacts`.
    ///
    /// Senders that are not contacts are ignored; contacts without unseen
    /// messages get a zero entry.
    pub fn compute(contacts: &ContactList, unseen: &[ChatMessage]) -> Self {
        let mut by_sender: HashMap<&Identity, usize> = HashMap::new();
        for message in unseen {
            *by_sender.entry(&message.sender).or_default() += 1;
        }
        let counts = contacts
            .iter()
            .map(|c| (c.clone(), by_sender.get(c).copied().unwrap_or(0)))
            .collect();
        Self { counts }
    }

    /// Unseen count for `contact` (zero if unknown).
    pub fn get(&self, contact: &Contact) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| c == contact)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Sum over all contacts.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// `(contact, count)` pairs in contact order.
    pub fn iter(&self) -> impl Iterator<Item = (&Contact, usize)> {
        self.counts.iter().map(|(c, n)| (c, *n))
    }
}

crate::same_value_from_eq!(UnseenCounts);

/// The open conversation: every message sent to or by `active`, in log
/// order. Empty when no conversation is open.
pub fn transcript(log: &MessageLog, active: Option<&Contact>) -> Vec<ChatMessage> {
    match active {
        Some(contact) => log.iter().filter(|m| m.involves(contact)).cloned().collect(),
        None => Vec::new(),
    }
}

/// Poll cursor: nonce of the last merged message.
pub fn cursor(log: &MessageLog) -> Option<Nonce> {
    log.last_nonce().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerOrigin;

    fn me() -> Identity {
        Identity::new("me")
    }

    fn msg(sender: &str, receiver: &str, nonce: &str) -> ChatMessage {
        ChatMessage {
            sender: sender.into(),
            receiver: receiver.into(),
            message: format!("{} -> {}", sender, receiver),
            timestamp: 0,
            nonce: Nonce::from(nonce),
            receive_time: None,
        }
    }

    fn contacts(names: &[&str]) -> ContactList {
        ContactList::from_server(names.iter().map(|n| Contact::from(*n)), &me())
    }

    #[test]
    fn unseen_count_excludes_ledger_entries() {
        let log: MessageLog = vec![
            msg("alice", "me", "a1"),
            msg("alice", "me", "a2"),
            msg("alice", "me", "a3"),
        ]
        .into_iter()
        .collect();
        let ledger = PendingLedger::new().with_recorded(&[Nonce::from("a2")], LedgerOrigin::Viewed);

        let unseen = unseen_messages(&log, &ledger, &me());
        let counts = UnseenCounts::compute(&contacts(&["alice"]), &unseen);

        assert_eq!(counts.get(&Contact::from("alice")), 2);
    }

    #[test]
    fn own_messages_are_never_unseen() {
        let log: MessageLog = vec![msg("me", "alice", "m1"), msg("alice", "me", "a1")]
            .into_iter()
            .collect();
        let unseen = unseen_messages(&log, &PendingLedger::new(), &me());
        let nonces: Vec<&str> = unseen.iter().map(|m| m.nonce.as_str()).collect();
        assert_eq!(nonces, vec!["a1"]);
    }

    #[test]
    fn counts_follow_contact_order_with_zeros() {
        let log: MessageLog = vec![
            msg("bob", "me", "b1"),
            msg("stranger", "me", "s1"),
            msg("bob", "me", "b2"),
        ]
        .into_iter()
        .collect();
        let unseen = unseen_messages(&log, &PendingLedger::new(), &me());
        let counts = UnseenCounts::compute(&contacts(&["alice", "bob"]), &unseen);

        let pairs: Vec<(&str, usize)> = counts.iter().map(|(c, n)| (c.as_str(), n)).collect();
        assert_eq!(pairs, vec![("alice", 0), ("bob", 2)]);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.get(&Contact::from("stranger")), 0);
    }

    #[test]
    fn transcript_keeps_log_order_for_both_directions() {
        let log: MessageLog = vec![
            msg("alice", "me", "a1"),
            msg("bob", "me", "b1"),
            msg("me", "alice", "m1"),
            msg("alice", "me", "a2"),
        ]
        .into_iter()
        .collect();

        let alice = Contact::from("alice");
        let shown = transcript(&log, Some(&alice));
        let nonces: Vec<&str> = shown.iter().map(|m| m.nonce.as_str()).collect();
        assert_eq!(nonces, vec!["a1", "m1", "a2"]);
    }

    #[test]
    fn no_active_conversation_means_empty_transcript() {
        let log: MessageLog = vec![msg("alice", "me", "a1")].into_iter().collect();
        assert!(transcript(&log, None).is_empty());
    }

    #[test]
    fn cursor_is_last_nonce() {
        assert_eq!(cursor(&MessageLog::new()), None);
        let log: MessageLog = vec![msg("alice", "me", "n4"), msg("alice", "me", "n5")]
            .into_iter()
            .collect();
        assert_eq!(cursor(&log), Some(Nonce::from("n5")));
    }
}
