//! Outgoing message tracking.
//!
//! Every send is recorded here until the relay echoes it back through
//! `/messages`. Entries flow through these states:
//!
//! 1. `enqueue()` - the send was accepted locally ([`OutboxState::Queued`])
//! 2. `mark_posted()` - the relay acknowledged the POST ([`OutboxState::Posted`])
//! 3. `reconcile()` - the message came back from the relay; entry removed
//!
//! Matching is by receiver and text: the relay assigns the nonce, so the
//! client cannot know it in advance. When several entries match, the oldest
//! one is reconciled first.

use relaychat_types::{ChatMessage, Contact, Identity, SendId};

/// Delivery state of an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxState {
    /// Waiting for the relay to accept the POST.
    Queued,
    /// Accepted by the relay, not yet seen in `/messages`.
    Posted,
}

/// A message the user sent that has not come back from the relay yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Local handle for this send.
    pub id: SendId,
    /// Recipient.
    pub receiver: Contact,
    /// Message text.
    pub text: String,
    /// Delivery state.
    pub state: OutboxState,
}

impl OutgoingMessage {
    /// Check if `message` is the relay's copy of this send.
    pub fn matches(&self, message: &ChatMessage, me: &Identity) -> bool {
        message.sender == *me && message.receiver == self.receiver && message.message == self.text
    }
}

/// FIFO of outgoing messages awaiting their echo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    entries: Vec<OutgoingMessage>,
}

impl Outbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new send and return its handle.
    pub fn enqueue(&mut self, receiver: Contact, text: impl Into<String>) -> SendId {
        let id = SendId::new();
        self.entries.push(OutgoingMessage {
            id,
            receiver,
            text: text.into(),
            state: OutboxState::Queued,
        });
        id
    }

    /// Mark a send as accepted by the relay. Returns `false` if the entry
    /// is gone (already reconciled).
    pub fn mark_posted(&mut self, id: SendId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.state = OutboxState::Posted;
                true
            }
            None => false,
        }
    }

    /// Remove and return the oldest entry `message` is the echo of.
    pub fn reconcile(&mut self, message: &ChatMessage, me: &Identity) -> Option<OutgoingMessage> {
        let index = self.entries.iter().position(|e| e.matches(message, me))?;
        Some(self.entries.remove(index))
    }

    /// Remove an entry by handle.
    pub fn remove(&mut self, id: SendId) -> Option<OutgoingMessage> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Look up an entry by handle.
    pub fn get(&self, id: SendId) -> Option<&OutgoingMessage> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Check if a send is still waiting for its echo.
    pub fn is_pending(&self, id: SendId) -> bool {
        self.get(id).is_some()
    }

    /// Entries addressed to `receiver`, oldest first.
    pub fn pending_for<'a>(
        &'a self,
        receiver: &'a Contact,
    ) -> impl Iterator<Item = &'a OutgoingMessage> + 'a {
        self.entries.iter().filter(move |e| &e.receiver == receiver)
    }

    /// Entries in send order.
    pub fn iter(&self) -> std::slice::Iter<'_, OutgoingMessage> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

crate::same_value_from_eq!(Outbox);

#[cfg(test)]
mod tests {
    use super::*;
    use relaychat_types::Nonce;

    fn me() -> Identity {
        Identity::new("me")
    }

    fn echo(receiver: &str, text: &str, nonce: &str) -> ChatMessage {
        ChatMessage {
            sender: me(),
            receiver: receiver.into(),
            message: text.into(),
            timestamp: 0,
            nonce: Nonce::from(nonce),
            receive_time: None,
        }
    }

    #[test]
    fn enqueue_starts_queued() {
        let mut outbox = Outbox::new();
        let id = outbox.enqueue("bob".into(), "hi");
        assert_eq!(outbox.get(id).map(|e| e.state), Some(OutboxState::Queued));
        assert!(outbox.is_pending(id));
    }

    #[test]
    fn mark_posted_updates_state() {
        let mut outbox = Outbox::new();
        let id = outbox.enqueue("bob".into(), "hi");
        assert!(outbox.mark_posted(id));
        assert_eq!(outbox.get(id).map(|e| e.state), Some(OutboxState::Posted));
    }

    #[test]
    fn mark_posted_after_reconcile_is_ignored() {
        let mut outbox = Outbox::new();
        let id = outbox.enqueue("bob".into(), "hi");
        outbox.reconcile(&echo("bob", "hi", "n1"), &me());
        assert!(!outbox.mark_posted(id));
    }

    #[test]
    fn reconcile_removes_oldest_match() {
        let mut outbox = Outbox::new();
        let first = outbox.enqueue("bob".into(), "hi");
        let second = outbox.enqueue("bob".into(), "hi");

        let matched = outbox.reconcile(&echo("bob", "hi", "n1"), &me());

        assert_eq!(matched.map(|e| e.id), Some(first));
        assert!(outbox.is_pending(second));
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn reconcile_requires_same_receiver_and_text() {
        let mut outbox = Outbox::new();
        outbox.enqueue("bob".into(), "hi");

        assert!(outbox.reconcile(&echo("carol", "hi", "n1"), &me()).is_none());
        assert!(outbox.reconcile(&echo("bob", "hello", "n2"), &me()).is_none());
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn messages_from_others_never_reconcile() {
        let mut outbox = Outbox::new();
        outbox.enqueue("bob".into(), "hi");
        let mut incoming = echo("bob", "hi", "n1");
        incoming.sender = "bob".into();
        incoming.receiver = "bob".into();

        assert!(outbox.reconcile(&incoming, &me()).is_none());
    }

    #[test]
    fn pending_for_filters_by_receiver() {
        let mut outbox = Outbox::new();
        outbox.enqueue("bob".into(), "one");
        outbox.enqueue("carol".into(), "two");
        outbox.enqueue("bob".into(), "three");

        let bob = Contact::from("bob");
        let texts: Vec<&str> = outbox.pending_for(&bob).map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[test]
    fn remove_by_id() {
        let mut outbox = Outbox::new();
        let id = outbox.enqueue("bob".into(), "hi");
        assert!(outbox.remove(id).is_some());
        assert!(outbox.is_empty());
        assert!(outbox.remove(id).is_none());
    }
}
