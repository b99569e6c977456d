//! ChatSession - the main interface for relaychat.
//!
//! This module provides [`ChatSession`], the service object that owns every
//! piece of client state for one login and keeps it in sync with the relay.
//!
//! # Architecture
//!
//! The session holds the reactive stores (contacts, message log, pending
//! ledger, active conversation, outbox) and the derived views built on them.
//! All I/O goes through [`ResilientFetch`], so every operation that talks to
//! the relay eventually succeeds; only local validation can fail.
//!
//! ```text
//! Application → ChatSession → ResilientFetch → HttpTransport → Network
//!                   ↓
//!              chat-core (stores, derived views, pure state)
//! ```
//!
//! Stores are single-threaded. Run the session on a current-thread runtime
//! and spawn its tasks inside a [`tokio::task::LocalSet`].
//!
//! # Example
//!
//! ```ignore
//! use relaychat_client::{ChatSession, ClientConfig, ReqwestTransport};
//!
//! let config = ClientConfig::default();
//! let transport = ReqwestTransport::from_config(&config)?;
//! let session = Rc::new(ChatSession::start(&config, transport).await);
//!
//! session.spawn_poller();
//! session.send("bob", "hello").await?;
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde::de::IgnoredAny;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use relaychat_core::views::{self, UnseenCounts};
use relaychat_core::{
    Connectivity, ContactAdded, ContactList, Derived, LedgerOrigin, MessageLog, Outbox,
    PendingLedger, Runtime, SeenNonces, Store,
};
use relaychat_types::{
    ChatMessage, Contact, Identity, Nonce, SendId, SendRequest, ValidationError, CONTACTS_PATH,
    MESSAGES_PATH, PERSONA_PATH, SEND_PATH, SINCE_PARAM,
};

use crate::config::ClientConfig;
use crate::fetch::ResilientFetch;
use crate::transport::{HttpRequest, HttpTransport};

/// Result of one call to [`ChatSession::poll_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll was still in flight; nothing was fetched.
    Skipped,
    /// The batch was merged.
    Merged {
        /// Messages appended to the log.
        accepted: usize,
        /// Messages dropped because their nonce was already seen.
        duplicates: usize,
    },
}

/// One logged-in client session.
pub struct ChatSession<T> {
    runtime: Runtime,
    fetch: ResilientFetch<T>,
    identity: Identity,
    poll_interval: Duration,

    contacts: Store<ContactList>,
    log: Store<MessageLog>,
    ledger: Store<PendingLedger>,
    active: Store<Option<Contact>>,
    outbox: Store<Outbox>,
    seen: RefCell<SeenNonces>,
    polling: Cell<bool>,

    unseen_messages: Derived<Vec<ChatMessage>>,
    unseen_counts: Derived<UnseenCounts>,
    transcript: Derived<Vec<ChatMessage>>,
    cursor: Derived<Option<Nonce>>,

    /// Record messages shown in the open conversation as viewed.
    auto_mark_seen: bool,
}

impl<T: HttpTransport + 'static> ChatSession<T> {
    /// Fetch the identity and initial contacts, then build the session.
    ///
    /// Both requests are retried until the relay answers, so this only
    /// returns once the relay has been reached.
    pub async fn start(config: &ClientConfig, transport: T) -> Self {
        let runtime = Runtime::new();
        let fetch = ResilientFetch::new(transport, config.retry_policy(), &runtime);

        let identity: Identity = fetch.get_json(PERSONA_PATH, &[]).await;
        let server_contacts: Vec<Contact> = fetch.get_json(CONTACTS_PATH, &[]).await;
        let contacts = ContactList::from_server(server_contacts, &identity);

        tracing::info!(
            "Session started as {} with {} contacts",
            identity,
            contacts.len()
        );

        Self::assemble(runtime, fetch, identity, contacts, config)
    }

    fn assemble(
        runtime: Runtime,
        fetch: ResilientFetch<T>,
        identity: Identity,
        contacts: ContactList,
        config: &ClientConfig,
    ) -> Self {
        let contacts = Store::new(&runtime, contacts);
        let log = Store::new(&runtime, MessageLog::new());
        let ledger = Store::new(&runtime, PendingLedger::new());
        let active: Store<Option<Contact>> = Store::new(&runtime, None);
        let outbox = Store::new(&runtime, Outbox::new());

        let me = identity.clone();
        let unseen_messages = Derived::combine2(&log, &ledger, move |log, ledger| {
            views::unseen_messages(log, ledger, &me)
        });
        let unseen_counts = Derived::combine2(&contacts, &unseen_messages, |contacts, unseen| {
            UnseenCounts::compute(contacts, unseen)
        });
        let transcript = Derived::combine2(&log, &active, |log, active: &Option<Contact>| {
            views::transcript(log, active.as_ref())
        });
        let cursor = Derived::map(&log, views::cursor);

        Self {
            runtime,
            fetch,
            identity,
            poll_interval: config.poll_interval(),
            contacts,
            log,
            ledger,
            active,
            outbox,
            seen: RefCell::new(SeenNonces::new()),
            polling: Cell::new(false),
            unseen_messages,
            unseen_counts,
            transcript,
            cursor,
            auto_mark_seen: config.session.auto_mark_seen,
        }
    }

    // ===========================================
    // Read access
    // ===========================================

    /// The local identity, fixed for the session.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Contacts in insertion order.
    pub fn contacts(&self) -> Derived<ContactList> {
        self.contacts.read_only()
    }

    /// Every merged message, in relay order.
    pub fn log(&self) -> Derived<MessageLog> {
        self.log.read_only()
    }

    /// Nonces that no longer count as unseen.
    pub fn ledger(&self) -> Derived<PendingLedger> {
        self.ledger.read_only()
    }

    /// The open conversation, if any.
    pub fn active(&self) -> Derived<Option<Contact>> {
        self.active.read_only()
    }

    /// Sends still waiting for their echo from the relay.
    pub fn outbox(&self) -> Derived<Outbox> {
        self.outbox.read_only()
    }

    /// Whether the relay answered the most recent request.
    pub fn connectivity(&self) -> Derived<Connectivity> {
        self.fetch.connectivity()
    }

    /// Messages from others not yet in the ledger.
    pub fn unseen_messages(&self) -> &Derived<Vec<ChatMessage>> {
        &self.unseen_messages
    }

    /// Unseen message count per contact.
    pub fn unseen_counts(&self) -> &Derived<UnseenCounts> {
        &self.unseen_counts
    }

    /// Messages of the open conversation, in log order.
    pub fn transcript(&self) -> &Derived<Vec<ChatMessage>> {
        &self.transcript
    }

    /// Nonce the next poll resumes after.
    pub fn cursor(&self) -> &Derived<Option<Nonce>> {
        &self.cursor
    }

    /// The reactive runtime shared by every store of this session.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Number of distinct nonces merged so far.
    pub fn seen_count(&self) -> usize {
        self.seen.borrow().len()
    }

    // ===========================================
    // Contacts
    // ===========================================

    /// Add `name` to the contact list.
    ///
    /// Fails without touching the list if `name` is empty or is the local
    /// identity. Adding a known contact succeeds and changes nothing.
    pub fn add_contact(&self, name: impl Into<Contact>) -> Result<ContactAdded, ValidationError> {
        let name = name.into();
        let mut next = self.contacts.get();
        let added = next.insert(name.clone(), &self.identity)?;
        if added == ContactAdded::Added {
            tracing::info!("Adding new contact {}", name);
            self.contacts.set(next);
        }
        Ok(added)
    }

    // ===========================================
    // Polling
    // ===========================================

    /// Fetch messages after the cursor and merge them.
    ///
    /// Returns [`PollOutcome::Skipped`] at once if another poll is still
    /// waiting on the relay.
    pub async fn poll_once(&self) -> PollOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.polling) else {
            tracing::debug!("Poll skipped: previous poll still in flight");
            return PollOutcome::Skipped;
        };

        let mut request = HttpRequest::get(MESSAGES_PATH);
        if let Some(cursor) = self.cursor.get() {
            request = request.with_query(SINCE_PARAM, cursor.as_str());
        }

        let batch: Vec<ChatMessage> = self.fetch.request_as(request).await;
        self.merge(batch)
    }

    /// Merge a batch returned by `/messages`.
    ///
    /// Already-seen nonces are dropped. For each new message the
    /// counterparty becomes a contact and a matching outbox entry is
    /// reconciled. The log is extended once for the whole batch, and all
    /// store updates propagate in a single flush.
    pub fn merge(&self, batch: Vec<ChatMessage>) -> PollOutcome {
        let received = batch.len();
        let fresh = self.seen.borrow_mut().accept(batch);
        let accepted = fresh.len();
        let duplicates = received - accepted;

        if fresh.is_empty() {
            return PollOutcome::Merged {
                accepted,
                duplicates,
            };
        }

        self.runtime.batch(|| {
            for message in &fresh {
                let other = message.counterparty(&self.identity).clone();
                if let Err(e) = self.add_contact(other) {
                    tracing::debug!("Not adding counterparty of {}: {}", message.nonce, e);
                }
            }

            let mut outbox = self.outbox.get();
            let own: Vec<Nonce> = fresh
                .iter()
                .filter(|m| outbox.reconcile(m, &self.identity).is_some())
                .map(|m| m.nonce.clone())
                .collect();
            if !own.is_empty() {
                tracing::debug!("Reconciled {} sent messages", own.len());
                self.outbox.set(outbox);
                self.ledger
                    .update(|ledger| ledger.with_recorded(&own, LedgerOrigin::LocalSend));
            }

            self.log.update(|log| log.appended(&fresh));
            self.mark_shown(&fresh);
        });

        tracing::info!(
            "Merged {} new messages ({} duplicates)",
            accepted,
            duplicates
        );
        PollOutcome::Merged {
            accepted,
            duplicates,
        }
    }

    /// Poll on the configured interval for as long as the task lives.
    ///
    /// Ticks that fall due while a poll is still running are skipped.
    pub async fn run_poller(self: Rc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            "Poller started (interval: {}ms)",
            self.poll_interval.as_millis()
        );

        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }

    /// Spawn [`run_poller`](Self::run_poller) on the current `LocalSet`.
    pub fn spawn_poller(self: &Rc<Self>) -> JoinHandle<()> {
        tokio::task::spawn_local(Rc::clone(self).run_poller())
    }

    // ===========================================
    // Sending
    // ===========================================

    /// Send `text` to `receiver`, waiting until the relay accepts it.
    ///
    /// The message is not added to the log; it arrives through the poller
    /// like any other, at which point its outbox entry is reconciled.
    pub async fn send(
        &self,
        receiver: impl Into<Contact>,
        text: impl Into<String>,
    ) -> Result<SendId, ValidationError> {
        let receiver = receiver.into();
        let text = text.into();
        let id = self.enqueue(receiver.clone(), text.clone())?;
        self.post(id, receiver, text).await;
        Ok(id)
    }

    /// Validate and queue a send, then post it from a local task.
    ///
    /// Must be called from within a `LocalSet`.
    pub fn send_detached(
        self: &Rc<Self>,
        receiver: impl Into<Contact>,
        text: impl Into<String>,
    ) -> Result<SendId, ValidationError> {
        let receiver = receiver.into();
        let text = text.into();
        let id = self.enqueue(receiver.clone(), text.clone())?;
        let session = Rc::clone(self);
        tokio::task::spawn_local(async move { session.post(id, receiver, text).await });
        Ok(id)
    }

    fn enqueue(&self, receiver: Contact, text: String) -> Result<SendId, ValidationError> {
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        if receiver.is_empty() {
            return Err(ValidationError::EmptyContact);
        }
        let mut outbox = self.outbox.get();
        let id = outbox.enqueue(receiver, text);
        self.outbox.set(outbox);
        Ok(id)
    }

    async fn post(&self, id: SendId, receiver: Contact, text: String) {
        let body = SendRequest {
            address: receiver,
            message: text,
        };
        let posted: Result<IgnoredAny, _> = self.fetch.post_json(SEND_PATH, &body).await;
        if let Err(e) = posted {
            tracing::error!("Send {} dropped: {}", id, e);
            return;
        }

        let mut outbox = self.outbox.get();
        if outbox.mark_posted(id) {
            self.outbox.set(outbox);
        }
        tracing::debug!("Send {} accepted by relay", id);
    }

    // ===========================================
    // Navigation
    // ===========================================

    /// Open the conversation with `contact`, adding it as a contact first.
    ///
    /// On a validation error nothing changes.
    pub fn open_conversation(&self, contact: impl Into<Contact>) -> Result<(), ValidationError> {
        let contact = contact.into();
        self.runtime.batch(|| {
            self.add_contact(contact.clone())?;
            self.active.set(Some(contact));
            self.log.with(|log| self.mark_shown(log.iter()));
            Ok(())
        })
    }

    /// Close the open conversation.
    pub fn close_conversation(&self) {
        self.active.set(None);
    }

    /// Record `nonces` as seen by the user.
    pub fn mark_seen<'a>(&self, nonces: impl IntoIterator<Item = &'a Nonce>) {
        let nonces: Vec<&Nonce> = nonces.into_iter().collect();
        self.ledger
            .update(|ledger| ledger.with_recorded(nonces.iter().copied(), LedgerOrigin::Viewed));
    }

    /// Record as viewed those of `messages` that the open conversation
    /// shows. Called inside the batch that made them visible, so the ledger
    /// changes in the same flush as the transcript.
    fn mark_shown<'a>(&self, messages: impl IntoIterator<Item = &'a ChatMessage>) {
        if !self.auto_mark_seen {
            return;
        }
        let Some(active) = self.active.get() else {
            return;
        };
        let shown: Vec<&Nonce> = messages
            .into_iter()
            .filter(|m| m.involves(&active))
            .map(|m| &m.nonce)
            .collect();
        if !shown.is_empty() {
            self.ledger.update(|ledger| {
                ledger.with_recorded(shown.iter().copied(), LedgerOrigin::Viewed)
            });
        }
    }

    /// Borrow the resilient fetch used by this session.
    pub fn fetch(&self) -> &ResilientFetch<T> {
        &self.fetch
    }
}

/// Single-slot guard: at most one poll in flight.
struct InFlight<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
