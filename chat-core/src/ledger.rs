//! Pending ledger.
//!
//! Maps the nonce of every message the user has accounted for to how it got
//! there. A message in the log whose nonce is not in the ledger is unseen.
//!
//! Entries are added when the client reconciles one of its own sends, or
//! when a message is displayed in the open conversation. Entries are never
//! removed.

use std::collections::BTreeMap;

use relaychat_types::Nonce;

/// Why a nonce is in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOrigin {
    /// The message was sent from this client.
    LocalSend,
    /// The message was shown to the user.
    Viewed,
}

crate::same_value_from_eq!(LedgerOrigin);

/// Nonces that no longer count as unseen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingLedger {
    entries: BTreeMap<Nonce, LedgerOrigin>,
}

impl PendingLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `nonce`. Returns `false` if it was already present, in which
    /// case the original origin is kept.
    pub fn record(&mut self, nonce: Nonce, origin: LedgerOrigin) -> bool {
        match self.entries.entry(nonce) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(origin);
                true
            }
        }
    }

    /// Copy of this ledger with every nonce in `nonces` recorded.
    ///
    /// Store updates replace the whole value, so this is the form the
    /// session uses.
    pub fn with_recorded<'a>(
        &self,
        nonces: impl IntoIterator<Item = &'a Nonce>,
        origin: LedgerOrigin,
    ) -> Self {
        let mut next = self.clone();
        for nonce in nonces {
            next.record(nonce.clone(), origin);
        }
        next
    }

    /// Check if `nonce` has been recorded.
    pub fn contains(&self, nonce: &Nonce) -> bool {
        self.entries.contains_key(nonce)
    }

    /// How `nonce` was recorded, if it was.
    pub fn origin(&self, nonce: &Nonce) -> Option<LedgerOrigin> {
        self.entries.get(nonce).copied()
    }

    /// Number of recorded nonces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

crate::same_value_from_eq!(PendingLedger);
