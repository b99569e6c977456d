//! Ordered contact set.
//!
//! Contacts keep insertion order, never contain duplicates, and only grow.
//! A contact can never be empty or equal to the local identity.

use relaychat_types::{Contact, Identity, ValidationError};

/// Result of a successful add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactAdded {
    /// The contact was appended.
    Added,
    /// The contact was already present; nothing changed.
    AlreadyKnown,
}

/// Insertion-ordered set of contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactList {
    entries: Vec<Contact>,
}

impl ContactList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial list from the relay's `/contacts` response.
    ///
    /// Invalid names (empty, or the local identity) and duplicates are
    /// dropped; the first occurrence keeps its position.
    pub fn from_server(names: impl IntoIterator<Item = Contact>, me: &Identity) -> Self {
        let mut list = Self::new();
        for name in names {
            let _ = list.insert(name, me);
        }
        list
    }

    /// Check that `name` may be a contact of `me`.
    pub fn validate(name: &Contact, me: &Identity) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::EmptyContact);
        }
        if name == me {
            return Err(ValidationError::SelfContact(me.to_string()));
        }
        Ok(())
    }

    /// Append `name` unless it is already present.
    pub fn insert(&mut self, name: Contact, me: &Identity) -> Result<ContactAdded, ValidationError> {
        Self::validate(&name, me)?;
        if self.contains(&name) {
            return Ok(ContactAdded::AlreadyKnown);
        }
        self.entries.push(name);
        Ok(ContactAdded::Added)
    }

    /// Check if `name` is present.
    pub fn contains(&self, name: &Contact) -> bool {
        self.entries.iter().any(|c| c == name)
    }

    /// Contacts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.entries.iter()
    }

    /// Contacts as a slice.
    pub fn as_slice(&self) -> &[Contact] {
        &self.entries
    }

    /// Number of contacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no contacts.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

crate::same_value_from_eq!(ContactList);

impl<'a> IntoIterator for &'a ContactList {
    type Item = &'a Contact;
    type IntoIter = std::slice::Iter<'a, Contact>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
