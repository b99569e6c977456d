//! Equality rule used to gate store updates.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

use relaychat_types::{ChatMessage, Identity, Nonce, SendId};

/// Whether two values are observably the same.
///
/// This is `==` for most types, except that floating point `NaN` is the
/// same value as itself, and shared pointers compare by address first.
pub trait SameValue {
    /// Returns true if replacing `self` with `other` would not be observable.
    fn same_value(&self, other: &Self) -> bool;
}

/// Implement [`SameValue`] by delegating to `PartialEq`.
///
/// Only use this for types without floating point fields.
#[macro_export]
macro_rules! same_value_from_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::reactive::SameValue for $ty {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_from_eq!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    String,
    std::time::Duration,
    Identity,
    Nonce,
    SendId,
    ChatMessage,
);

impl SameValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl SameValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<K: Ord, V: SameValue> SameValue for BTreeMap<K, V> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|((ka, va), (kb, vb))| ka == kb && va.same_value(vb))
    }
}

impl<K: Ord> SameValue for BTreeSet<K> {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<K: Eq + Hash, V: SameValue, S: BuildHasher> SameValue for HashMap<K, V, S> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| v.same_value(o)))
    }
}

impl<K: Eq + Hash, S: BuildHasher> SameValue for HashSet<K, S> {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: SameValue + ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).same_value(other)
    }
}

impl<T: SameValue + ?Sized> SameValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).same_value(other)
    }
}

impl<A: SameValue, B: SameValue> SameValue for (A, B) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1)
    }
}

impl<A: SameValue, B: SameValue, C: SameValue> SameValue for (A, B, C) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1) && self.2.same_value(&other.2)
    }
}
