#![forbid(unsafe_code)]

//! Generation-checked handles.
//!
//! A [`Handle`] is a Copy capability `{slot index, generation id, valid
//! flag}` handed out by a [`SlotTable`](crate::registry::SlotTable) instead
//! of a reference into registry storage. The generation id is what makes a
//! stale handle detectable after its slot has been recycled: every issue
//! takes a fresh id from the table's counter, and freeing a slot zeroes the
//! slot's id.
//!
//! Handles are typed by a zero-sized kind marker so a sink handle can never
//! be passed where a statusbar handle is expected:
//!
//! ```
//! use sblog_core::handle::{Handle, SinkKind};
//!
//! let h: Handle<SinkKind> = Handle::default();
//! assert!(!h.is_valid());
//! assert_eq!(h.generation(), 0);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use thiserror::Error;

/// Generation id reserved for "never issued".
pub const UNISSUED: u32 = 0;

/// Marker for handles that name a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {}

/// Marker for handles that name a statusbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusbarKind {}

/// Human-readable name of a handle kind, used in diagnostics.
pub trait HandleKind: 'static {
    const NAME: &'static str;
}

impl HandleKind for SinkKind {
    const NAME: &'static str = "sink";
}

impl HandleKind for StatusbarKind {
    const NAME: &'static str = "statusbar";
}

/// Handle to a sink slot.
pub type SinkHandle = Handle<SinkKind>;

/// Handle to a statusbar slot.
pub type StatusbarHandle = Handle<StatusbarKind>;

/// A Copy capability naming one registry slot at one generation.
pub struct Handle<K> {
    index: usize,
    generation: u32,
    valid: bool,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    /// Build a handle from raw parts. The result claims to be valid; the
    /// registry decides whether it actually is.
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(index: usize, generation: u32) -> Self {
        Self {
            index,
            generation,
            valid: true,
            _kind: PhantomData,
        }
    }

    /// Slot index in the owning registry.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Generation id this handle was issued with (0 if never issued).
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Local validity flag. `false` after destroy, without consulting the
    /// registry; `true` does not imply the registry still agrees.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Mark this handle as no longer usable. Index and generation are kept
    /// for diagnostics.
    #[inline]
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// True if both handles name the same slot at the same generation.
    #[inline]
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self {
            index: usize::MAX,
            generation: UNISSUED,
            valid: false,
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.generation == other.generation
            && self.valid == other.valid
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
        self.valid.hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::NAME)
            .field("index", &self.index)
            .field("generation", &self.generation)
            .field("valid", &self.valid)
            .finish()
    }
}

impl<K: HandleKind> fmt::Display for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == usize::MAX {
            write!(f, "{}:unissued", K::NAME)
        } else {
            write!(f, "{}:{}#{}", K::NAME, self.index, self.generation)
        }
    }
}

/// Why a handle failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The handle's own validity flag is false (destroyed or never issued).
    #[error("handle is marked invalid")]
    InvalidFlag,

    /// The slot index does not exist in the registry.
    #[error("handle index {index} out of bounds (registry holds {len} slots)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The handle carries the reserved generation id 0.
    #[error("handle generation id is 0")]
    ZeroId,

    /// The slot has been recycled since this handle was issued.
    #[error("handle generation {handle} does not match slot generation {slot}")]
    IdMismatch { handle: u32, slot: u32 },
}

impl HandleError {
    /// Legacy numeric status code (-1 … -4) for this failure.
    #[inline]
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidFlag => -1,
            Self::IndexOutOfBounds { .. } => -2,
            Self::IdMismatch { .. } => -3,
            Self::ZeroId => -4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_is_unissued() {
        let h = StatusbarHandle::default();
        assert!(!h.is_valid());
        assert_eq!(h.generation(), UNISSUED);
        assert_eq!(h.to_string(), "statusbar:unissued");
    }

    #[test]
    fn from_raw_parts_claims_validity() {
        let h = SinkHandle::from_raw_parts(3, 9);
        assert!(h.is_valid());
        assert_eq!(h.index(), 3);
        assert_eq!(h.generation(), 9);
        assert_eq!(h.to_string(), "sink:3#9");
    }

    #[test]
    fn invalidate_keeps_index() {
        let mut h = SinkHandle::from_raw_parts(2, 5);
        h.invalidate();
        assert!(!h.is_valid());
        assert_eq!(h.index(), 2);
        assert_eq!(h.generation(), 5);
    }

    #[test]
    fn copies_compare_equal() {
        let a = SinkHandle::from_raw_parts(1, 1);
        let b = a;
        assert_eq!(a, b);
        assert!(a.same_slot(&b));

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn same_slot_ignores_flag() {
        let a = SinkHandle::from_raw_parts(4, 7);
        let mut b = a;
        b.valid = false;
        assert_ne!(a, b);
        assert!(a.same_slot(&b));
    }

    #[test]
    fn debug_names_kind() {
        let h = StatusbarHandle::from_raw_parts(0, 1);
        let debug = format!("{h:?}");
        assert!(debug.contains("statusbar"));
        assert!(debug.contains("generation: 1"));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(HandleError::InvalidFlag.code(), -1);
        assert_eq!(HandleError::IndexOutOfBounds { index: 1, len: 0 }.code(), -2);
        assert_eq!(HandleError::IdMismatch { handle: 1, slot: 2 }.code(), -3);
        assert_eq!(HandleError::ZeroId.code(), -4);
    }

    #[test]
    fn error_messages_carry_context() {
        let err = HandleError::IndexOutOfBounds { index: 7, len: 2 };
        assert!(err.to_string().contains('7'));
        let err = HandleError::IdMismatch { handle: 3, slot: 4 };
        assert!(err.to_string().contains("does not match"));
    }
}
