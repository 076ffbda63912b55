#![forbid(unsafe_code)]

//! Slot tables with LIFO slot reuse and generation-checked access.
//!
//! [`SlotTable`] is plain data: it does no locking of its own. Runtime
//! registries wrap it in a mutex and pair it with a [`GenerationCounter`],
//! which carries its own lock so the acquisition order stays
//! registry lock → id-counter lock.
//!
//! ```
//! use sblog_core::handle::{Handle, SinkKind};
//! use sblog_core::registry::{GenerationCounter, SlotTable};
//!
//! let ids = GenerationCounter::new();
//! let mut table: SlotTable<&str> = SlotTable::new(4);
//!
//! let mut h: Handle<SinkKind> = table.insert(&ids, "stdout").unwrap();
//! assert_eq!(table.get(&h), Ok(&"stdout"));
//!
//! table.remove(&mut h).unwrap();
//! assert!(!h.is_valid());
//! assert_eq!(table.live(), 0);
//! ```

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::handle::{Handle, HandleError, HandleKind, UNISSUED};

/// Returned when a table already holds its maximum number of live slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("registry is full ({capacity} live slots)")]
pub struct RegistryFull {
    pub capacity: usize,
}

/// Monotonic generation-id source.
///
/// Ids start at 1, wrap from `u32::MAX` back to 1 and never yield 0.
#[derive(Debug)]
pub struct GenerationCounter {
    last: Mutex<u32>,
}

impl GenerationCounter {
    /// Counter whose first id is 1.
    pub const fn new() -> Self {
        Self::starting_after(UNISSUED)
    }

    /// Counter whose next id follows `last`.
    pub const fn starting_after(last: u32) -> Self {
        Self {
            last: Mutex::new(last),
        }
    }

    /// Issue the next id.
    pub fn next(&self) -> u32 {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let (next, wrapped) = match last.checked_add(1) {
            Some(next) => (next, false),
            None => (1, true),
        };
        if wrapped {
            tracing::warn!("generation ids exhausted, wrapping back to 1");
        }
        *last = next;
        next
    }

    /// The most recently issued id (0 before the first issue).
    pub fn last(&self) -> u32 {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of slots addressed by [`Handle`]s.
#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    capacity: usize,
}

impl<T> SlotTable<T> {
    /// Empty table allowing at most `capacity` live slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
        }
    }

    /// Number of slots ever allocated (live and free).
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no slot was ever allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Maximum number of live slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when another insert would exceed capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.live() >= self.capacity
    }

    /// Check `handle` against this table.
    ///
    /// Order of checks: validity flag, index bounds, zero id, generation
    /// match. The zero-id check comes before the generation comparison so
    /// that a forged handle carrying id 0 against a freed slot (whose id is
    /// also 0) is still rejected.
    pub fn validate<K>(&self, handle: &Handle<K>) -> Result<(), HandleError> {
        if !handle.is_valid() {
            return Err(HandleError::InvalidFlag);
        }
        let index = handle.index();
        let Some(slot) = self.slots.get(index) else {
            return Err(HandleError::IndexOutOfBounds {
                index,
                len: self.slots.len(),
            });
        };
        if handle.generation() == UNISSUED {
            return Err(HandleError::ZeroId);
        }
        if handle.generation() != slot.generation {
            return Err(HandleError::IdMismatch {
                handle: handle.generation(),
                slot: slot.generation,
            });
        }
        Ok(())
    }

    /// [`validate`](Self::validate), plus one warning per failure case.
    pub fn validate_verbose<K: HandleKind>(&self, handle: &Handle<K>) -> Result<(), HandleError> {
        let result = self.validate(handle);
        if let Err(err) = &result {
            match err {
                HandleError::InvalidFlag => tracing::warn!(
                    kind = K::NAME,
                    index = handle.index(),
                    generation = handle.generation(),
                    "invalid handle: validity flag is false"
                ),
                HandleError::IndexOutOfBounds { index, len } => tracing::warn!(
                    kind = K::NAME,
                    index,
                    len,
                    "invalid handle: index out of bounds"
                ),
                HandleError::ZeroId => tracing::warn!(
                    kind = K::NAME,
                    index = handle.index(),
                    "invalid handle: generation id is 0"
                ),
                HandleError::IdMismatch { handle: ours, slot } => tracing::warn!(
                    kind = K::NAME,
                    index = handle.index(),
                    handle_generation = ours,
                    slot_generation = slot,
                    "invalid handle: generation mismatch"
                ),
            }
        }
        result
    }

    /// Store `value` in the most recently freed slot, or a new one, and
    /// issue a handle for it with a fresh id from `ids`.
    pub fn insert<K: HandleKind>(
        &mut self,
        ids: &GenerationCounter,
        value: T,
    ) -> Result<Handle<K>, RegistryFull> {
        if self.is_full() {
            return Err(RegistryFull {
                capacity: self.capacity,
            });
        }
        let generation = ids.next();
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation = generation;
                slot.value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation,
                    value: Some(value),
                });
                self.slots.len() - 1
            }
        };
        tracing::debug!(kind = K::NAME, index, generation, "issued handle");
        Ok(Handle::from_raw_parts(index, generation))
    }

    /// Shared access to the value behind `handle`.
    pub fn get<K>(&self, handle: &Handle<K>) -> Result<&T, HandleError> {
        self.validate(handle)?;
        self.slots[handle.index()]
            .value
            .as_ref()
            .ok_or(HandleError::ZeroId)
    }

    /// Exclusive access to the value behind `handle`.
    pub fn get_mut<K>(&mut self, handle: &Handle<K>) -> Result<&mut T, HandleError> {
        self.validate(handle)?;
        self.slots[handle.index()]
            .value
            .as_mut()
            .ok_or(HandleError::ZeroId)
    }

    /// Take the value out, zero the slot id, push the slot on the free
    /// list and invalidate the caller's handle.
    pub fn remove<K: HandleKind>(&mut self, handle: &mut Handle<K>) -> Result<T, HandleError> {
        self.validate(handle)?;
        let index = handle.index();
        let slot = &mut self.slots[index];
        let value = slot.value.take().ok_or(HandleError::ZeroId)?;
        slot.generation = UNISSUED;
        self.free.push(index);
        tracing::debug!(
            kind = K::NAME,
            index,
            generation = handle.generation(),
            "recycled handle"
        );
        handle.invalidate();
        Ok(value)
    }

    /// Live values with their slot index and generation, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.value.as_ref().map(|v| (index, slot.generation, v)))
    }

    /// Mutable variant of [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.value.as_mut().map(|v| (index, generation, v))
            })
    }
}
