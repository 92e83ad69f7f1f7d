//! Lock-free primitives shared by the render and task contexts.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Cache-line aligned atomic frame position.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct AtomicFrame {
    value: AtomicI64,
}

impl AtomicFrame {
    pub fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }
}

/// A state enum stored as a single byte.
pub trait StateRepr: Copy {
    fn to_u8(self) -> u8;
    fn from_u8(value: u8) -> Self;
}

/// Atomic cell holding a [`StateRepr`] enum.
///
/// Stores use `Release` and loads use `Acquire`, so every write made before a
/// transition is visible to the thread that observes the new state.
#[derive(Debug)]
pub struct AtomicState<S: StateRepr> {
    value: AtomicU8,
    _marker: PhantomData<S>,
}

impl<S: StateRepr> AtomicState<S> {
    pub fn new(state: S) -> Self {
        Self {
            value: AtomicU8::new(state.to_u8()),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn load(&self) -> S {
        S::from_u8(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, state: S) {
        self.value.store(state.to_u8(), Ordering::Release);
    }

    /// Moves from `current` to `new`, returning the observed state on failure.
    #[inline]
    pub fn transition(&self, current: S, new: S) -> Result<S, S> {
        self.value
            .compare_exchange(
                current.to_u8(),
                new.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(S::from_u8)
            .map_err(S::from_u8)
    }
}
