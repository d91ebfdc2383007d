use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Binary permit ensuring at most one frame is in flight.
///
/// The permit is held from binarization until the reduction results are on
/// the host, and released when it is dropped.
#[derive(Debug, Default)]
pub struct InFlightGate {
    slot: Mutex<()>,
}

/// Proof that the holder owns the pipeline until dropped.
#[derive(Debug)]
pub struct InFlightPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl InFlightGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the permit if it is free, without waiting.
    pub fn try_acquire(&self) -> Option<InFlightPermit<'_>> {
        match self.slot.try_lock() {
            Ok(guard) => Some(InFlightPermit { _guard: guard }),
            // A panicking holder has already released the permit.
            Err(TryLockError::Poisoned(poisoned)) => Some(InFlightPermit {
                _guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Wait until the permit is free.
    pub fn acquire(&self) -> InFlightPermit<'_> {
        InFlightPermit {
            _guard: self.slot.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}
