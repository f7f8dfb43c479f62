use std::sync::{Mutex, MutexGuard};

/// Lock ignoring poisoning.
///
/// None of the guarded values can be left half updated by a panic, they are
/// all replaced whole.
pub(crate) fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
