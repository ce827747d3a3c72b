use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

/// Compare-and-swap on an `ArcSwap` slot, comparing against an owned `Arc`
/// witness. Returns the slot's prior value either way so callers can tell a
/// lost race from a won one without a second load.
pub(crate) fn cas_arc<T>(slot: &ArcSwap<T>, expected: &Arc<T>, new: Arc<T>) -> Result<(), Arc<T>> {
    let prev = Guard::into_inner(slot.compare_and_swap(expected, new));
    if Arc::ptr_eq(&prev, expected) {
        Ok(())
    } else {
        Err(prev)
    }
}

/// Same as [`cas_arc`], but the expected value is a raw pointer rather than
/// an owned `Arc`. Used to CAS against a [`Weak`](std::sync::Weak)-held mark
/// target without ever upgrading it to a strong reference (see
/// `descriptor::Mark`).
pub(crate) fn cas_arc_ptr<T>(slot: &ArcSwap<T>, expected_ptr: *const T, new: Arc<T>) -> Result<(), Arc<T>> {
    let prev = Guard::into_inner(slot.compare_and_swap(expected_ptr, new));
    if Arc::as_ptr(&prev) == expected_ptr {
        Ok(())
    } else {
        Err(prev)
    }
}
