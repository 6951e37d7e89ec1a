//! Lock-free "who's searching what" table: lets a thread notice that another worker already
//! has the same position open a few plies down, so it can nudge its own reduction instead of
//! duplicating the exact same work.

use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};

const NUM_SLOTS: usize = 1024;

struct Slot {
    key: AtomicU64,
    owner: AtomicUsize,
    count: AtomicI32,
}

impl Slot {
    const fn empty() -> Self {
        Slot { key: AtomicU64::new(0), owner: AtomicUsize::new(usize::MAX), count: AtomicI32::new(0) }
    }
}

pub struct Breadcrumbs {
    slots: Vec<Slot>,
}

impl Breadcrumbs {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(NUM_SLOTS);
        slots.resize_with(NUM_SLOTS, Slot::empty);
        Breadcrumbs { slots }
    }

    fn slot(&self, key: u64) -> &Slot {
        &self.slots[(key as usize) % NUM_SLOTS]
    }

    /// Marks `key` as being searched by `thread_id`, returning a guard that clears the mark
    /// on drop and reports whether some *other* thread was already there. Only plies `< 8`
    /// are tracked; deeper plies return an inert guard that never marks anything.
    pub fn hold(&self, key: u64, thread_id: usize, ply: i32) -> ThreadHolding<'_> {
        if ply >= 8 {
            return ThreadHolding { slot: None, marked_by_other: false };
        }
        let slot = self.slot(key);
        let prev_key = slot.key.load(Ordering::Relaxed);
        let prev_owner = slot.owner.load(Ordering::Relaxed);
        let marked_by_other = prev_key == key && prev_owner != thread_id && slot.count.load(Ordering::Relaxed) > 0;

        slot.key.store(key, Ordering::Relaxed);
        slot.owner.store(thread_id, Ordering::Relaxed);
        slot.count.fetch_add(1, Ordering::Relaxed);

        ThreadHolding { slot: Some(slot), marked_by_other }
    }
}

impl Default for Breadcrumbs {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`Breadcrumbs::hold`]. `marked()` tells the caller whether another
/// thread was already sitting on this key when the guard was taken, the cue `negamax` uses to
/// add one ply of late-move reduction.
pub struct ThreadHolding<'a> {
    slot: Option<&'a Slot>,
    marked_by_other: bool,
}

impl ThreadHolding<'_> {
    pub fn marked(&self) -> bool {
        self.marked_by_other
    }
}

impl Drop for ThreadHolding<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            slot.count.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn second_thread_on_same_key_is_marked() {
        let table = Breadcrumbs::new();
        let _first = table.hold(42, 0, 0);
        let second = table.hold(42, 1, 0);
        assert!(second.marked());
    }

    #[test]
    fn single_thread_is_not_marked() {
        let table = Breadcrumbs::new();
        let guard = table.hold(7, 0, 0);
        assert!(!guard.marked());
    }

    #[test]
    fn mark_clears_after_guard_drops() {
        let table = Breadcrumbs::new();
        {
            let _first = table.hold(99, 0, 0);
        }
        let second = table.hold(99, 1, 0);
        assert!(!second.marked());
    }

    #[test]
    fn deep_ply_is_never_marked() {
        let table = Breadcrumbs::new();
        let _first = table.hold(13, 0, 10);
        let second = table.hold(13, 1, 10);
        assert!(!second.marked());
    }
}
