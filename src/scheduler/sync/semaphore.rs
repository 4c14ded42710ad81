/*
 * Counting Semaphore
 *
 * A non-negative counter with a wait set. `down` blocks while the value
 * is zero; `up` increments and wakes the highest-priority waiter.
 * Semaphore state lives in a registry inside the scheduler, keyed by id;
 * the `Semaphore` type is a handle whose drop retires the entry.
 *
 * Waiters are filed by effective priority at `down` time and re-ordered
 * by their priorities as of `up` time; a donation may have promoted a
 * waiter after it blocked.
 */

use crate::arch::x86_64::interrupts;
use crate::scheduler::thread::{self, ThreadId};
use crate::scheduler::{self, WaitObj, with_state};

use alloc::vec::Vec;

/// Registry key of a semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SemaId(pub usize);

/// Registry entry: the counter and its wait set.
pub(crate) struct SemaEntry {
    pub value: u32,
    pub waiters: Vec<ThreadId>,
}

/// Handle to a registered semaphore.
pub struct Semaphore {
    id: SemaId,
}

impl Semaphore {
    /// Register a semaphore with the given initial value.
    pub fn new(value: u32) -> Semaphore {
        let id = interrupts::without(|| {
            with_state(|s| {
                let id = s.alloc_sema_id();
                s.semas.insert(
                    id,
                    SemaEntry {
                        value,
                        waiters: Vec::new(),
                    },
                );
                id
            })
        });
        Semaphore { id }
    }

    pub(crate) fn id(&self) -> SemaId {
        self.id
    }

    /// The id as a plain integer, for handing to a thread entry argument.
    pub(crate) fn raw_id(&self) -> usize {
        self.id.0
    }

    /// Decrement the value, blocking while it is zero.
    pub fn down(&self) {
        down_id(self.id);
    }

    /// Decrement the value if it is positive; never blocks.
    pub fn try_down(&self) -> bool {
        try_down_id(self.id)
    }

    /// Increment the value and wake the best waiter, yielding to it if it
    /// outranks the caller.
    pub fn up(&self) {
        up_id(self.id);
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        interrupts::without(|| {
            with_state(|s| {
                let entry = s.semas.remove(&self.id).expect("semaphore missing");
                assert!(
                    entry.waiters.is_empty(),
                    "semaphore destroyed while threads wait on it"
                );
            })
        });
    }
}

pub(crate) fn down_id(id: SemaId) {
    assert!(
        !interrupts::in_interrupt(),
        "semaphore down in interrupt context"
    );
    interrupts::without(|| loop {
        let acquired = with_state(|s| {
            let entry = s.semas.get_mut(&id).expect("semaphore missing");
            if entry.value > 0 {
                entry.value -= 1;
                true
            } else {
                let me = thread::current();
                s.wait_insert(WaitObj::Sema(id), me);
                false
            }
        });
        if acquired {
            return;
        }
        // Blocked; switch away. On wake, loop and contend again; another
        // thread may have taken the value first (Mesa semantics).
        scheduler::trigger_switch();
    });
}

pub(crate) fn try_down_id(id: SemaId) -> bool {
    interrupts::without(|| {
        with_state(|s| {
            let entry = s.semas.get_mut(&id).expect("semaphore missing");
            if entry.value > 0 {
                entry.value -= 1;
                true
            } else {
                false
            }
        })
    })
}

pub(crate) fn up_id(id: SemaId) {
    interrupts::without(|| {
        let woken = with_state(|s| {
            let entry = s.semas.get_mut(&id).expect("semaphore missing");
            entry.value += 1;
            s.wake_best(WaitObj::Sema(id))
        });
        if let Some((_tid, priority)) = woken {
            scheduler::preempt_if_outranked(priority);
        }
    });
}

/// `up` by raw id; for code that carries the id through a `usize`
/// (thread entry arguments).
pub(crate) fn up_raw(raw: usize) {
    up_id(SemaId(raw));
}
