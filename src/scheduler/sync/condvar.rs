/*
 * Condition Variable (Mesa-Style)
 *
 * Each waiter parks on its own private binary semaphore; the condition
 * variable is a list of those semaphores, tagged with the waiter's
 * effective priority at wait time. `signal` re-sorts by tag and releases
 * the best one.
 *
 * The tag is a snapshot: a donation received after the thread began
 * waiting does not move it forward in the signal order. The waiter is
 * blocked and cannot refresh its own tag, and the signaller has no
 * donation edge to it. The snapshot is the deliberate trade.
 *
 * Mesa semantics: a signalled waiter re-acquires the lock and must
 * re-check its condition before trusting it.
 */

use spin::Mutex;

use crate::arch::x86_64::interrupts;
use crate::scheduler::thread::Priority;
use crate::scheduler::{self, Lock, Semaphore};
use crate::scheduler::sync::semaphore::{self, SemaId};

use alloc::vec::Vec;

struct Waiter {
    /// Effective priority of the waiting thread when it called `wait`.
    tag: Priority,
    sema: SemaId,
}

/// A condition variable. Pairs with a `Lock` that guards the condition.
pub struct Condvar {
    waiters: Mutex<Vec<Waiter>>,
}

impl Condvar {
    pub const fn new() -> Condvar {
        Condvar {
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Atomically release `lock` and wait for a signal; re-acquires
    /// `lock` before returning. The caller must hold `lock` and must
    /// re-check the condition afterwards.
    pub fn wait(&self, lock: &Lock) {
        assert!(
            !interrupts::in_interrupt(),
            "condition wait in interrupt context"
        );
        assert!(
            lock.held_by_current(),
            "condition wait without holding the lock"
        );

        let private = Semaphore::new(0);
        let tag = scheduler::get_priority();

        interrupts::without(|| {
            let mut q = self.waiters.lock();
            let pos = q.iter().position(|w| w.tag < tag).unwrap_or(q.len());
            q.insert(
                pos,
                Waiter {
                    tag,
                    sema: private.id(),
                },
            );
        });

        lock.release();
        private.down();
        lock.acquire();
        // `private` retires here; the signaller popped its entry before
        // the up, so nothing references it anymore.
    }

    /// Wake the waiter with the highest tag, if any. The caller must
    /// hold `lock`.
    pub fn signal(&self, lock: &Lock) {
        assert!(
            lock.held_by_current(),
            "condition signal without holding the lock"
        );
        if let Some(sema) = self.pop_best() {
            semaphore::up_id(sema);
        }
    }

    /// Wake every waiter. The caller must hold `lock`.
    pub fn broadcast(&self, lock: &Lock) {
        assert!(
            lock.held_by_current(),
            "condition broadcast without holding the lock"
        );
        while let Some(sema) = self.pop_best() {
            semaphore::up_id(sema);
        }
    }

    /// Detach the best waiter's semaphore. The up happens outside the
    /// list lock so the woken thread can re-enter `wait` freely.
    fn pop_best(&self) -> Option<SemaId> {
        interrupts::without(|| {
            let mut q = self.waiters.lock();
            if q.is_empty() {
                return None;
            }
            // Tags are wait-time snapshots; the stable sort keeps arrival
            // order among equals.
            q.sort_by(|a, b| b.tag.cmp(&a.tag));
            Some(q.remove(0).sema)
        })
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
