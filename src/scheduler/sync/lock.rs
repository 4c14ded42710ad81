/*
 * Lock (Mutex with Priority Donation)
 *
 * At most one holder; the holder must be the releaser; re-acquisition by
 * the holder is an error. Internally a binary semaphore whose wait set
 * shares the semaphore machinery.
 *
 * Under the donation policy, a contended acquire records the waiter as a
 * donor of the holder and propagates the waiter's priority along the
 * holder's own wait chain; release revokes exactly the donations that
 * this lock carried. The policy hooks keep all of that out of the lock
 * itself; under the feedback-queue policy they do nothing.
 */

use crate::arch::x86_64::interrupts;
use crate::scheduler::thread::{self, ThreadId};
use crate::scheduler::{self, WaitObj, with_state, with_state_and_policy};

use alloc::vec::Vec;

/// Registry key of a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LockId(pub usize);

/// Registry entry: holder plus the internal binary semaphore.
pub(crate) struct LockEntry {
    pub holder: Option<ThreadId>,
    /// 1 when the lock is free, 0 when held.
    pub value: u32,
    pub waiters: Vec<ThreadId>,
}

/// Handle to a registered lock.
pub struct Lock {
    id: LockId,
}

impl Lock {
    /// Register a lock, at rest: no holder, no waiters.
    pub fn new() -> Lock {
        let id = interrupts::without(|| {
            with_state(|s| {
                let id = s.alloc_lock_id();
                s.locks.insert(
                    id,
                    LockEntry {
                        holder: None,
                        value: 1,
                        waiters: Vec::new(),
                    },
                );
                id
            })
        });
        Lock { id }
    }

    pub(crate) fn id(&self) -> LockId {
        self.id
    }

    /// Acquire the lock, blocking while another thread holds it.
    pub fn acquire(&self) {
        assert!(
            !interrupts::in_interrupt(),
            "lock acquire in interrupt context"
        );
        let id = self.id;

        interrupts::without(|| {
            let me = thread::current();

            // Donation bookkeeping happens before the wait: the waiter
            // must be a donor of the holder for the whole time it is
            // blocked on this lock.
            with_state_and_policy(|s, pol| {
                let entry = s.locks.get_mut(&id).expect("lock missing");
                assert!(
                    entry.holder != Some(me),
                    "lock re-acquired by its holder"
                );
                if entry.holder.is_some() {
                    s.threads
                        .get_mut(me)
                        .expect("current thread missing")
                        .waiting_on = Some(id);
                    pol.on_lock_wait(s, me, id);
                }
            });

            // Down the internal binary semaphore.
            loop {
                let acquired = with_state(|s| {
                    let entry = s.locks.get_mut(&id).expect("lock missing");
                    if entry.value > 0 {
                        entry.value -= 1;
                        true
                    } else {
                        s.wait_insert(WaitObj::Lock(id), me);
                        false
                    }
                });
                if acquired {
                    break;
                }
                scheduler::trigger_switch();
            }

            // Ownership. The wait (if any) is over, so the donor handle
            // this thread lent to the old holder is already revoked.
            with_state(|s| {
                let t = s.threads.get_mut(me).expect("current thread missing");
                t.waiting_on = None;
                t.held_locks.push(id);
                let entry = s.locks.get_mut(&id).expect("lock missing");
                entry.holder = Some(me);
            });
        });
    }

    /// Acquire without blocking. No donation: nothing waited.
    pub fn try_acquire(&self) -> bool {
        let id = self.id;
        interrupts::without(|| {
            with_state(|s| {
                let me = thread::current();
                let entry = s.locks.get_mut(&id).expect("lock missing");
                assert!(
                    entry.holder != Some(me),
                    "lock re-acquired by its holder"
                );
                if entry.holder.is_none() && entry.value > 0 {
                    entry.value -= 1;
                    entry.holder = Some(me);
                    s.threads
                        .get_mut(me)
                        .expect("current thread missing")
                        .held_locks
                        .push(id);
                    true
                } else {
                    false
                }
            })
        })
    }

    /// Release the lock and wake the best waiter, yielding to it if it
    /// outranks the caller.
    pub fn release(&self) {
        let id = self.id;
        interrupts::without(|| {
            let me = thread::current();

            with_state_and_policy(|s, pol| {
                let entry = s.locks.get_mut(&id).expect("lock missing");
                assert!(
                    entry.holder == Some(me),
                    "lock released by a thread that does not hold it"
                );
                entry.holder = None;

                let t = s.threads.get_mut(me).expect("current thread missing");
                t.held_locks.retain(|&l| l != id);

                // Revoke the donations this lock carried and settle the
                // releaser's effective priority.
                pol.on_lock_release(s, me, id);

                let entry = s.locks.get_mut(&id).expect("lock missing");
                entry.value += 1;
            });

            let woken = with_state(|s| s.wake_best(WaitObj::Lock(id)));
            if let Some((_tid, priority)) = woken {
                scheduler::preempt_if_outranked(priority);
            }
        });
    }

    /// Whether the calling thread holds this lock.
    pub fn held_by_current(&self) -> bool {
        let id = self.id;
        interrupts::without(|| {
            with_state(|s| {
                s.locks.get(&id).expect("lock missing").holder == Some(thread::current())
            })
        })
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        interrupts::without(|| {
            with_state(|s| {
                let entry = s.locks.remove(&self.id).expect("lock missing");
                assert!(
                    entry.holder.is_none() && entry.waiters.is_empty(),
                    "lock destroyed while held or contended"
                );
            })
        });
    }
}
