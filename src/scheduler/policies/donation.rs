/*
 * Priority Donation Policy
 *
 * Static priorities with donation. A thread's effective priority is the
 * maximum of its base priority and the effective priorities of its
 * donors, the threads blocked on locks it holds. Donations propagate
 * along the waits-on/holds chain so that a high-priority waiter lifts
 * every holder standing between it and the CPU.
 *
 * The walk is bounded by `MAX_DONATION_DEPTH`. The bound caps the time
 * spent inside an interrupt-disabled region and cuts any accidental
 * cycle; lock ownership rules make real cycles impossible, the bound is
 * the safety net.
 */

use super::SchedPolicy;
use crate::scheduler::SchedState;
use crate::scheduler::sync::lock::LockId;
use crate::scheduler::thread::{Priority, ThreadId, ThreadState};

/// Maximum number of waits-on/holds edges one donation traverses.
pub const MAX_DONATION_DEPTH: usize = 8;

pub struct DonationPolicy;

impl DonationPolicy {
    pub fn new() -> Self {
        DonationPolicy
    }
}

/// Re-derive `tid`'s effective priority from its base and donors, store
/// it, and return it. With no donors this settles back to the base.
fn recompute_effective(s: &mut SchedState, tid: ThreadId) -> Priority {
    let (base, donor_max) = {
        let t = s.threads.get(tid).expect("thread missing");
        let mut max: Option<Priority> = None;
        for &d in &t.donors {
            let e = s.effective(d);
            if max.map(|m| e > m).unwrap_or(true) {
                max = Some(e);
            }
        }
        (t.base_priority, max)
    };
    let effective = match donor_max {
        Some(m) if m > base => m,
        _ => base,
    };
    s.threads
        .get_mut(tid)
        .expect("thread missing")
        .effective_priority = effective;
    effective
}

/// File `donor` in `holder`'s donor list, ordered by the donor's
/// effective priority. A donor already present is re-filed; that is how
/// a priority raise mid-chain restores the ordering.
fn insert_donor(s: &mut SchedState, holder: ThreadId, donor: ThreadId) {
    let priority = s.effective(donor);
    let mut donors = core::mem::take(
        &mut s.threads.get_mut(holder).expect("holder missing").donors,
    );
    donors.retain(|&d| d != donor);
    let pos = donors
        .iter()
        .position(|&d| s.effective(d) < priority)
        .unwrap_or(donors.len());
    donors.insert(pos, donor);
    s.threads.get_mut(holder).expect("holder missing").donors = donors;
}

impl SchedPolicy for DonationPolicy {
    fn name(&self) -> &'static str {
        "priority donation"
    }

    fn on_spawn(&mut self, _s: &mut SchedState, _creator: ThreadId, _spawned: ThreadId) {
        // A fresh thread has no donors; effective equals base already.
    }

    fn on_tick(&mut self, _s: &mut SchedState, _now: u64) -> bool {
        // Slice accounting is the mechanism's job; donation has no
        // per-tick state.
        false
    }

    fn on_set_priority(&mut self, s: &mut SchedState, tid: ThreadId, base: Priority) -> bool {
        s.threads
            .get_mut(tid)
            .expect("thread missing")
            .base_priority = base;
        let effective = recompute_effective(s, tid);
        if s.threads.get(tid).expect("thread missing").state == ThreadState::Ready {
            s.ready.reposition(tid, effective);
        }
        // The caller is the running thread; hand over the CPU if lowering
        // itself uncovered a better candidate.
        s.ready
            .head_priority()
            .map(|head| head > effective)
            .unwrap_or(false)
    }

    fn on_set_nice(&mut self, s: &mut SchedState, tid: ThreadId, nice: i32) -> bool {
        // Recorded but inert under this policy.
        s.threads.get_mut(tid).expect("thread missing").nice = nice;
        false
    }

    fn on_lock_wait(&mut self, s: &mut SchedState, waiter: ThreadId, lock: LockId) {
        let mut donor = waiter;
        let mut lock = lock;

        for _ in 0..MAX_DONATION_DEPTH {
            let holder = match s.locks.get(&lock).and_then(|e| e.holder) {
                Some(h) => h,
                None => break,
            };
            if holder == donor {
                break;
            }

            insert_donor(s, holder, donor);
            let effective = recompute_effective(s, holder);

            if s.threads.get(holder).expect("holder missing").state == ThreadState::Ready {
                s.ready.reposition(holder, effective);
            }

            // Follow the chain: the holder may itself be stuck on a lock
            // someone else holds.
            match s.threads.get(holder).expect("holder missing").waiting_on {
                Some(next_lock)
                    if s.locks.get(&next_lock).and_then(|e| e.holder) != Some(holder) =>
                {
                    donor = holder;
                    lock = next_lock;
                }
                _ => break,
            }
        }
    }

    fn on_lock_release(&mut self, s: &mut SchedState, holder: ThreadId, lock: LockId) {
        // Selective revocation: only the donors whose wait this lock
        // caused leave. Donations earned through other held locks stay.
        let mut donors = core::mem::take(
            &mut s.threads.get_mut(holder).expect("holder missing").donors,
        );
        donors.retain(|&d| {
            s.threads.get(d).and_then(|t| t.waiting_on) != Some(lock)
        });
        s.threads.get_mut(holder).expect("holder missing").donors = donors;

        recompute_effective(s, holder);
    }
}
