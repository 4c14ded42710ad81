/*
 * Scheduling Policies
 *
 * The dispatcher is pure mechanism; everything that decides *what a
 * priority is* lives behind this trait. Two implementations exist and
 * exactly one is constructed, at boot:
 *
 * - `DonationPolicy` (default): static priorities, raised transitively by
 *   waiters of the locks a thread holds.
 * - `MlfqsPolicy` (`mlfqs` build feature): priorities recomputed from
 *   decayed CPU usage and niceness; donation does not exist.
 *
 * Keeping the policies behind one constructor means no donation branch is
 * reachable in a feedback-queue kernel and vice versa.
 */

pub mod donation;
pub mod mlfqs;

pub use donation::MAX_DONATION_DEPTH;

use alloc::boxed::Box;

use super::fixed_point::Fixed;
use super::sync::lock::LockId;
use super::thread::{Priority, ThreadId};
use super::SchedState;

/// Hooks the mechanism calls into the active policy.
///
/// Hooks returning `bool` report whether the running thread should give
/// up the CPU as a consequence (the caller performs the switch; from the
/// tick path it becomes a yield-on-return).
pub trait SchedPolicy: Send {
    fn name(&self) -> &'static str;

    /// A thread was created and registered but is not yet ready.
    fn on_spawn(&mut self, s: &mut SchedState, creator: ThreadId, spawned: ThreadId);

    /// One timer tick elapsed; `now` is the new tick count.
    fn on_tick(&mut self, s: &mut SchedState, now: u64) -> bool;

    /// The thread asked to change its base priority.
    fn on_set_priority(&mut self, s: &mut SchedState, tid: ThreadId, base: Priority) -> bool;

    /// The thread asked to change its niceness.
    fn on_set_nice(&mut self, s: &mut SchedState, tid: ThreadId, nice: i32) -> bool;

    /// `waiter` is about to block on `lock`, which has a holder.
    fn on_lock_wait(&mut self, s: &mut SchedState, waiter: ThreadId, lock: LockId);

    /// `holder` released `lock`; called after the holder gave it up, before
    /// any waiter wakes.
    fn on_lock_release(&mut self, s: &mut SchedState, holder: ThreadId, lock: LockId);

    /// System load average; zero unless the policy computes one.
    fn load_avg(&self) -> Fixed {
        Fixed::ZERO
    }
}

/// Construct the policy this kernel was built to run.
pub fn boot_policy() -> Box<dyn SchedPolicy> {
    #[cfg(feature = "mlfqs")]
    {
        Box::new(mlfqs::MlfqsPolicy::new())
    }
    #[cfg(not(feature = "mlfqs"))]
    {
        Box::new(donation::DonationPolicy::new())
    }
}
