/*
 * Multilevel Feedback Queue Policy
 *
 * Priorities are computed, never configured:
 *
 *     priority = PRI_MAX - recent_cpu / 4 - 2 * nice      (clamped)
 *
 * `recent_cpu` grows by one for every tick a thread runs and decays once
 * a second by 2*load_avg / (2*load_avg + 1); `load_avg` itself is an
 * exponentially weighted average of the runnable-thread count. All three
 * run in 17.14 fixed point.
 *
 * Cadence, driven from the tick hook:
 * - every tick: bump the running thread's recent_cpu
 * - every second (first): refresh load_avg, then decay every recent_cpu
 * - every fourth tick: recompute all priorities, restore the ready
 *   queue's order, and preempt if the head now wins
 *
 * The idle thread is invisible to all of it.
 */

use alloc::collections::BTreeMap;

use super::SchedPolicy;
use crate::scheduler::SchedState;
use crate::scheduler::fixed_point::Fixed;
use crate::scheduler::sync::lock::LockId;
use crate::scheduler::thread::{self, Priority, ThreadId, ThreadState};
use crate::utils::timer::TIMER_FREQ;

/// Ticks between priority recomputations.
const LADDER_INTERVAL: u64 = 4;

pub struct MlfqsPolicy {
    load_avg: Fixed,
}

impl MlfqsPolicy {
    pub fn new() -> Self {
        Self {
            load_avg: Fixed::ZERO,
        }
    }
}

fn priority_for(recent_cpu: Fixed, nice: i32) -> Priority {
    let raw = Priority::MAX.0 - recent_cpu.div_int(4).trunc() - 2 * nice;
    Priority(raw.clamp(Priority::MIN.0, Priority::MAX.0))
}

impl SchedPolicy for MlfqsPolicy {
    fn name(&self) -> &'static str {
        "mlfqs"
    }

    fn on_spawn(&mut self, s: &mut SchedState, creator: ThreadId, spawned: ThreadId) {
        if Some(spawned) == s.idle {
            return;
        }
        // Children start where their creator stands on the ladder.
        let (nice, recent_cpu) = s
            .threads
            .get(creator)
            .map(|t| (t.nice, t.recent_cpu))
            .unwrap_or((0, Fixed::ZERO));
        let priority = priority_for(recent_cpu, nice);

        let t = s.threads.get_mut(spawned).expect("spawned thread missing");
        t.nice = nice;
        t.recent_cpu = recent_cpu;
        t.base_priority = priority;
        t.effective_priority = priority;
    }

    fn on_tick(&mut self, s: &mut SchedState, now: u64) -> bool {
        let me = thread::current();
        let idle = s.idle;

        if Some(me) != idle {
            let t = s.threads.get_mut(me).expect("current thread missing");
            t.recent_cpu = t.recent_cpu.add_int(1);
        }

        if now % TIMER_FREQ == 0 {
            // Load first; the decay of recent_cpu uses the fresh value.
            let running = if Some(me) != idle { 1 } else { 0 };
            let ready_count = (s.ready.len() + running) as i32;
            self.load_avg = self.load_avg.mul_int(59).div_int(60)
                + Fixed::from_int(ready_count).div_int(60);

            let twice_load = self.load_avg.mul_int(2);
            let decay = twice_load / twice_load.add_int(1);
            for tid in s.threads.ids() {
                if Some(tid) == idle {
                    continue;
                }
                let t = s.threads.get_mut(tid).expect("thread missing");
                t.recent_cpu = decay * t.recent_cpu + Fixed::from_int(t.nice);
            }
        }

        let mut preempt = false;
        if now % LADDER_INTERVAL == 0 {
            let mut priorities: BTreeMap<ThreadId, Priority> = BTreeMap::new();
            for tid in s.threads.ids() {
                if Some(tid) == idle {
                    continue;
                }
                let t = s.threads.get_mut(tid).expect("thread missing");
                let priority = priority_for(t.recent_cpu, t.nice);
                t.base_priority = priority;
                t.effective_priority = priority;
                priorities.insert(tid, priority);
            }
            s.ready
                .resort(|tid| priorities.get(&tid).copied().unwrap_or(Priority::MIN));

            let mine = s.effective(me);
            if s.ready.head_priority().map(|h| h > mine).unwrap_or(false) {
                preempt = true;
            }
        }

        preempt
    }

    fn on_set_priority(&mut self, _s: &mut SchedState, _tid: ThreadId, _base: Priority) -> bool {
        // Priorities are owned by the ladder; the request is ignored.
        false
    }

    fn on_set_nice(&mut self, s: &mut SchedState, tid: ThreadId, nice: i32) -> bool {
        let t = s.threads.get_mut(tid).expect("thread missing");
        t.nice = nice;
        let priority = priority_for(t.recent_cpu, nice);
        t.base_priority = priority;
        t.effective_priority = priority;

        if s.threads.get(tid).expect("thread missing").state == ThreadState::Ready {
            s.ready.reposition(tid, priority);
        }
        s.ready
            .head_priority()
            .map(|head| head > priority)
            .unwrap_or(false)
    }

    fn on_lock_wait(&mut self, _s: &mut SchedState, _waiter: ThreadId, _lock: LockId) {
        // Donation does not exist under this policy.
    }

    fn on_lock_release(&mut self, _s: &mut SchedState, _holder: ThreadId, _lock: LockId) {}

    fn load_avg(&self) -> Fixed {
        self.load_avg
    }
}
