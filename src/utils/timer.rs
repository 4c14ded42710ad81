/*
 * Tick Clock and Sleep API
 *
 * Owns the monotonic tick counter and the public timed-sleep interface.
 * The counter advances once per timer interrupt; the set of sleeping
 * threads lives in the scheduler state and is walked on the same tick.
 *
 * A thread that sleeps for n ticks becomes ready no earlier than n ticks
 * later; when it runs again depends on its priority.
 */

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::x86_64::interrupts;
use crate::scheduler;

/// Timer interrupts per second.
pub const TIMER_FREQ: u64 = 100;

// The PIT cannot divide below ~19 Hz, and above 1000 Hz the tick overhead
// swamps the workload.
const _: () = assert!(TIMER_FREQ >= 19 && TIMER_FREQ <= 1000);

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Ticks since boot.
pub fn ticks() -> u64 {
    TICKS.load(Ordering::SeqCst)
}

/// Ticks elapsed since `then` (a value previously returned by `ticks`).
pub fn elapsed(then: u64) -> u64 {
    ticks().saturating_sub(then)
}

/// Advance the clock by one tick. Called only from the timer interrupt.
pub(crate) fn advance() -> u64 {
    TICKS.fetch_add(1, Ordering::SeqCst) + 1
}

/// Suspend the calling thread for at least `t` ticks.
///
/// Non-positive durations return immediately.
pub fn sleep(t: i64) {
    if t <= 0 {
        return;
    }
    assert!(
        interrupts::enabled(),
        "timer sleep called with interrupts disabled"
    );
    let wake = ticks() + t as u64;
    scheduler::sleep_until(wake);
}

/// Suspend the calling thread for at least `ms` milliseconds.
pub fn msleep(ms: i64) {
    real_time_sleep(ms, 1000);
}

/// Suspend the calling thread for at least `us` microseconds.
pub fn usleep(us: i64) {
    real_time_sleep(us, 1_000_000);
}

/// Suspend the calling thread for at least `ns` nanoseconds.
pub fn nsleep(ns: i64) {
    real_time_sleep(ns, 1_000_000_000);
}

/// Sleep for `num / denom` seconds, converted to ticks.
///
/// Intervals shorter than one tick degrade to a single yield; the clock
/// cannot resolve them.
fn real_time_sleep(num: i64, denom: i64) {
    let t = num.saturating_mul(TIMER_FREQ as i64) / denom;
    if t > 0 {
        sleep(t);
    } else if num > 0 {
        scheduler::yield_now();
    }
}

/// Log the tick accounting split and the context-switch count.
pub fn print_stats() {
    let stats = scheduler::stats();
    log::info!(
        "{} ticks total: {} kernel, {} idle; {} context switches",
        ticks(),
        stats.kernel_ticks,
        stats.idle_ticks,
        stats.context_switches
    );
}
