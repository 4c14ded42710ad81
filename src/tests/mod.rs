/*
 * In-Kernel Test Suites
 *
 * Scenario tests for the scheduler core, run once at boot after the
 * scheduler is live. Each suite spawns real threads and coordinates
 * through statics; checks report through the log and a pair of global
 * counters, and the runner prints a summary at the end.
 *
 * The donation suites only exist in the default build; the feedback-queue
 * suite only under the `mlfqs` feature. The alarm suite is policy-
 * agnostic and runs in both.
 */

use core::sync::atomic::{AtomicUsize, Ordering};

pub mod alarm;
#[cfg(not(feature = "mlfqs"))]
pub mod donation;
#[cfg(not(feature = "mlfqs"))]
pub mod priority;

static PASSED: AtomicUsize = AtomicUsize::new(0);
static FAILED: AtomicUsize = AtomicUsize::new(0);

/// Record one check.
pub(crate) fn check(cond: bool, what: &str) {
    if cond {
        PASSED.fetch_add(1, Ordering::SeqCst);
        log::info!("  ok: {}", what);
    } else {
        FAILED.fetch_add(1, Ordering::SeqCst);
        log::error!("  FAIL: {}", what);
    }
}

/// Record one check of an observed value against an expectation.
pub(crate) fn check_eq<T: PartialEq + core::fmt::Debug>(got: T, want: T, what: &str) {
    if got == want {
        PASSED.fetch_add(1, Ordering::SeqCst);
        log::info!("  ok: {} ({:?})", what, got);
    } else {
        FAILED.fetch_add(1, Ordering::SeqCst);
        log::error!("  FAIL: {} (got {:?}, want {:?})", what, got, want);
    }
}

/// Run every suite applicable to the built policy and print a summary.
pub fn run_all() {
    log::info!("== kernel self-tests ==");

    alarm::run();
    #[cfg(not(feature = "mlfqs"))]
    {
        priority::run();
        donation::run();
    }
    #[cfg(feature = "mlfqs")]
    mlfqs::run();

    let passed = PASSED.load(Ordering::SeqCst);
    let failed = FAILED.load(Ordering::SeqCst);
    if failed == 0 {
        log::info!("== all {} checks passed ==", passed);
    } else {
        log::error!("== {} of {} checks FAILED ==", failed, passed + failed);
    }
}
