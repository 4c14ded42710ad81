/*
 * Alarm Suite
 *
 * Timed sleep: threads must wake no earlier than requested and in
 * wake-tick order, and non-positive durations must return immediately.
 */

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::vec::Vec;

use lazy_static::lazy_static;
use spin::Mutex;

use crate::arch::x86_64::interrupts;
use crate::memory::page;
use crate::scheduler::{self, Priority, Semaphore, ThreadId};
use crate::tests::{check, check_eq};
use crate::utils::timer;

lazy_static! {
    static ref WAKE_ORDER: Mutex<Vec<usize>> = Mutex::new(Vec::new());
    static ref SLEEPERS_DONE: Semaphore = Semaphore::new(0);
}

const SLEEPERS: usize = 5;

fn sleeper(i: usize) {
    // Distinct wake ticks, furthest wake for the highest index.
    timer::sleep(((i + 1) * 10) as i64);
    interrupts::without(|| WAKE_ORDER.lock().push(i));
    SLEEPERS_DONE.up();
}

fn sleep_duration() {
    let before = timer::ticks();
    timer::sleep(20);
    check(timer::elapsed(before) >= 20, "sleep(20) slept at least 20 ticks");
}

fn sleep_nonpositive() {
    let before = timer::ticks();
    timer::sleep(0);
    timer::sleep(-5);
    check(
        timer::elapsed(before) <= 1,
        "non-positive sleeps returned immediately"
    );
}

fn wake_order() {
    for i in 0..SLEEPERS {
        scheduler::spawn("sleeper", Priority::DEFAULT, sleeper, i)
            .expect("spawn sleeper");
    }
    for _ in 0..SLEEPERS {
        SLEEPERS_DONE.down();
    }
    let order = interrupts::without(|| WAKE_ORDER.lock().clone());
    check_eq(order, alloc::vec![0, 1, 2, 3, 4], "sleepers woke in wake-tick order");
}

fn subtick_conversions() {
    let before = timer::ticks();
    // 50 ms is 5 ticks at 100 Hz; 10 us rounds below one tick and only
    // yields.
    timer::msleep(50);
    check(timer::elapsed(before) >= 5, "msleep(50) slept at least 5 ticks");
    timer::usleep(10);
    timer::nsleep(100);
    check(true, "sub-tick sleeps returned");
}

lazy_static! {
    static ref SHORT_LIVED_DONE: Semaphore = Semaphore::new(0);
}

fn short_lived(_arg: usize) {
    SHORT_LIVED_DONE.up();
}

/// Dead threads give their pages back: the reap runs on the dispatch
/// after the one that switched away from them.
fn page_reclamation() {
    let baseline = page::pages_in_use();
    for _ in 0..5 {
        scheduler::spawn("short lived", Priority::DEFAULT, short_lived, 0)
            .expect("spawn short-lived thread");
    }
    for _ in 0..5 {
        SHORT_LIVED_DONE.down();
    }
    // A couple of ticks worth of dispatches drains the graveyard.
    timer::sleep(3);
    check_eq(page::pages_in_use(), baseline, "dead threads returned their pages");
}

static SWITCH_SEEN: AtomicBool = AtomicBool::new(false);

fn note_switch(_incoming: ThreadId) {
    SWITCH_SEEN.store(true, Ordering::SeqCst);
}

fn activation_hook_fires() {
    scheduler::set_address_space_hook(note_switch);
    timer::sleep(2);
    check(
        SWITCH_SEEN.load(Ordering::SeqCst),
        "context switches invoke the activation hook"
    );
}

pub fn run() {
    log::info!("-- alarm suite --");
    sleep_duration();
    sleep_nonpositive();
    wake_order();
    subtick_conversions();
    page_reclamation();
    activation_hook_fires();
}
