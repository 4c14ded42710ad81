/*
 * Priority Suite
 *
 * Strict priority scheduling without donation in the picture: preemption
 * on creation, yielding on a self-demotion, round-robin among equals,
 * and priority-ordered wake-ups from semaphores and condition variables.
 */

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::vec::Vec;

use lazy_static::lazy_static;
use spin::Mutex;

use crate::arch::x86_64::interrupts;
use crate::scheduler::{self, Condvar, Lock, Priority, Semaphore};
use crate::tests::{check, check_eq};
use crate::utils::timer;

fn push_order(list: &Mutex<Vec<usize>>, value: usize) {
    interrupts::without(|| list.lock().push(value));
}

// --- preemption on spawn ---------------------------------------------------

static SPAWN_MARK: AtomicBool = AtomicBool::new(false);

fn marker(_arg: usize) {
    SPAWN_MARK.store(true, Ordering::SeqCst);
}

fn preempt_on_spawn() {
    scheduler::spawn("marker", Priority(40), marker, 0).expect("spawn marker");
    check(
        SPAWN_MARK.load(Ordering::SeqCst),
        "higher-priority thread ran before spawn returned"
    );
}

// --- yielding on a self-demotion -------------------------------------------

static DEMOTE_MARK: AtomicBool = AtomicBool::new(false);

fn demote_observer(_arg: usize) {
    DEMOTE_MARK.store(true, Ordering::SeqCst);
}

fn yield_on_demotion() {
    scheduler::set_priority(Priority(40));
    scheduler::spawn("observer", Priority(35), demote_observer, 0).expect("spawn observer");
    check(
        !DEMOTE_MARK.load(Ordering::SeqCst),
        "lower-priority thread did not run while outranked"
    );
    scheduler::set_priority(Priority(30));
    check(
        DEMOTE_MARK.load(Ordering::SeqCst),
        "demotion handed the CPU to the better thread"
    );
    scheduler::set_priority(Priority::DEFAULT);
}

// --- round-robin among equal priorities ------------------------------------

lazy_static! {
    static ref RR_ORDER: Mutex<Vec<usize>> = Mutex::new(Vec::new());
    static ref RR_DONE: Semaphore = Semaphore::new(0);
}

fn rr_worker(i: usize) {
    for _ in 0..3 {
        push_order(&RR_ORDER, i);
        scheduler::yield_now();
    }
    RR_DONE.up();
}

fn round_robin_among_equals() {
    // Below the main thread so all three queue up before any runs.
    for i in 0..3 {
        scheduler::spawn("rr", Priority(25), rr_worker, i).expect("spawn rr worker");
    }
    timer::sleep(5);
    for _ in 0..3 {
        RR_DONE.down();
    }
    let order = interrupts::without(|| RR_ORDER.lock().clone());
    check_eq(
        order,
        alloc::vec![0, 1, 2, 0, 1, 2, 0, 1, 2],
        "equal priorities rotated in insertion order"
    );
}

// --- semaphore wake order ---------------------------------------------------

lazy_static! {
    static ref SEMA: Semaphore = Semaphore::new(0);
    static ref SEMA_ORDER: Mutex<Vec<usize>> = Mutex::new(Vec::new());
    static ref SEMA_DONE: Semaphore = Semaphore::new(0);
}

fn sema_waiter(priority: usize) {
    SEMA.down();
    push_order(&SEMA_ORDER, priority);
    SEMA_DONE.up();
}

fn semaphore_wake_order() {
    // Each waiter outranks the main thread, so it blocks on the
    // semaphore before the next spawn, and each up hands the CPU over
    // immediately; the recorded order is exactly the wake order.
    for p in 40..50 {
        scheduler::spawn("sema waiter", Priority(p), sema_waiter, p as usize)
            .expect("spawn sema waiter");
    }
    for _ in 0..10 {
        SEMA.up();
    }
    for _ in 0..10 {
        SEMA_DONE.down();
    }
    let order = interrupts::without(|| SEMA_ORDER.lock().clone());
    let expected: Vec<usize> = (40..50).rev().collect();
    check_eq(order, expected, "semaphore woke waiters highest-priority first");
}

// --- condition variable signal order ----------------------------------------

lazy_static! {
    static ref COND_LOCK: Lock = Lock::new();
    static ref COND_ORDER: Mutex<Vec<usize>> = Mutex::new(Vec::new());
    static ref COND_DONE: Semaphore = Semaphore::new(0);
}

static CONDVAR: Condvar = Condvar::new();

fn cond_waiter(priority: usize) {
    COND_LOCK.acquire();
    CONDVAR.wait(&COND_LOCK);
    push_order(&COND_ORDER, priority);
    COND_LOCK.release();
    COND_DONE.up();
}

fn condvar_signal_order() {
    for p in 40..45 {
        scheduler::spawn("cond waiter", Priority(p), cond_waiter, p as usize)
            .expect("spawn cond waiter");
    }
    for _ in 0..5 {
        COND_LOCK.acquire();
        CONDVAR.signal(&COND_LOCK);
        COND_LOCK.release();
        COND_DONE.down();
    }
    let order = interrupts::without(|| COND_ORDER.lock().clone());
    let expected: Vec<usize> = (40..45).rev().collect();
    check_eq(order, expected, "signal released waiters highest-priority first");
}

// --- non-blocking variants ---------------------------------------------------

fn nonblocking_ops() {
    let sema = Semaphore::new(1);
    check(sema.try_down(), "try_down took the available unit");
    check(!sema.try_down(), "try_down refused at zero without blocking");
    sema.up();

    let lock = Lock::new();
    check(lock.try_acquire(), "try_acquire took the free lock");
    lock.release();
}

pub fn run() {
    log::info!("-- priority suite --");
    preempt_on_spawn();
    yield_on_demotion();
    round_robin_among_equals();
    semaphore_wake_order();
    condvar_signal_order();
    nonblocking_ops();
}
