/*
 * Donation Suite
 *
 * Priority donation end to end: a single donor, several donors through
 * several locks with selective revocation, a full-depth chain, the
 * donation/semaphore interplay, and the condition-variable tag snapshot.
 *
 * Scenario threads all outrank the main thread, so every spawn and every
 * wake hands the CPU over immediately and the recorded orders are exact.
 */

use alloc::vec::Vec;

use lazy_static::lazy_static;
use spin::Mutex;

use crate::arch::x86_64::interrupts;
use crate::scheduler::{self, Condvar, Lock, Priority, Semaphore};
use crate::tests::check_eq;

fn push_order(list: &Mutex<Vec<&'static str>>, value: &'static str) {
    interrupts::without(|| list.lock().push(value));
}

fn effective() -> i32 {
    scheduler::get_priority().0
}

// --- one lock, two donors, release order ------------------------------------

lazy_static! {
    static ref BASIC_LOCK: Lock = Lock::new();
    static ref BASIC_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
    static ref BASIC_DONE: Semaphore = Semaphore::new(0);
}

fn basic_a(_arg: usize) {
    BASIC_LOCK.acquire();
    push_order(&BASIC_ORDER, "a");
    BASIC_LOCK.release();
    BASIC_DONE.up();
}

fn basic_b(_arg: usize) {
    BASIC_LOCK.acquire();
    push_order(&BASIC_ORDER, "b");
    BASIC_LOCK.release();
    BASIC_DONE.up();
}

fn basic_donation() {
    check_eq(effective(), 31, "baseline effective priority");

    BASIC_LOCK.acquire();
    scheduler::spawn("donor a", Priority(32), basic_a, 0).expect("spawn donor a");
    check_eq(effective(), 32, "first donor raised the holder");
    scheduler::spawn("donor b", Priority(33), basic_b, 0).expect("spawn donor b");
    check_eq(effective(), 33, "second donor raised the holder further");

    BASIC_LOCK.release();
    BASIC_DONE.down();
    BASIC_DONE.down();

    check_eq(effective(), 31, "release revoked every donation");
    let order = interrupts::without(|| BASIC_ORDER.lock().clone());
    check_eq(order, alloc::vec!["b", "a"], "waiters got the lock best-first");
}

// --- two locks, selective revocation ----------------------------------------

lazy_static! {
    static ref MULTI_LOCK_A: Lock = Lock::new();
    static ref MULTI_LOCK_B: Lock = Lock::new();
    static ref MULTI_DONE: Semaphore = Semaphore::new(0);
}

fn multi_a(_arg: usize) {
    MULTI_LOCK_A.acquire();
    MULTI_LOCK_A.release();
    MULTI_DONE.up();
}

fn multi_b(_arg: usize) {
    MULTI_LOCK_B.acquire();
    MULTI_LOCK_B.release();
    MULTI_DONE.up();
}

fn selective_revocation() {
    MULTI_LOCK_A.acquire();
    MULTI_LOCK_B.acquire();

    scheduler::spawn("multi a", Priority(32), multi_a, 0).expect("spawn multi a");
    scheduler::spawn("multi b", Priority(33), multi_b, 0).expect("spawn multi b");
    check_eq(effective(), 33, "holder carries the best of both donations");

    MULTI_LOCK_B.release();
    check_eq(effective(), 32, "releasing one lock kept the other donation");

    MULTI_LOCK_A.release();
    check_eq(effective(), 31, "releasing the second lock restored the base");

    MULTI_DONE.down();
    MULTI_DONE.down();
}

// --- donation chain at full depth -------------------------------------------

const CHAIN_LINKS: usize = 7;

lazy_static! {
    static ref CHAIN_LOCKS: Vec<Lock> = (0..=CHAIN_LINKS).map(|_| Lock::new()).collect();
    static ref CHAIN_DONE: Semaphore = Semaphore::new(0);
}

fn chain_priority(link: usize) -> i32 {
    31 + 3 * link as i32
}

fn chain_link(link: usize) {
    // Hold this link's lock, then block on the previous one; the block
    // donates down the whole chain.
    if link < CHAIN_LINKS {
        CHAIN_LOCKS[link].acquire();
    }
    CHAIN_LOCKS[link - 1].acquire();
    CHAIN_LOCKS[link - 1].release();
    if link < CHAIN_LINKS {
        CHAIN_LOCKS[link].release();
    }
    CHAIN_DONE.up();
}

fn chain_donation() {
    CHAIN_LOCKS[0].acquire();

    for link in 1..=CHAIN_LINKS {
        scheduler::spawn(
            "chain link",
            Priority(chain_priority(link)),
            chain_link,
            link,
        )
        .expect("spawn chain link");
        check_eq(
            effective(),
            chain_priority(link),
            "donation propagated down the chain"
        );
    }

    CHAIN_LOCKS[0].release();
    for _ in 1..=CHAIN_LINKS {
        CHAIN_DONE.down();
    }
    check_eq(effective(), 31, "chain release restored the base");
}

// --- donation and semaphores interleaved ------------------------------------

lazy_static! {
    static ref MIX_LOCK: Lock = Lock::new();
    static ref MIX_SEMA: Semaphore = Semaphore::new(0);
    static ref MIX_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
    static ref MIX_DONE: Semaphore = Semaphore::new(0);
}

fn mix_low(_arg: usize) {
    MIX_LOCK.acquire();
    push_order(&MIX_ORDER, "low acquired");
    MIX_SEMA.down();
    push_order(&MIX_ORDER, "low woke");
    MIX_LOCK.release();
    push_order(&MIX_ORDER, "low released");
    MIX_DONE.up();
}

fn mix_mid(_arg: usize) {
    MIX_SEMA.down();
    push_order(&MIX_ORDER, "mid woke");
    MIX_DONE.up();
}

fn mix_high(_arg: usize) {
    MIX_LOCK.acquire();
    push_order(&MIX_ORDER, "high acquired");
    MIX_LOCK.release();
    MIX_DONE.up();
}

/// A donation must carry a thread through a semaphore wait set: `low`
/// holds the lock and waits on the semaphore; `high` donates through the
/// lock; the first up must pick `low` (effective 36) over `mid` (34).
fn donation_vs_semaphore() {
    scheduler::spawn("mix low", Priority(32), mix_low, 0).expect("spawn mix low");
    scheduler::spawn("mix mid", Priority(34), mix_mid, 0).expect("spawn mix mid");
    scheduler::spawn("mix high", Priority(36), mix_high, 0).expect("spawn mix high");

    MIX_SEMA.up();
    MIX_SEMA.up();
    for _ in 0..3 {
        MIX_DONE.down();
    }

    let order = interrupts::without(|| MIX_ORDER.lock().clone());
    check_eq(
        order,
        alloc::vec![
            "low acquired",
            "low woke",
            "high acquired",
            "low released",
            "mid woke"
        ],
        "donated priority decided the semaphore wake order"
    );
}

// --- acquire/release round trip ---------------------------------------------

lazy_static! {
    static ref TRIP_LOCK: Lock = Lock::new();
    static ref TRIP_DONE: Semaphore = Semaphore::new(0);
}

fn trip_donor(_arg: usize) {
    TRIP_LOCK.acquire();
    TRIP_LOCK.release();
    TRIP_DONE.up();
}

fn round_trip() {
    let before = effective();
    TRIP_LOCK.acquire();
    scheduler::spawn("trip donor", Priority(40), trip_donor, 0).expect("spawn trip donor");
    check_eq(effective(), 40, "donation arrived");
    TRIP_LOCK.release();
    TRIP_DONE.down();
    check_eq(effective(), before, "acquire/release round trip restored priority");
}

// --- condition variable tags are snapshots ----------------------------------

lazy_static! {
    static ref TAG_COND_LOCK: Lock = Lock::new();
    static ref TAG_HELD_LOCK: Lock = Lock::new();
    static ref TAG_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
    static ref TAG_DONE: Semaphore = Semaphore::new(0);
}

static TAG_CONDVAR: Condvar = Condvar::new();

fn tag_low_waiter(_arg: usize) {
    TAG_HELD_LOCK.acquire();
    TAG_COND_LOCK.acquire();
    TAG_CONDVAR.wait(&TAG_COND_LOCK);
    push_order(&TAG_ORDER, "low");
    TAG_COND_LOCK.release();
    TAG_HELD_LOCK.release();
    TAG_DONE.up();
}

fn tag_high_waiter(_arg: usize) {
    TAG_COND_LOCK.acquire();
    TAG_CONDVAR.wait(&TAG_COND_LOCK);
    push_order(&TAG_ORDER, "high");
    TAG_COND_LOCK.release();
    TAG_DONE.up();
}

fn tag_donor(_arg: usize) {
    TAG_HELD_LOCK.acquire();
    TAG_HELD_LOCK.release();
    TAG_DONE.up();
}

/// The signal order follows the priority each waiter had when it called
/// wait. A donation that promotes a blocked waiter afterwards does not
/// move it forward; the tag is a snapshot, and this test pins that.
fn condvar_tag_snapshot() {
    scheduler::spawn("tag low", Priority(32), tag_low_waiter, 0).expect("spawn tag low");
    scheduler::spawn("tag high", Priority(40), tag_high_waiter, 0).expect("spawn tag high");
    // Donates 50 to the low waiter through the lock it still holds; its
    // effective priority now beats the high waiter's.
    scheduler::spawn("tag donor", Priority(50), tag_donor, 0).expect("spawn tag donor");

    for _ in 0..2 {
        TAG_COND_LOCK.acquire();
        TAG_CONDVAR.signal(&TAG_COND_LOCK);
        TAG_COND_LOCK.release();
    }
    for _ in 0..3 {
        TAG_DONE.down();
    }

    let order = interrupts::without(|| TAG_ORDER.lock().clone());
    check_eq(
        order,
        alloc::vec!["high", "low"],
        "signal order followed wait-time tags, not later donations"
    );
}

pub fn run() {
    log::info!("-- donation suite --");
    basic_donation();
    selective_revocation();
    chain_donation();
    donation_vs_semaphore();
    round_trip();
    condvar_tag_snapshot();
}
