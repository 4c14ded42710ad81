/*
 * Preemptive Thread Scheduler
 *
 * Mechanism and state for multitasking. The design in one paragraph:
 * every context switch is interrupt-shaped. The timer interrupt (vector
 * 0x20) drives preemption; voluntary suspension (yield, block, sleep, a
 * contended lock, a semaphore at zero) raises the software vector 0x81.
 * Both land in a naked entry that captures the full register frame on the
 * interrupted thread's stack, then call into the dispatcher, which picks
 * the highest-priority ready thread and returns the frame to resume.
 *
 * Shared structures (thread table, ready queue, sleep set, wait sets) are
 * only touched with interrupts disabled. The `spin::Mutex` around the
 * globals exists for interior mutability; on one CPU with interrupts off
 * it never contends. A blocking operation mutates state, drops the lock,
 * and raises vector 0x81 while interrupts are still disabled; software
 * interrupts ignore the interrupt flag, and the incoming thread's saved
 * RFLAGS re-enables interrupts on its behalf.
 *
 * Scheduling policy is pluggable: `Box<dyn SchedPolicy>`, chosen once at
 * boot. The default policy runs static priorities with donation; the
 * `mlfqs` build feature selects the multilevel feedback queue instead.
 * The dispatcher itself is policy-agnostic.
 */

pub mod context;
pub mod fixed_point;
pub mod policies;
pub mod ready;
pub mod sync;
pub mod thread;

pub use sync::condvar::Condvar;
pub use sync::lock::Lock;
pub use sync::semaphore::Semaphore;
pub use thread::{Priority, SpawnError, Thread, ThreadId, ThreadState, ThreadTable};

use core::cmp::Reverse;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BinaryHeap};
use alloc::vec::Vec;

use spin::Mutex;

use crate::arch::x86_64::interrupts;
use crate::memory::page;
use crate::utils::timer;
use context::SwitchFrame;
use policies::SchedPolicy;
use sync::lock::{LockEntry, LockId};
use sync::semaphore::{SemaEntry, SemaId};
use thread::ThreadPage;

/// Ticks a thread may run before the tick handler forces a yield.
pub const TIME_SLICE: u32 = 4;

/// A sleeping thread and the tick it becomes eligible at.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct SleepEntry {
    wake_tick: u64,
    tid: ThreadId,
}

/// Counters reported by the statistics printout.
#[derive(Debug, Default, Clone)]
pub struct SchedStats {
    pub context_switches: u64,
    pub idle_ticks: u64,
    pub kernel_ticks: u64,
}

/// A row of the per-thread statistics report.
pub struct ThreadStat {
    pub id: ThreadId,
    pub name: alloc::string::String,
    pub state: ThreadState,
    pub cpu_ticks: u64,
}

/// Which wait set a blocked thread sits in.
#[derive(Clone, Copy)]
pub(crate) enum WaitObj {
    Sema(SemaId),
    Lock(LockId),
}

/// All mutable scheduler state, guarded by one lock and the interrupt
/// flag.
pub struct SchedState {
    pub threads: ThreadTable,
    pub ready: ready::ReadyQueue,
    sleepers: BinaryHeap<Reverse<SleepEntry>>,
    pub(crate) semas: BTreeMap<SemaId, SemaEntry>,
    pub(crate) locks: BTreeMap<LockId, LockEntry>,

    /// Pages of dead threads, freed at the head of the next dispatch.
    graveyard: Vec<ThreadPage>,

    next_thread: usize,
    next_sema: usize,
    next_lock: usize,

    pub idle: Option<ThreadId>,
    initial: ThreadId,

    /// Ticks the running thread has consumed of its slice.
    slice_used: u32,

    pub stats: SchedStats,
}

impl SchedState {
    fn new() -> Self {
        Self {
            threads: ThreadTable::new(),
            ready: ready::ReadyQueue::new(),
            sleepers: BinaryHeap::new(),
            semas: BTreeMap::new(),
            locks: BTreeMap::new(),
            graveyard: Vec::new(),
            next_thread: 0,
            next_sema: 0,
            next_lock: 0,
            idle: None,
            initial: ThreadId(0),
            slice_used: 0,
            stats: SchedStats::default(),
        }
    }

    fn alloc_thread_id(&mut self) -> ThreadId {
        self.next_thread += 1;
        ThreadId(self.next_thread)
    }

    pub(crate) fn alloc_sema_id(&mut self) -> SemaId {
        self.next_sema += 1;
        SemaId(self.next_sema)
    }

    pub(crate) fn alloc_lock_id(&mut self) -> LockId {
        self.next_lock += 1;
        LockId(self.next_lock)
    }

    /// Effective priority of `tid`; the floor if the thread is gone.
    pub(crate) fn effective(&self, tid: ThreadId) -> Priority {
        self.threads
            .get(tid)
            .map(|t| t.effective_priority)
            .unwrap_or(Priority::MIN)
    }

    /// Move a blocked thread onto the ready queue.
    pub(crate) fn make_ready(&mut self, tid: ThreadId) {
        let t = self.threads.get_mut(tid).expect("unblock of unknown thread");
        assert!(
            t.state == ThreadState::Blocked,
            "unblock of a thread that is not blocked"
        );
        t.state = ThreadState::Ready;
        let priority = t.effective_priority;
        self.ready.insert(tid, priority);
    }

    fn waiters_mut(&mut self, obj: WaitObj) -> &mut Vec<ThreadId> {
        match obj {
            WaitObj::Sema(id) => {
                &mut self.semas.get_mut(&id).expect("semaphore missing").waiters
            }
            WaitObj::Lock(id) => &mut self.locks.get_mut(&id).expect("lock missing").waiters,
        }
    }

    /// File the running thread into a wait set, ordered by effective
    /// priority, and mark it blocked.
    pub(crate) fn wait_insert(&mut self, obj: WaitObj, tid: ThreadId) {
        let priority = self.effective(tid);
        let mut q = core::mem::take(self.waiters_mut(obj));
        let pos = q
            .iter()
            .position(|&w| self.effective(w) < priority)
            .unwrap_or(q.len());
        q.insert(pos, tid);
        *self.waiters_mut(obj) = q;

        let t = self.threads.get_mut(tid).expect("waiter missing from table");
        assert!(
            t.state == ThreadState::Running,
            "only the running thread can start a wait"
        );
        t.state = ThreadState::Blocked;
    }

    /// Wake the best waiter of a wait set, if any.
    ///
    /// Waiters are re-ordered by their priorities as of now; donations
    /// and ladder recomputations may have moved them since they blocked.
    pub(crate) fn wake_best(&mut self, obj: WaitObj) -> Option<(ThreadId, Priority)> {
        let mut q = core::mem::take(self.waiters_mut(obj));
        if q.is_empty() {
            return None;
        }
        q.sort_by(|&a, &b| self.effective(b).cmp(&self.effective(a)));
        let tid = q.remove(0);
        *self.waiters_mut(obj) = q;

        self.make_ready(tid);
        Some((tid, self.effective(tid)))
    }
}

static SCHED: Mutex<Option<SchedState>> = Mutex::new(None);
static POLICY: Mutex<Option<Box<dyn SchedPolicy>>> = Mutex::new(None);
static SCHED_STARTED: AtomicBool = AtomicBool::new(false);

/// Hook invoked with the incoming thread at every context switch; user
/// address-space activation plugs in here when user programs exist.
static ADDRESS_SPACE_HOOK: Mutex<Option<fn(ThreadId)>> = Mutex::new(None);

/// Run `f` against the scheduler state. Interrupts must be disabled.
pub(crate) fn with_state<R>(f: impl FnOnce(&mut SchedState) -> R) -> R {
    debug_assert!(!interrupts::enabled());
    let mut guard = SCHED.lock();
    f(guard.as_mut().expect("scheduler not initialized"))
}

/// Run `f` against the state and the active policy. Interrupts must be
/// disabled. Lock order is state, then policy, everywhere.
pub(crate) fn with_state_and_policy<R>(
    f: impl FnOnce(&mut SchedState, &mut dyn SchedPolicy) -> R,
) -> R {
    debug_assert!(!interrupts::enabled());
    let mut s_guard = SCHED.lock();
    let mut p_guard = POLICY.lock();
    let s = s_guard.as_mut().expect("scheduler not initialized");
    let p = p_guard.as_mut().expect("scheduler not initialized");
    f(s, p.as_mut())
}

/// Raise the voluntary-switch vector. The dispatcher runs before this
/// returns; if the current thread stops being runnable it resumes here
/// whenever it is next scheduled.
///
/// The scheduler lock must not be held; the dispatcher takes it.
pub(crate) fn trigger_switch() {
    unsafe {
        core::arch::asm!("int 0x81", options(nostack));
    }
}

const _: () = assert!(crate::arch::x86_64::idt::YIELD_VECTOR == 0x81);

/// Wrap the already-running boot flow into the first thread.
///
/// `boot_page` is the page `_start` switched the stack onto; the record
/// is written at its base while the boot stack keeps growing down from
/// the top.
pub fn init(boot_page: NonNull<u8>) {
    assert!(!interrupts::enabled());

    let mut state = SchedState::new();
    let tid = state.alloc_thread_id();
    unsafe {
        thread::init_at(boot_page, tid, "main", Priority::DEFAULT, SwitchFrame::default());
    }
    state.threads.insert(tid, ThreadPage(boot_page.cast()));
    state.initial = tid;
    state.threads.get_mut(tid).unwrap().state = ThreadState::Running;

    let policy = policies::boot_policy();
    let policy_name = policy.name();

    *SCHED.lock() = Some(state);
    *POLICY.lock() = Some(policy);
    thread::mark_threading_ready();

    log::info!("scheduler initialized, policy: {}", policy_name);
}

/// Begin preemptive scheduling: create the idle thread, enable
/// interrupts, and wait for idle's first run before returning.
pub fn start() {
    let started = Semaphore::new(0);
    SCHED_STARTED.store(true, Ordering::SeqCst);

    spawn_internal(
        "idle",
        Priority::MIN,
        idle_main,
        started.raw_id(),
        SpawnRole::Idle,
    )
    .expect("no page available for the idle thread");

    interrupts::enable();
    started.down();
    log::info!("scheduler running");
}

/// Register the hook invoked with each incoming thread on a switch.
///
/// The hook runs inside the dispatcher with the scheduler locked; it
/// must not call back into the scheduler.
pub fn set_address_space_hook(hook: fn(ThreadId)) {
    *ADDRESS_SPACE_HOOK.lock() = Some(hook);
}

enum SpawnRole {
    Normal,
    Idle,
}

/// Create a thread running `entry(arg)` and make it ready.
///
/// The creator yields immediately if the new thread outranks it. Returns
/// `Err(SpawnError::OutOfPages)` when the page pool is exhausted, the
/// only creation failure a caller is expected to handle.
pub fn spawn(
    name: &str,
    priority: Priority,
    entry: fn(usize),
    arg: usize,
) -> Result<ThreadId, SpawnError> {
    spawn_internal(name, priority, entry, arg, SpawnRole::Normal)
}

fn spawn_internal(
    name: &str,
    priority: Priority,
    entry: fn(usize),
    arg: usize,
    role: SpawnRole,
) -> Result<ThreadId, SpawnError> {
    assert!(priority.in_range(), "spawn priority {} out of range", priority);

    interrupts::without(|| {
        let page = page::alloc_zeroed_page().ok_or(SpawnError::OutOfPages)?;
        let creator = thread::current();

        let (tid, spawned_priority) = with_state_and_policy(|s, pol| {
            let tid = s.alloc_thread_id();
            let frame = SwitchFrame::initial(
                kickoff as usize as u64,
                thread::stack_top(page),
                entry as usize as u64,
                arg as u64,
            );
            unsafe {
                thread::init_at(page, tid, name, priority, frame);
            }
            s.threads.insert(tid, ThreadPage(page.cast()));
            if let SpawnRole::Idle = role {
                // Registered before the policy sees it, so no policy ever
                // counts the idle thread.
                s.idle = Some(tid);
            }
            pol.on_spawn(s, creator, tid);
            s.make_ready(tid);
            (tid, s.effective(tid))
        });

        if SCHED_STARTED.load(Ordering::SeqCst) {
            let mine = with_state(|s| s.effective(creator));
            if spawned_priority > mine {
                trigger_switch();
            }
        }
        Ok(tid)
    })
}

/// First code every new thread runs, entered via the initial frame with
/// interrupts already enabled. Falls through into `exit` when the entry
/// function returns.
extern "C" fn kickoff(entry_raw: u64, arg: u64) -> ! {
    let entry: fn(usize) = unsafe { core::mem::transmute(entry_raw as usize) };
    entry(arg as usize);
    exit();
}

/// The running thread's id.
pub fn current() -> ThreadId {
    thread::current()
}

/// Give up the CPU; the thread stays ready and runs again when it is the
/// best choice.
pub fn yield_now() {
    if !SCHED_STARTED.load(Ordering::SeqCst) {
        return;
    }
    assert!(
        !interrupts::in_interrupt(),
        "yield from interrupt context; request yield-on-return instead"
    );
    trigger_switch();
}

/// Block the running thread. It runs again only after `unblock`.
pub fn block_current() {
    assert!(
        !interrupts::in_interrupt(),
        "cannot block in interrupt context"
    );
    interrupts::without(|| {
        with_state(|s| {
            let me = thread::current();
            let t = s.threads.get_mut(me).expect("current thread missing");
            assert!(t.state == ThreadState::Running);
            t.state = ThreadState::Blocked;
        });
        trigger_switch();
    });
}

/// Make a blocked thread ready.
///
/// Deliberately does not preempt: callers decide whether the wake-up
/// warrants a switch, and interrupt handlers must defer it to
/// yield-on-return.
pub fn unblock(tid: ThreadId) {
    interrupts::without(|| {
        with_state(|s| s.make_ready(tid));
    });
}

/// Terminate the running thread. Its page is reclaimed by the dispatcher
/// after the switch away from it; the call never returns.
pub fn exit() -> ! {
    let me = thread::current();
    interrupts::without(|| {
        with_state(|s| {
            assert!(Some(me) != s.idle, "idle thread cannot exit");
            let t = s.threads.get_mut(me).expect("current thread missing");
            t.state = ThreadState::Dying;
        });
        trigger_switch();
    });
    unreachable!("a dying thread was scheduled again");
}

/// Sleep until the clock reaches `wake`.
pub(crate) fn sleep_until(wake: u64) {
    assert!(
        !interrupts::in_interrupt(),
        "cannot sleep in interrupt context"
    );
    interrupts::without(|| {
        with_state(|s| {
            let me = thread::current();
            let t = s.threads.get_mut(me).expect("current thread missing");
            assert!(t.state == ThreadState::Running);
            t.wake_tick = wake;
            t.state = ThreadState::Blocked;
            s.sleepers.push(Reverse(SleepEntry {
                wake_tick: wake,
                tid: me,
            }));
        });
        trigger_switch();
    });
}

/// Set the running thread's base priority.
///
/// Under the feedback-queue policy this is a no-op; priorities there are
/// computed, not configured.
pub fn set_priority(priority: Priority) {
    assert!(priority.in_range(), "priority {} out of range", priority);
    interrupts::without(|| {
        let me = thread::current();
        let should_yield = with_state_and_policy(|s, pol| pol.on_set_priority(s, me, priority));
        if should_yield {
            trigger_switch();
        }
    });
}

/// The running thread's effective priority.
pub fn get_priority() -> Priority {
    interrupts::without(|| with_state(|s| s.effective(thread::current())))
}

/// Set the running thread's niceness (feedback-queue policy only).
pub fn set_nice(nice: i32) {
    assert!((-20..=20).contains(&nice), "nice {} out of range", nice);
    interrupts::without(|| {
        let me = thread::current();
        let should_yield = with_state_and_policy(|s, pol| pol.on_set_nice(s, me, nice));
        if should_yield {
            trigger_switch();
        }
    });
}

/// The running thread's niceness.
pub fn get_nice() -> i32 {
    interrupts::without(|| {
        with_state(|s| {
            s.threads
                .get(thread::current())
                .expect("current thread missing")
                .nice
        })
    })
}

/// System load average scaled by 100, rounded to nearest.
pub fn get_load_avg() -> i32 {
    interrupts::without(|| {
        let guard = POLICY.lock();
        guard
            .as_ref()
            .map(|p| p.load_avg().mul_int(100).round())
            .unwrap_or(0)
    })
}

/// The running thread's recent CPU usage scaled by 100, rounded.
pub fn get_recent_cpu() -> i32 {
    interrupts::without(|| {
        with_state(|s| {
            s.threads
                .get(thread::current())
                .expect("current thread missing")
                .recent_cpu
                .mul_int(100)
                .round()
        })
    })
}

/// Snapshot of the global counters.
pub fn stats() -> SchedStats {
    interrupts::without(|| with_state(|s| s.stats.clone()))
}

/// Snapshot of every live thread for the statistics report.
pub fn thread_stats() -> Vec<ThreadStat> {
    interrupts::without(|| {
        with_state(|s| {
            s.threads
                .ids()
                .into_iter()
                .filter_map(|tid| {
                    s.threads.get(tid).map(|t| ThreadStat {
                        id: t.id,
                        name: t.name.as_str().into(),
                        state: t.state,
                        cpu_ticks: t.cpu_ticks,
                    })
                })
                .collect()
        })
    })
}

/// Weigh a woken thread's priority against the running thread and switch
/// (or arrange a switch at interrupt return) if it wins.
pub(crate) fn preempt_if_outranked(woken: Priority) {
    if !SCHED_STARTED.load(Ordering::SeqCst) {
        return;
    }
    let mine = with_state(|s| s.effective(thread::current()));
    if woken <= mine {
        return;
    }
    if interrupts::in_interrupt() {
        interrupts::request_yield_on_return();
    } else {
        trigger_switch();
    }
}

fn idle_main(started_sema: usize) {
    sync::semaphore::up_raw(started_sema);
    loop {
        block_current();
        // Re-enable interrupts and halt in one step so the wake-up
        // interrupt cannot slip in between.
        x86_64::instructions::interrupts::enable_and_hlt();
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Free the pages of threads that died since the last dispatch. Runs
/// before anything else so a dying thread's stack is never freed while
/// still in use; it is only queued here by the switch away from it.
fn reap(s: &mut SchedState) {
    while let Some(page) = s.graveyard.pop() {
        unsafe {
            core::ptr::drop_in_place(page.0.as_ptr());
            page::free_page(page.0.cast());
        }
    }
}

/// Pick the next thread and hand back the frame to resume.
///
/// Runs with interrupts disabled, on the departing thread's stack, with
/// the scheduler lock held by the caller.
fn dispatch(s: &mut SchedState, current_frame: *const SwitchFrame) -> *const SwitchFrame {
    reap(s);

    let me = thread::current();
    let idle = s.idle.expect("dispatch before the idle thread exists");

    // A still-running departer is yielding: requeue it. The idle thread
    // never sits on the ready queue; it parks as Blocked and is chosen
    // directly when nothing else is runnable.
    let state = s
        .threads
        .get(me)
        .expect("current thread missing from table")
        .state;
    if state == ThreadState::Running {
        if me == idle {
            s.threads.get_mut(me).unwrap().state = ThreadState::Blocked;
        } else {
            let t = s.threads.get_mut(me).unwrap();
            t.state = ThreadState::Ready;
            let priority = t.effective_priority;
            s.ready.insert(me, priority);
        }
    }

    let next = s.ready.pop().unwrap_or(idle);
    if next == me {
        s.threads.get_mut(me).unwrap().state = ThreadState::Running;
        return current_frame;
    }

    match s.threads.get(me).map(|t| t.state) {
        Some(ThreadState::Dying) => {
            let page = s.threads.remove(me).expect("dying thread missing");
            if me != s.initial {
                s.graveyard.push(page);
            }
        }
        Some(_) => {
            s.threads.get_mut(me).unwrap().frame = unsafe { *current_frame };
        }
        None => unreachable!(),
    }

    let t = s
        .threads
        .get_mut(next)
        .expect("scheduled thread missing from table");
    t.state = ThreadState::Running;
    let frame_ptr = &t.frame as *const SwitchFrame;

    s.slice_used = 0;
    s.stats.context_switches += 1;

    if let Some(hook) = *ADDRESS_SPACE_HOOK.lock() {
        hook(next);
    }

    frame_ptr
}

/// Per-tick bookkeeping. Returns whether the running thread should be
/// preempted at interrupt return.
fn tick_bookkeeping(s: &mut SchedState, pol: &mut dyn SchedPolicy, now: u64) -> bool {
    let me = thread::current();

    if Some(me) == s.idle {
        s.stats.idle_ticks += 1;
    } else {
        s.stats.kernel_ticks += 1;
    }
    if let Some(t) = s.threads.get_mut(me) {
        t.cpu_ticks += 1;
    }

    // Wake every sleeper that is due, stopping at the first that is not.
    while let Some(Reverse(head)) = s.sleepers.peek() {
        if head.wake_tick > now {
            break;
        }
        let Reverse(entry) = s.sleepers.pop().unwrap();
        let due = s
            .threads
            .get(entry.tid)
            .map(|t| t.state == ThreadState::Blocked && t.wake_tick == entry.wake_tick)
            .unwrap_or(false);
        if due {
            s.make_ready(entry.tid);
        }
    }

    let mut preempt = pol.on_tick(s, now);

    s.slice_used += 1;
    if s.slice_used >= TIME_SLICE {
        preempt = true;
    }

    let mine = s.effective(me);
    if let Some(head) = s.ready.head_priority() {
        if head > mine {
            preempt = true;
        }
    }

    preempt
}

extern "C" fn schedule_from_timer(current_frame: *const SwitchFrame) -> *const SwitchFrame {
    interrupts::enter_interrupt();
    let now = timer::advance();

    let next_frame = {
        let mut s_guard = SCHED.lock();
        let mut p_guard = POLICY.lock();
        match (s_guard.as_mut(), p_guard.as_mut()) {
            (Some(s), Some(pol)) if SCHED_STARTED.load(Ordering::SeqCst) => {
                let mut preempt = tick_bookkeeping(s, pol.as_mut(), now);
                preempt |= interrupts::take_yield_request();
                if preempt {
                    dispatch(s, current_frame)
                } else {
                    current_frame
                }
            }
            _ => current_frame,
        }
    };

    interrupts::leave_interrupt();
    next_frame
}

extern "C" fn schedule_from_yield(current_frame: *const SwitchFrame) -> *const SwitchFrame {
    let mut guard = SCHED.lock();
    match guard.as_mut() {
        Some(s) if SCHED_STARTED.load(Ordering::SeqCst) => dispatch(s, current_frame),
        _ => current_frame,
    }
}

// ---------------------------------------------------------------------------
// Switch entries
// ---------------------------------------------------------------------------
//
// The CPU has pushed SS, RSP, RFLAGS, CS, RIP. Pushing the fifteen
// general-purpose registers on top completes a `SwitchFrame` with RSP at
// its first field. The dispatcher receives that pointer and returns the
// frame to resume; moving RSP there and popping in reverse order plus
// `iretq` reconstitutes the chosen thread.

/// Timer interrupt entry (vector 0x20). Acknowledges the PIC before the
/// final `iretq`.
#[unsafe(naked)]
pub unsafe extern "C" fn timer_switch_entry() {
    core::arch::naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {schedule}",
        "mov rsp, rax",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        // End-of-interrupt to the primary PIC.
        "push rax",
        "mov al, 0x20",
        "out 0x20, al",
        "pop rax",
        "iretq",
        schedule = sym schedule_from_timer,
    )
}

/// Voluntary switch entry (vector 0x81). Identical to the timer entry
/// except that software interrupts owe the PIC nothing.
#[unsafe(naked)]
pub unsafe extern "C" fn yield_switch_entry() {
    core::arch::naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {schedule}",
        "mov rsp, rax",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        schedule = sym schedule_from_yield,
    )
}
