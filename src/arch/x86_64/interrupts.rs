/*
 * Interrupt Control
 *
 * The kernel protects every shared scheduling structure with one discipline:
 * interrupts are disabled for the duration of the critical section. The spin
 * mutexes wrapped around the globals exist to satisfy the borrow checker;
 * with a single CPU and interrupts off they never spin.
 *
 * Two flags cross the boundary between interrupt handlers and thread code:
 *
 * - IN_INTERRUPT is set while the tick path runs. Operations that may block
 *   assert it is clear; wake-ups that happen while it is set must not switch
 *   directly.
 * - YIELD_ON_RETURN is how an interrupt handler asks for a reschedule. The
 *   dispatcher consumes it just before deciding whether to switch.
 */

use core::sync::atomic::{AtomicBool, Ordering};

static IN_INTERRUPT: AtomicBool = AtomicBool::new(false);
static YIELD_ON_RETURN: AtomicBool = AtomicBool::new(false);

/// Check whether maskable interrupts are currently enabled.
pub fn enabled() -> bool {
    x86_64::instructions::interrupts::are_enabled()
}

pub fn enable() {
    x86_64::instructions::interrupts::enable();
}

pub fn disable() {
    x86_64::instructions::interrupts::disable();
}

/// Run `f` with interrupts disabled, restoring the previous state afterwards.
///
/// Critical sections nest; only the outermost call re-enables interrupts.
pub fn without<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    x86_64::instructions::interrupts::without_interrupts(f)
}

/// True while the periodic interrupt path is executing.
pub fn in_interrupt() -> bool {
    IN_INTERRUPT.load(Ordering::SeqCst)
}

pub(crate) fn enter_interrupt() {
    IN_INTERRUPT.store(true, Ordering::SeqCst);
}

pub(crate) fn leave_interrupt() {
    IN_INTERRUPT.store(false, Ordering::SeqCst);
}

/// Ask for a reschedule when the current interrupt returns.
pub fn request_yield_on_return() {
    debug_assert!(in_interrupt());
    YIELD_ON_RETURN.store(true, Ordering::SeqCst);
}

/// Consume a pending yield-on-return request.
pub(crate) fn take_yield_request() -> bool {
    YIELD_ON_RETURN.swap(false, Ordering::SeqCst)
}
