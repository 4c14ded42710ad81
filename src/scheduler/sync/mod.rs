/*
 * Synchronization Primitives
 *
 * Counting semaphore, lock with priority donation, and Mesa-style
 * condition variable. All wait sets order their threads by effective
 * priority; all primitives follow the kernel-wide rule that shared state
 * is only touched with interrupts disabled.
 */

pub mod condvar;
pub mod lock;
pub mod semaphore;
