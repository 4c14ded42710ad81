/*
 * Memory Services
 *
 * Two allocators with distinct jobs:
 * - heap: general-purpose kernel allocations (collections, names, frames)
 * - page: fixed-size, alignment-guaranteed pages that hold one thread's
 *   control block and stack each
 */

pub mod heap;
pub mod page;

/// Bring up both allocators. Must run before the first heap allocation and
/// before the scheduler is initialized.
#[cfg(not(test))]
pub fn init() {
    heap::init();
    log::info!(
        "memory ready: {} KiB heap, {} thread pages of {} KiB",
        heap::HEAP_SIZE / 1024,
        page::POOL_PAGES,
        page::PAGE_SIZE / 1024
    );
}
