/*
 * Kernel Heap Allocator
 *
 * A linked-list heap over a static region, registered as the global
 * allocator so Box, Vec and friends work in kernel code. Allocation
 * failure panics (the default allocation-error behavior); kernel code
 * treats out-of-memory as unrecoverable everywhere except thread-page
 * exhaustion, which has its own pool.
 *
 * Every operation runs with interrupts disabled. The timer path grows
 * scheduler collections, so the heap lock must never be held across a
 * preemption; on one CPU, disabling interrupts for the critical section
 * is exactly that guarantee.
 */

use core::alloc::{GlobalAlloc, Layout};
#[cfg(not(test))]
use core::ptr::addr_of_mut;

use linked_list_allocator::LockedHeap;

use crate::arch::x86_64::interrupts;

/// Size of the kernel heap in bytes.
pub const HEAP_SIZE: usize = 1024 * 1024;

struct IrqSafeHeap(LockedHeap);

unsafe impl GlobalAlloc for IrqSafeHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        interrupts::without(|| unsafe { self.0.alloc(layout) })
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        interrupts::without(|| unsafe { self.0.dealloc(ptr, layout) })
    }
}

#[cfg(not(test))]
#[global_allocator]
static ALLOCATOR: IrqSafeHeap = IrqSafeHeap(LockedHeap::empty());

/// Backing storage for the heap. Only ever touched through the allocator.
#[cfg(not(test))]
static mut HEAP_REGION: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Initialize the global allocator over the static region.
///
/// Must be called exactly once, before any allocation.
#[cfg(not(test))]
pub fn init() {
    unsafe {
        ALLOCATOR
            .0
            .lock()
            .init(addr_of_mut!(HEAP_REGION) as *mut u8, HEAP_SIZE);
    }
}
