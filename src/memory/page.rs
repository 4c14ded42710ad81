/*
 * Thread Page Pool
 *
 * Hands out fixed-size, self-aligned pages from a static pool. Each page
 * holds exactly one thread: the control block at the base, the stack
 * growing down from the top. The self-alignment is load-bearing: the
 * scheduler recovers the control block of the running thread by masking
 * the stack pointer with `PAGE_SIZE - 1`.
 *
 * Pages are returned zeroed. A 64-bit occupancy bitmap under a spin lock
 * tracks the pool; with a single CPU and interrupts disabled around every
 * call, the lock never spins.
 */

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use spin::Mutex;

/// Size of one thread page: control block plus kernel stack.
pub const PAGE_SIZE: usize = 16 * 1024;

/// Number of pages in the pool; bounds the number of live threads.
pub const POOL_PAGES: usize = 64;

#[repr(C, align(16384))]
struct PoolPage([u8; PAGE_SIZE]);

const _: () = assert!(core::mem::align_of::<PoolPage>() == PAGE_SIZE);

struct PoolStorage(UnsafeCell<[PoolPage; POOL_PAGES]>);

// The bitmap serializes every access to the array; no two callers ever
// hold the same page.
unsafe impl Sync for PoolStorage {}

static POOL: PoolStorage = PoolStorage(UnsafeCell::new(
    [const { PoolPage([0; PAGE_SIZE]) }; POOL_PAGES],
));

/// Occupancy bitmap: bit set = page in use.
static OCCUPIED: Mutex<u64> = Mutex::new(0);

const _: () = assert!(POOL_PAGES <= 64);

fn page_ptr(index: usize) -> *mut u8 {
    unsafe { (POOL.0.get() as *mut PoolPage).add(index) as *mut u8 }
}

/// Allocate one zeroed page, or `None` when the pool is exhausted.
pub fn alloc_zeroed_page() -> Option<NonNull<u8>> {
    let mut occupied = OCCUPIED.lock();
    let index = (0..POOL_PAGES).find(|&i| *occupied & (1 << i) == 0)?;
    *occupied |= 1 << index;

    let ptr = page_ptr(index);
    unsafe {
        core::ptr::write_bytes(ptr, 0, PAGE_SIZE);
    }
    NonNull::new(ptr)
}

/// Return a page to the pool.
///
/// # Safety
/// `ptr` must have come from `alloc_zeroed_page` and must not be used
/// afterwards; in particular no stack may still live in it.
pub unsafe fn free_page(ptr: NonNull<u8>) {
    let base = POOL.0.get() as usize;
    let addr = ptr.as_ptr() as usize;
    assert!(
        addr >= base && addr < base + POOL_PAGES * PAGE_SIZE && (addr - base) % PAGE_SIZE == 0,
        "free of a pointer that is not a pool page"
    );
    let index = (addr - base) / PAGE_SIZE;

    let mut occupied = OCCUPIED.lock();
    assert!(*occupied & (1 << index) != 0, "double free of thread page");
    *occupied &= !(1 << index);
}

/// Number of pages currently handed out.
pub fn pages_in_use() -> usize {
    OCCUPIED.lock().count_ones() as usize
}

/// Round an address down to the base of the page containing it.
pub fn page_base(addr: usize) -> usize {
    addr & !(PAGE_SIZE - 1)
}
