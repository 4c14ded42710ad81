/*
 * Tern Kernel Entry Point
 *
 * A small teaching kernel whose heart is the thread scheduler: preemptive
 * multitasking with priority scheduling, priority donation (or, built
 * with the `mlfqs` feature, a multilevel feedback queue), semaphores,
 * locks and condition variables, all switched through timer interrupts.
 *
 * Boot is deliberately plain: `_start` hops onto the boot thread's page
 * and calls `kstart`, which brings the machine up step by step and then
 * runs the in-kernel test suites.
 */

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]
#![allow(dead_code)]
#![feature(abi_x86_interrupt)]

extern crate alloc;
#[cfg(not(test))]
extern crate rlibc;

#[cfg(not(test))]
use core::panic::PanicInfo;
#[cfg(not(test))]
use core::ptr::NonNull;

mod arch;
mod memory;
mod scheduler;
mod tests;
mod utils;

use memory::page::PAGE_SIZE;

/// The boot thread's page: its control block at the base, the boot stack
/// growing down from the top. Self-aligned like every pool page so the
/// stack-pointer mask finds the record.
#[repr(C, align(16384))]
struct BootThreadPage([u8; PAGE_SIZE]);

const _: () = assert!(core::mem::align_of::<BootThreadPage>() == PAGE_SIZE);

#[cfg(not(test))]
static mut BOOT_THREAD_PAGE: BootThreadPage = BootThreadPage([0; PAGE_SIZE]);

/// Raw entry point. Moves the stack onto the boot thread's page before a
/// single Rust frame exists, then enters `kstart`.
#[cfg(not(test))]
#[unsafe(naked)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        "lea rax, [rip + {boot_page}]",
        "add rax, {page_size}",
        "mov rsp, rax",
        // Fake return address; keeps the C ABI's stack alignment for the
        // jump below.
        "push 0",
        "jmp {kstart}",
        boot_page = sym BOOT_THREAD_PAGE,
        page_size = const PAGE_SIZE,
        kstart = sym kstart,
    );
}

/// Rust-side kernel initialization, running on the boot thread's page.
#[cfg(not(test))]
#[unsafe(no_mangle)]
pub extern "C" fn kstart() -> ! {
    arch::x86_64::interrupts::disable();

    utils::logger::init();
    log::info!("tern kernel booting");

    arch::x86_64::gdt::init();
    arch::x86_64::idt::init();

    memory::init();

    // The boot flow becomes the first thread; from here on there is a
    // current thread to speak of.
    let boot_page = NonNull::new(core::ptr::addr_of_mut!(BOOT_THREAD_PAGE) as *mut u8)
        .expect("boot page has an address");
    scheduler::init(boot_page);

    arch::x86_64::pic::init();
    arch::x86_64::pit::init(utils::timer::TIMER_FREQ as u32);

    // Creates the idle thread and enables interrupts; preemption is live
    // once this returns.
    scheduler::start();

    tests::run_all();

    utils::timer::print_stats();
    for stat in scheduler::thread_stats() {
        log::info!(
            "  {} ({}): {:?}, {} ticks on cpu",
            stat.id,
            stat.name,
            stat.state,
            stat.cpu_ticks
        );
    }
    log::info!("boot thread going idle");
    loop {
        x86_64::instructions::hlt();
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    arch::x86_64::interrupts::disable();

    match scheduler::thread::try_current() {
        Some(tid) => log::error!("kernel panic in {}: {}", tid, info),
        None => log::error!("kernel panic: {}", info),
    }

    loop {
        x86_64::instructions::hlt();
    }
}
