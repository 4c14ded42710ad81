/*
 * Interrupt Descriptor Table
 *
 * Three classes of vectors:
 *
 * 1. CPU exceptions (0..32): each gets a handler that panics with a
 *    description. The double fault runs on its own IST stack.
 * 2. The scheduler's two entry points: the timer vector (0x20) and the
 *    voluntary-switch vector (0x81). Both are naked routines that capture
 *    the full register frame before entering Rust.
 * 3. Everything else: a default handler that panics, except for the PIC's
 *    spurious vectors (0x27, 0x2F), which are silently ignored.
 */

use lazy_static::lazy_static;
use x86_64::VirtAddr;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

use super::pic;

/// Vector used by `yield_now` and every voluntary suspension to enter the
/// dispatcher. Software interrupts fire regardless of the interrupt flag,
/// which is what lets a blocking operation switch away from inside a
/// critical section.
pub const YIELD_VECTOR: u8 = 0x81;

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();

        // CPU exceptions.
        idt.divide_error.set_handler_fn(divide_error_handler);
        idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
        idt.general_protection_fault
            .set_handler_fn(general_protection_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.segment_not_present
            .set_handler_fn(segment_not_present_handler);
        idt.stack_segment_fault
            .set_handler_fn(stack_segment_fault_handler);
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(super::gdt::DOUBLE_FAULT_IST_INDEX);
        }

        // Anything not installed below is unexpected.
        for vector in 32u8..=255 {
            idt[vector].set_handler_fn(unexpected_interrupt_handler);
        }

        // The PICs raise these on their own; they carry no event.
        idt[pic::SPURIOUS_PIC1_VECTOR].set_handler_fn(spurious_interrupt_handler);
        idt[pic::SPURIOUS_PIC2_VECTOR].set_handler_fn(spurious_interrupt_handler);

        // Scheduler entry points. These are naked routines with a custom
        // frame layout, so they are installed by address.
        unsafe {
            idt[pic::TIMER_VECTOR].set_handler_addr(VirtAddr::new(
                crate::scheduler::timer_switch_entry as usize as u64,
            ));
            idt[YIELD_VECTOR].set_handler_addr(VirtAddr::new(
                crate::scheduler::yield_switch_entry as usize as u64,
            ));
        }

        idt
    };
}

/// Load the IDT. Must run after the GDT (the double-fault entry refers to
/// the TSS interrupt stack table).
pub fn init() {
    IDT.load();
    log::info!("IDT loaded");
}

extern "x86-interrupt" fn divide_error_handler(frame: InterruptStackFrame) {
    panic!("divide error at {:?}", frame.instruction_pointer);
}

extern "x86-interrupt" fn invalid_opcode_handler(frame: InterruptStackFrame) {
    panic!("invalid opcode at {:?}", frame.instruction_pointer);
}

extern "x86-interrupt" fn general_protection_fault_handler(
    frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!(
        "general protection fault (error {:#x}) at {:?}",
        error_code, frame.instruction_pointer
    );
}

extern "x86-interrupt" fn page_fault_handler(
    frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;

    // CR2 holds the faulting address; a non-canonical value means the
    // machine state is beyond repair anyway.
    let fault_addr = Cr2::read().ok();
    panic!(
        "page fault at {:?} (error {:?}, ip {:?})",
        fault_addr, error_code, frame.instruction_pointer
    );
}

extern "x86-interrupt" fn segment_not_present_handler(frame: InterruptStackFrame, error_code: u64) {
    panic!(
        "segment not present (error {:#x}) at {:?}",
        error_code, frame.instruction_pointer
    );
}

extern "x86-interrupt" fn stack_segment_fault_handler(frame: InterruptStackFrame, error_code: u64) {
    panic!(
        "stack segment fault (error {:#x}) at {:?}",
        error_code, frame.instruction_pointer
    );
}

extern "x86-interrupt" fn double_fault_handler(frame: InterruptStackFrame, _error_code: u64) -> ! {
    panic!("double fault\n{:#?}", frame);
}

extern "x86-interrupt" fn unexpected_interrupt_handler(frame: InterruptStackFrame) {
    panic!("unexpected interrupt at {:?}", frame.instruction_pointer);
}

extern "x86-interrupt" fn spurious_interrupt_handler(_frame: InterruptStackFrame) {
    // No EOI: the PIC does not consider a spurious vector in service.
}
