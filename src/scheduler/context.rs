/*
 * Execution Frames
 *
 * Every context switch in this kernel is interrupt-shaped: the CPU pushes
 * an interrupt frame, the naked entry routine pushes the general-purpose
 * registers, and the combination, a `SwitchFrame`, is the complete
 * execution context of the interrupted thread. Switching means returning
 * a pointer to a different thread's frame and letting the pops plus
 * `iretq` reconstitute it.
 *
 * A frame stored in a thread's control block doubles as the miniature
 * stack the restore path pops from; `iretq` then reloads the real stack
 * pointer from the embedded interrupt frame.
 */

/// The portion the CPU pushes automatically on interrupt entry.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Kernel code segment selector (second GDT descriptor).
const KERNEL_CS: u64 = 0x08;
/// Kernel data segment selector (third GDT descriptor).
const KERNEL_SS: u64 = 0x10;
/// RFLAGS with the interrupt flag set and the always-one bit.
const RFLAGS_IF: u64 = 0x202;

impl Default for InterruptFrame {
    fn default() -> Self {
        Self {
            rip: 0,
            cs: KERNEL_CS,
            rflags: RFLAGS_IF,
            rsp: 0,
            ss: KERNEL_SS,
        }
    }
}

/// Complete saved execution context: the general-purpose registers in the
/// order the naked entry routines push them, then the interrupt frame.
///
/// The field order is the restore order; it must match the `pop` sequence
/// in the switch entries exactly.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SwitchFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub iret: InterruptFrame,
}

impl SwitchFrame {
    /// Build the frame a brand-new thread first resumes from.
    ///
    /// The thread "returns" into `rip` with interrupts enabled, its stack
    /// pointer at the top of its page, and `arg0`/`arg1` in the first two
    /// argument registers.
    pub fn initial(rip: u64, stack_top: u64, arg0: u64, arg1: u64) -> Self {
        let mut frame = SwitchFrame::default();
        frame.iret.rip = rip;
        // Entered by jump rather than call: offset the stack as if a
        // return address had been pushed, keeping the C ABI's alignment.
        frame.iret.rsp = stack_top - 8;
        frame.rdi = arg0;
        frame.rsi = arg1;
        frame
    }
}
