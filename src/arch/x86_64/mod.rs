/*
 * x86_64 Platform Support
 *
 * Submodules:
 * - gdt:        segment descriptors and the double-fault IST stack
 * - idt:        interrupt descriptor table and exception handlers
 * - interrupts: the interrupt-disable discipline used by every critical section
 * - pic:        legacy 8259 programmable interrupt controller
 * - pit:        8254 programmable interval timer (the tick source)
 * - serial:     16550 UART console used by the logger
 */

pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod pic;
pub mod pit;
pub mod serial;
