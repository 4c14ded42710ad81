/*
 * 8259 Programmable Interrupt Controller
 *
 * The two cascaded PICs are remapped so that hardware IRQs land on vectors
 * 0x20..0x2F, clear of the CPU exception range. Only the timer line (IRQ 0)
 * is unmasked; this kernel has no other interrupt-driven devices.
 */

use pic8259::ChainedPics;
use spin::Mutex;

/// First vector of the primary PIC after remapping.
pub const PIC_1_OFFSET: u8 = 0x20;
/// First vector of the secondary PIC after remapping.
pub const PIC_2_OFFSET: u8 = 0x28;

/// Vector taken by the timer (IRQ 0).
pub const TIMER_VECTOR: u8 = PIC_1_OFFSET;

/// Spurious vectors raised by the PICs themselves (IRQ 7 and IRQ 15).
pub const SPURIOUS_PIC1_VECTOR: u8 = PIC_1_OFFSET + 7;
pub const SPURIOUS_PIC2_VECTOR: u8 = PIC_2_OFFSET + 7;

static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Remap the PICs and mask everything except the timer line.
pub fn init() {
    let mut pics = PICS.lock();
    unsafe {
        pics.initialize();
        // Bit set = masked. IRQ 0 on the primary stays open; the cascade
        // line and everything on the secondary are shut.
        pics.write_masks(0b1111_1110, 0b1111_1111);
    }
    log::info!("PIC remapped to {:#x}/{:#x}, timer unmasked", PIC_1_OFFSET, PIC_2_OFFSET);
}
