/*
 * 8254 Programmable Interval Timer
 *
 * Channel 0 is programmed in rate-generator mode to fire IRQ 0 at the
 * kernel's tick frequency. The tick is the unit of all scheduling time.
 */

use x86_64::instructions::port::Port;

/// Base oscillator frequency of the PIT in Hz.
const PIT_HZ: u32 = 1_193_182;

const CHANNEL0_DATA: u16 = 0x40;
const MODE_COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte access, mode 2 (rate generator), binary.
const RATE_GENERATOR: u8 = 0b0011_0100;

/// Program channel 0 to interrupt `frequency` times per second.
pub fn init(frequency: u32) {
    assert!(frequency > 0, "timer frequency must be positive");
    let divisor = PIT_HZ / frequency;
    assert!(divisor <= u16::MAX as u32, "timer frequency too low for the PIT");

    let mut command: Port<u8> = Port::new(MODE_COMMAND);
    let mut data: Port<u8> = Port::new(CHANNEL0_DATA);
    unsafe {
        command.write(RATE_GENERATOR);
        data.write((divisor & 0xFF) as u8);
        data.write((divisor >> 8) as u8);
    }
    log::info!("PIT channel 0 programmed to {} Hz", frequency);
}
