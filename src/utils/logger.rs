/*
 * Kernel Logging
 *
 * Backend for the `log` facade: records go to the serial console with
 * their level. The serial writer already disables interrupts per line, so
 * log calls are safe from any thread.
 */

use log::{Level, LevelFilter, Metadata, Record};

use crate::serial_println;

struct SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            serial_println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Install the logger. Must run after the serial port works.
pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LevelFilter::Info))
        .expect("logger already installed");
}
