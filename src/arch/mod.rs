/*
 * Architecture-Specific Code
 *
 * Everything that touches the CPU or the legacy PC platform directly lives
 * under this module. The rest of the kernel goes through the interfaces
 * exported here and stays architecture-neutral.
 */

pub mod x86_64;
