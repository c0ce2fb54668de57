//! Hardware peripherals for i8080-class machine emulation.
//!
//! `meen_hw` is the half of an emulator that sits on the far side of the
//! CPU's bus: memory and port routing, peripheral devices, and interrupt
//! timing driven by emulated cycles. The CPU core calls [`Machine::read`] and
//! [`Machine::write`] for each bus transaction, [`Machine::tick`] after each
//! instruction, and [`Machine::acknowledge_interrupt`] when it takes one.
//!
//! Without the `std` feature the crate is `no_std` and never allocates; the
//! `alloc` feature adds the [`config`] loader.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

/// Device capability and built-in peripherals.
pub mod device;
pub use device::{Device, DeviceId, IntervalTimer, MemoryWindow, Peripheral, SwitchBank};
#[cfg(feature = "i8080-arcade")]
pub use device::{ShiftRegister, SoundLatch, Watchdog};

/// Memory and port routing tables.
pub mod map;
pub use map::{Access, AccessMode, AddressSpace, MemoryMap, PortMap};

/// Interrupt controller.
pub mod interrupt;
pub use interrupt::{
    InterruptController, InterruptRequest, InterruptSource, SourceId, SourceState,
    MAX_INTERRUPT_SOURCES,
};

/// The hardware aggregate.
pub mod machine;
pub use machine::{Machine, MachineBuilder, MAX_DEVICES};

/// Error types for binding, bus access, interrupts and configuration.
pub mod fault;
pub use fault::{AccessError, BindError, ConfigError, InterruptError};

/// Arcade clock and screen-interrupt timing.
pub mod timing;
pub use timing::{FRAME_CYCLES, HALF_FRAME_CYCLES, I8080_ARCADE_CLOCK_HZ};

#[cfg(feature = "alloc")]
pub mod config;
#[cfg(feature = "alloc")]
pub use config::{
    BindingDescription, DeviceDescription, DeviceKind, InterruptDescription, MachineDescription,
};

/// Crate version string.
#[must_use]
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
use env_logger as _;
#[cfg(test)]
use proptest as _;
