//! Device capability and the built-in peripheral set.
//!
//! A device only ever touches its own registers. Elapsed time comes in through
//! [`Device::tick`] and interrupt requests go out as its return value; nothing
//! here calls back into the machine.

/// Generic RAM / ROM window.
pub mod memory;
/// Interval timer with a read-as-clear status register.
pub mod timer;
/// DIP-switch and input-port bank.
pub mod switches;

/// Bit-shifter used by the arcade sprite hardware.
#[cfg(feature = "i8080-arcade")]
pub mod shifter;
/// Edge-triggered sound-effect latch.
#[cfg(feature = "i8080-arcade")]
pub mod sound;
/// Watchdog counter.
#[cfg(feature = "i8080-arcade")]
pub mod watchdog;

pub use memory::{MemoryWindow, MEMORY_WINDOW_CAPACITY};
pub use switches::SwitchBank;
pub use timer::IntervalTimer;

#[cfg(feature = "i8080-arcade")]
pub use shifter::ShiftRegister;
#[cfg(feature = "i8080-arcade")]
pub use sound::SoundLatch;
#[cfg(feature = "i8080-arcade")]
pub use watchdog::Watchdog;

use crate::SourceId;

/// Slot of a device inside a machine's device arena.
///
/// Map tables hold ids rather than references, so one device can be reachable
/// from both memory and port space without shared ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct DeviceId(u8);

impl DeviceId {
    /// Id of the arena slot `index`.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        Self(index)
    }

    /// Arena slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Operations every peripheral provides to the bus.
///
/// Offsets passed to `read` and `write` are always below [`Device::width`];
/// bindings are checked against the width when a machine is built.
pub trait Device {
    /// Number of addressable bytes (registers or storage).
    fn width(&self) -> u16;

    /// Reads the byte at `offset`.
    ///
    /// Reads have no side effects unless a device documents a read-as-clear
    /// register.
    fn read(&mut self, offset: u16) -> u8;

    /// Writes `value` at `offset`.
    fn write(&mut self, offset: u16, value: u8);

    /// Sets the power-on value at `offset`. Unlike [`Device::write`] this must
    /// not trigger anything the CPU would observe as an event.
    fn preload(&mut self, offset: u16, value: u8) {
        self.write(offset, value);
    }

    /// Advances device time by `elapsed_cycles` and returns the interrupt
    /// source the device raised during that span, if any.
    fn tick(&mut self, elapsed_cycles: u64) -> Option<SourceId> {
        let _ = elapsed_cycles;
        None
    }

    /// Interrupt source this device can raise.
    fn interrupt_source(&self) -> Option<SourceId> {
        None
    }
}

/// Closed set of devices a machine can own.
///
/// Dispatch is a `match`, so a fixed device set costs no indirect calls on the
/// bare-metal target.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Peripheral {
    /// RAM or ROM window.
    Memory(MemoryWindow),
    /// Switch bank / input port.
    Switches(SwitchBank),
    /// Programmable interval timer.
    Timer(IntervalTimer),
    /// Arcade bit-shifter.
    #[cfg(feature = "i8080-arcade")]
    Shifter(ShiftRegister),
    /// Arcade sound latch.
    #[cfg(feature = "i8080-arcade")]
    Sound(SoundLatch),
    /// Arcade watchdog.
    #[cfg(feature = "i8080-arcade")]
    Watchdog(Watchdog),
}

macro_rules! dispatch {
    ($self:expr, $device:ident => $body:expr) => {
        match $self {
            Peripheral::Memory($device) => $body,
            Peripheral::Switches($device) => $body,
            Peripheral::Timer($device) => $body,
            #[cfg(feature = "i8080-arcade")]
            Peripheral::Shifter($device) => $body,
            #[cfg(feature = "i8080-arcade")]
            Peripheral::Sound($device) => $body,
            #[cfg(feature = "i8080-arcade")]
            Peripheral::Watchdog($device) => $body,
        }
    };
}

impl Peripheral {
    /// Short lowercase name of the device kind, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Switches(_) => "switches",
            Self::Timer(_) => "timer",
            #[cfg(feature = "i8080-arcade")]
            Self::Shifter(_) => "shift-register",
            #[cfg(feature = "i8080-arcade")]
            Self::Sound(_) => "sound-latch",
            #[cfg(feature = "i8080-arcade")]
            Self::Watchdog(_) => "watchdog",
        }
    }
}

impl Device for Peripheral {
    fn width(&self) -> u16 {
        dispatch!(self, device => device.width())
    }

    fn read(&mut self, offset: u16) -> u8 {
        dispatch!(self, device => device.read(offset))
    }

    fn write(&mut self, offset: u16, value: u8) {
        dispatch!(self, device => device.write(offset, value));
    }

    fn preload(&mut self, offset: u16, value: u8) {
        dispatch!(self, device => device.preload(offset, value));
    }

    fn tick(&mut self, elapsed_cycles: u64) -> Option<SourceId> {
        dispatch!(self, device => device.tick(elapsed_cycles))
    }

    fn interrupt_source(&self) -> Option<SourceId> {
        dispatch!(self, device => device.interrupt_source())
    }
}

impl From<MemoryWindow> for Peripheral {
    fn from(device: MemoryWindow) -> Self {
        Self::Memory(device)
    }
}

impl From<SwitchBank> for Peripheral {
    fn from(device: SwitchBank) -> Self {
        Self::Switches(device)
    }
}

impl From<IntervalTimer> for Peripheral {
    fn from(device: IntervalTimer) -> Self {
        Self::Timer(device)
    }
}

#[cfg(feature = "i8080-arcade")]
impl From<ShiftRegister> for Peripheral {
    fn from(device: ShiftRegister) -> Self {
        Self::Shifter(device)
    }
}

#[cfg(feature = "i8080-arcade")]
impl From<SoundLatch> for Peripheral {
    fn from(device: SoundLatch) -> Self {
        Self::Sound(device)
    }
}

#[cfg(feature = "i8080-arcade")]
impl From<Watchdog> for Peripheral {
    fn from(device: Watchdog) -> Self {
        Self::Watchdog(device)
    }
}
