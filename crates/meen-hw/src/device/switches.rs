use crate::Device;

/// One byte of switches or input lines, read by the CPU through a port.
///
/// The host flips bits (coin, start, fire, DIP settings) with [`Self::press`]
/// and [`Self::release`]; a CPU write, if the binding allows it, overwrites the
/// whole byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwitchBank {
    value: u8,
}

impl SwitchBank {
    /// Bank powered up with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// Current switch byte.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }

    /// Replaces the whole switch byte.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set(&mut self, value: u8) {
        self.value = value;
    }

    /// Sets the bits in `mask`.
    #[allow(clippy::missing_const_for_fn)]
    pub fn press(&mut self, mask: u8) {
        self.value |= mask;
    }

    /// Clears the bits in `mask`.
    #[allow(clippy::missing_const_for_fn)]
    pub fn release(&mut self, mask: u8) {
        self.value &= !mask;
    }
}

impl Device for SwitchBank {
    fn width(&self) -> u16 {
        1
    }

    fn read(&mut self, _offset: u16) -> u8 {
        self.value
    }

    fn write(&mut self, _offset: u16, value: u8) {
        self.value = value;
    }
}
