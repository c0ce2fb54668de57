use crate::Device;

/// Latched output byte, as last written by the CPU.
pub const SOUND_LATCH: u16 = 0;
/// Effects triggered since the last read. Clears on read.
pub const SOUND_TRIGGERED: u16 = 1;

/// Output latch driving discrete sound-effect circuits.
///
/// A bit going from 0 to 1 triggers its effect once. Bits in the repeat mask
/// (the UFO loop on the arcade boards) trigger on every write while held and
/// one final time on the write that releases them. Triggered bits collect
/// until the host drains them with [`Self::take_triggered`] or a read of
/// [`SOUND_TRIGGERED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoundLatch {
    latch: u8,
    repeat_mask: u8,
    triggered: u8,
}

impl SoundLatch {
    /// Silent latch with the given repeating bits.
    #[must_use]
    pub const fn new(repeat_mask: u8) -> Self {
        Self {
            latch: 0,
            repeat_mask,
            triggered: 0,
        }
    }

    /// Last byte the CPU wrote.
    #[must_use]
    pub const fn latch(&self) -> u8 {
        self.latch
    }

    /// Returns and clears the effects triggered since the previous drain.
    pub fn take_triggered(&mut self) -> u8 {
        core::mem::take(&mut self.triggered)
    }
}

impl Device for SoundLatch {
    fn width(&self) -> u16 {
        2
    }

    fn read(&mut self, offset: u16) -> u8 {
        match offset {
            SOUND_LATCH => self.latch,
            _ => self.take_triggered(),
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        if offset != SOUND_LATCH {
            return;
        }
        let rising = value & !self.latch;
        let repeating = (value | self.latch) & self.repeat_mask;
        self.triggered |= rising | repeating;
        self.latch = value;
    }

    fn preload(&mut self, offset: u16, value: u8) {
        if offset == SOUND_LATCH {
            self.latch = value;
        }
    }
}
