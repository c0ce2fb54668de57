use crate::Device;

/// Shift amount register (write: low three bits).
pub const SHIFT_AMOUNT: u16 = 0;
/// Shifted result register (read).
pub const SHIFT_RESULT: u16 = 1;
/// Shift data register (write: pushes a byte into the high half).
pub const SHIFT_DATA: u16 = 2;

/// Dedicated 16-bit barrel shifter of the i8080 arcade boards.
///
/// Each data write moves the previous high byte down and loads the new byte
/// on top. The result register returns the eight bits that start `amount`
/// bits below the top of the 16-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftRegister {
    data: u16,
    amount: u8,
}

impl ShiftRegister {
    /// Cleared shifter.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: 0, amount: 0 }
    }

    /// Current 16-bit contents.
    #[must_use]
    pub const fn data(&self) -> u16 {
        self.data
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn result(&self) -> u8 {
        (self.data >> (8 - self.amount)) as u8
    }
}

impl Device for ShiftRegister {
    fn width(&self) -> u16 {
        3
    }

    fn read(&mut self, offset: u16) -> u8 {
        match offset {
            SHIFT_AMOUNT => self.amount,
            SHIFT_RESULT => self.result(),
            _ => self.data.to_be_bytes()[0],
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            SHIFT_AMOUNT => self.amount = value & 0x07,
            SHIFT_DATA => self.data = (self.data >> 8) | (u16::from(value) << 8),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ShiftRegister, SHIFT_AMOUNT, SHIFT_DATA, SHIFT_RESULT};
    use crate::Device;

    #[test]
    fn data_writes_push_bytes_from_the_top() {
        let mut shifter = ShiftRegister::new();
        shifter.write(SHIFT_DATA, 0xAB);
        shifter.write(SHIFT_DATA, 0xCD);
        assert_eq!(shifter.data(), 0xCDAB);
        assert_eq!(shifter.read(SHIFT_DATA), 0xCD);
    }

    #[test]
    fn result_walks_bits_down_from_the_high_byte() {
        let mut shifter = ShiftRegister::new();
        shifter.write(SHIFT_DATA, 0xFF);
        shifter.write(SHIFT_DATA, 0x00);

        for amount in 0_u8..8 {
            shifter.write(SHIFT_AMOUNT, amount);
            assert_eq!(shifter.read(SHIFT_RESULT), (1_u8 << amount).wrapping_sub(1));
        }
    }

    #[test]
    fn amount_keeps_only_three_bits() {
        let mut shifter = ShiftRegister::new();
        shifter.write(SHIFT_AMOUNT, 0xFB);
        assert_eq!(shifter.read(SHIFT_AMOUNT), 0x03);
    }
}
