use crate::{Device, SourceId};

/// Reload value, low byte.
pub const TIMER_RELOAD_LO: u16 = 0;
/// Reload value, high byte.
pub const TIMER_RELOAD_HI: u16 = 1;
/// Control register: bit 0 enable, bit 1 periodic.
pub const TIMER_CONTROL: u16 = 2;
/// Status register: bit 0 expired. Clears on read.
pub const TIMER_STATUS: u16 = 3;

/// Control bit that starts the countdown.
pub const TIMER_ENABLE: u8 = 0x01;
/// Control bit that reloads the counter on expiry instead of stopping.
pub const TIMER_PERIODIC: u8 = 0x02;
/// Status bit set on expiry.
pub const TIMER_EXPIRED: u8 = 0x01;

/// Programmable countdown timer.
///
/// The counter runs for `reload * prescale` cycles. Writing the control
/// register with the enable bit restarts it. On expiry the timer sets
/// [`TIMER_EXPIRED`] and raises its source; a periodic timer keeps its phase
/// when a single tick overshoots the deadline.
///
/// Reading [`TIMER_STATUS`] clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    source: SourceId,
    prescale: u32,
    reload: u16,
    control: u8,
    status: u8,
    remaining: u64,
}

impl IntervalTimer {
    /// Stopped timer raising `source`, counting one step per `prescale`
    /// cycles (zero is treated as one).
    #[must_use]
    pub const fn new(source: SourceId, prescale: u32) -> Self {
        Self {
            source,
            prescale: if prescale == 0 { 1 } else { prescale },
            reload: 0,
            control: 0,
            status: 0,
            remaining: 0,
        }
    }

    /// Length of one countdown in cycles.
    #[must_use]
    pub const fn period_cycles(&self) -> u64 {
        self.reload as u64 * self.prescale as u64
    }

    /// Cycles left before the next expiry.
    #[must_use]
    pub const fn remaining_cycles(&self) -> u64 {
        self.remaining
    }

    /// Whether the countdown is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.control & TIMER_ENABLE != 0
    }
}

impl Device for IntervalTimer {
    fn width(&self) -> u16 {
        4
    }

    fn read(&mut self, offset: u16) -> u8 {
        let [lo, hi] = self.reload.to_le_bytes();
        match offset {
            TIMER_RELOAD_LO => lo,
            TIMER_RELOAD_HI => hi,
            TIMER_CONTROL => self.control,
            _ => core::mem::take(&mut self.status),
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        let [lo, hi] = self.reload.to_le_bytes();
        match offset {
            TIMER_RELOAD_LO => self.reload = u16::from_le_bytes([value, hi]),
            TIMER_RELOAD_HI => self.reload = u16::from_le_bytes([lo, value]),
            TIMER_CONTROL => {
                self.control = value & (TIMER_ENABLE | TIMER_PERIODIC);
                self.remaining = if self.is_running() {
                    self.period_cycles()
                } else {
                    0
                };
            }
            _ => {}
        }
    }

    fn tick(&mut self, elapsed_cycles: u64) -> Option<SourceId> {
        let period = self.period_cycles();
        if !self.is_running() || period == 0 {
            return None;
        }

        if elapsed_cycles < self.remaining {
            self.remaining -= elapsed_cycles;
            return None;
        }

        let overshoot = elapsed_cycles - self.remaining;
        self.status |= TIMER_EXPIRED;
        if self.control & TIMER_PERIODIC == 0 {
            self.control &= !TIMER_ENABLE;
            self.remaining = 0;
        } else {
            self.remaining = period - overshoot % period;
        }
        Some(self.source)
    }

    fn interrupt_source(&self) -> Option<SourceId> {
        Some(self.source)
    }
}
