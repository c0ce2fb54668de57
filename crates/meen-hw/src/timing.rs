use crate::interrupt::rst;
use crate::SourceId;

/// CPU clock of the i8080 arcade boards.
pub const I8080_ARCADE_CLOCK_HZ: u64 = 2_000_000;

/// Video refresh rate of the i8080 arcade boards.
pub const I8080_ARCADE_REFRESH_HZ: u64 = 60;

/// Whole emulated cycles in one period of a `rate_hz` signal at `clock_hz`.
///
/// Returns zero for a zero rate.
#[must_use]
pub const fn cycles_per_interval(clock_hz: u64, rate_hz: u64) -> u64 {
    if rate_hz == 0 {
        0
    } else {
        clock_hz / rate_hz
    }
}

/// Cycles per video frame.
pub const FRAME_CYCLES: u64 = cycles_per_interval(I8080_ARCADE_CLOCK_HZ, I8080_ARCADE_REFRESH_HZ);

/// Cycles from the top of the frame to the mid-screen interrupt.
pub const HALF_FRAME_CYCLES: u64 = FRAME_CYCLES / 2;

/// One periodic screen interrupt of the arcade video timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenInterrupt {
    /// Controller source identifier.
    pub source: SourceId,
    /// `RST` opcode delivered to the CPU.
    pub vector: u8,
    /// Cycle of the first occurrence after power-on.
    pub first_deadline: u64,
    /// Cycles between occurrences.
    pub period: u64,
}

/// Screen interrupts in priority order: `RST 1` when the beam reaches the
/// middle of the screen, `RST 2` at vertical blank. Both repeat once per
/// frame, half a frame apart, so the CPU sees them alternate.
pub const ARCADE_SCREEN_INTERRUPTS: [ScreenInterrupt; 2] = [
    ScreenInterrupt {
        source: SourceId::new(1),
        vector: rst(1),
        first_deadline: HALF_FRAME_CYCLES,
        period: FRAME_CYCLES,
    },
    ScreenInterrupt {
        source: SourceId::new(2),
        vector: rst(2),
        first_deadline: FRAME_CYCLES,
        period: FRAME_CYCLES,
    },
];
