use crate::{Device, SourceId};

/// Watchdog counter that must be serviced by the running program.
///
/// Any read or write restarts the count. If `timeout` cycles pass without
/// service the watchdog raises its source and starts counting again. A zero
/// timeout disables it; the arcade boards ship that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchdog {
    source: SourceId,
    timeout: u64,
    elapsed: u64,
}

impl Watchdog {
    /// Watchdog raising `source` after `timeout` unserviced cycles.
    #[must_use]
    pub const fn new(source: SourceId, timeout: u64) -> Self {
        Self {
            source,
            timeout,
            elapsed: 0,
        }
    }

    /// Cycles since the last service.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.elapsed
    }
}

impl Device for Watchdog {
    fn width(&self) -> u16 {
        1
    }

    /// Servicing read: restarts the count and returns zero.
    fn read(&mut self, _offset: u16) -> u8 {
        self.elapsed = 0;
        0
    }

    fn write(&mut self, _offset: u16, _value: u8) {
        self.elapsed = 0;
    }

    fn tick(&mut self, elapsed_cycles: u64) -> Option<SourceId> {
        if self.timeout == 0 {
            return None;
        }
        self.elapsed = self.elapsed.saturating_add(elapsed_cycles);
        if self.elapsed < self.timeout {
            return None;
        }
        self.elapsed %= self.timeout;
        Some(self.source)
    }

    fn interrupt_source(&self) -> Option<SourceId> {
        (self.timeout != 0).then_some(self.source)
    }
}
