//! Interrupt sources, their deadlines, and priority selection.
//!
//! Each source walks `Disarmed -> Armed -> Due -> Acknowledged` and, when it
//! has a period, straight back to `Armed`. Periodic deadlines advance from the
//! previous deadline rather than from the acknowledgement cycle, so late
//! acknowledgement never shifts the phase of a vertical-blank style timer.
//!
//! A device raise only makes a source due; it never moves a pending deadline.
//! An armed source that was raised goes back to waiting for its deadline once
//! acknowledged.

use core::fmt;

use log::{trace, warn};

use crate::InterruptError;

/// Number of interrupt sources a controller can hold (one per `RST` line).
pub const MAX_INTERRUPT_SOURCES: usize = 8;

/// Returns the `RST n` opcode the CPU executes to service line `n`.
#[must_use]
pub const fn rst(n: u8) -> u8 {
    0xC7 | ((n & 0x07) << 3)
}

/// Interrupt source identifier; lower identifiers win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct SourceId(u8);

impl SourceId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of one interrupt source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceState {
    /// Not counting toward any deadline.
    #[default]
    Disarmed,
    /// Waiting for its deadline.
    Armed,
    /// Deadline elapsed or raised by a device; waiting for the CPU.
    Due,
    /// Serviced and not re-armed.
    Acknowledged,
}

/// Why a source is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Trigger {
    Deadline,
    Raised,
    RaisedWhileArmed,
}

/// Interrupt the CPU should service next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptRequest {
    /// Source that is due.
    pub source: SourceId,
    /// Opcode to place on the data bus during the acknowledge cycle.
    pub vector: u8,
}

/// One registered interrupt source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterruptSource {
    id: SourceId,
    vector: u8,
    period: Option<u64>,
    enabled: bool,
    state: SourceState,
    deadline: u64,
    trigger: Trigger,
}

impl InterruptSource {
    /// Source identifier.
    #[must_use]
    pub const fn id(&self) -> SourceId {
        self.id
    }

    /// Vector opcode handed back to the CPU.
    #[must_use]
    pub const fn vector(&self) -> u8 {
        self.vector
    }

    /// Auto-rearm period in cycles, if periodic.
    #[must_use]
    pub const fn period(&self) -> Option<u64> {
        self.period
    }

    /// Whether the source may become due.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SourceState {
        self.state
    }

    /// Absolute cycle count of the current or most recent deadline.
    #[must_use]
    pub const fn deadline(&self) -> u64 {
        self.deadline
    }
}

/// Deadline bookkeeping for every interrupt source of one machine.
#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    sources: [Option<InterruptSource>; MAX_INTERRUPT_SOURCES],
    now: u64,
}

impl InterruptController {
    /// Creates a controller with no sources at cycle zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sources: [None; MAX_INTERRUPT_SOURCES],
            now: 0,
        }
    }

    /// Accumulated emulated cycles.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Returns the registered source `id`, if any.
    #[must_use]
    pub fn source(&self, id: SourceId) -> Option<&InterruptSource> {
        self.sources.get(id.slot()).and_then(Option::as_ref)
    }

    /// Registered sources in priority order.
    pub fn sources(&self) -> impl Iterator<Item = &InterruptSource> {
        self.sources.iter().flatten()
    }

    /// Declares a source. It starts disarmed and enabled.
    ///
    /// # Errors
    ///
    /// [`InterruptError::SourceOutOfRange`], [`InterruptError::DuplicateSource`]
    /// or [`InterruptError::ZeroPeriod`].
    pub fn register(
        &mut self,
        id: SourceId,
        vector: u8,
        period: Option<u64>,
    ) -> Result<(), InterruptError> {
        let slot = self
            .sources
            .get_mut(id.slot())
            .ok_or(InterruptError::SourceOutOfRange(id))?;
        if slot.is_some() {
            return Err(InterruptError::DuplicateSource(id));
        }
        if period == Some(0) {
            return Err(InterruptError::ZeroPeriod(id));
        }

        *slot = Some(InterruptSource {
            id,
            vector,
            period,
            enabled: true,
            state: SourceState::Disarmed,
            deadline: 0,
            trigger: Trigger::Deadline,
        });
        Ok(())
    }

    /// Arms `id` to fire `deadline_cycles` from now.
    ///
    /// # Errors
    ///
    /// [`InterruptError::UnknownSource`], or
    /// [`InterruptError::InvalidTransition`] unless the source is disarmed or
    /// acknowledged.
    pub fn arm(&mut self, id: SourceId, deadline_cycles: u64) -> Result<(), InterruptError> {
        let now = self.now;
        let source = self.source_mut(id)?;
        match source.state {
            SourceState::Disarmed | SourceState::Acknowledged => {
                source.enabled = true;
                source.state = SourceState::Armed;
                source.deadline = now.saturating_add(deadline_cycles);
                trace!("irq {id} armed for cycle {}", source.deadline);
                Ok(())
            }
            state @ (SourceState::Armed | SourceState::Due) => {
                Err(InterruptError::InvalidTransition { id, state })
            }
        }
    }

    /// Moves the clock forward and marks every elapsed armed source due.
    pub fn advance(&mut self, elapsed_cycles: u64) {
        self.now = self.now.saturating_add(elapsed_cycles);
        let now = self.now;
        for source in self.sources.iter_mut().flatten() {
            if source.state == SourceState::Armed && source.deadline <= now {
                source.state = SourceState::Due;
                source.trigger = Trigger::Deadline;
                trace!("irq {} due at cycle {now}", source.id);
            }
        }
    }

    /// Marks `id` due on behalf of a device. Disabled sources drop the request
    /// and a source that is already due absorbs it. The deadline is untouched.
    ///
    /// # Errors
    ///
    /// [`InterruptError::UnknownSource`] when `id` is not registered.
    pub fn raise(&mut self, id: SourceId) -> Result<(), InterruptError> {
        let now = self.now;
        let source = self.source_mut(id)?;
        if !source.enabled {
            warn!("irq {id} raised while disabled; request dropped");
            return Ok(());
        }
        source.trigger = match source.state {
            SourceState::Due => return Ok(()),
            SourceState::Armed => Trigger::RaisedWhileArmed,
            SourceState::Disarmed | SourceState::Acknowledged => Trigger::Raised,
        };
        source.state = SourceState::Due;
        trace!("irq {id} raised at cycle {now}");
        Ok(())
    }

    /// Highest-priority due source. Does not change any state.
    #[must_use]
    pub fn next_due(&self) -> Option<InterruptRequest> {
        self.sources()
            .find(|source| source.state == SourceState::Due)
            .map(|source| InterruptRequest {
                source: source.id,
                vector: source.vector,
            })
    }

    /// Services `id`.
    ///
    /// A source that came due on its deadline re-arms one period after that
    /// deadline when periodic. A source raised while armed returns to its
    /// pending deadline. A periodic source raised while idle arms one period
    /// from now.
    ///
    /// # Errors
    ///
    /// [`InterruptError::UnknownSource`], or
    /// [`InterruptError::InvalidTransition`] when the source is not due.
    pub fn acknowledge(&mut self, id: SourceId) -> Result<(), InterruptError> {
        let now = self.now;
        let source = self.source_mut(id)?;
        if source.state != SourceState::Due {
            return Err(InterruptError::InvalidTransition {
                id,
                state: source.state,
            });
        }

        source.state = SourceState::Acknowledged;
        if !source.enabled {
            return Ok(());
        }
        let deadline = match (source.trigger, source.period) {
            (Trigger::RaisedWhileArmed, _) => source.deadline,
            (Trigger::Deadline, Some(period)) => source.deadline.saturating_add(period),
            (Trigger::Raised, Some(period)) => now.saturating_add(period),
            (Trigger::Deadline | Trigger::Raised, None) => return Ok(()),
        };
        source.deadline = deadline;
        source.state = SourceState::Armed;
        trace!("irq {id} re-armed for cycle {deadline}");
        Ok(())
    }

    /// Disarms `id` and suppresses automatic re-arming.
    ///
    /// # Errors
    ///
    /// [`InterruptError::UnknownSource`] when `id` is not registered.
    pub fn disable(&mut self, id: SourceId) -> Result<(), InterruptError> {
        let source = self.source_mut(id)?;
        source.enabled = false;
        source.state = SourceState::Disarmed;
        Ok(())
    }

    /// Allows `id` to become due again; it still needs [`Self::arm`] to count.
    ///
    /// # Errors
    ///
    /// [`InterruptError::UnknownSource`] when `id` is not registered.
    pub fn enable(&mut self, id: SourceId) -> Result<(), InterruptError> {
        self.source_mut(id)?.enabled = true;
        Ok(())
    }

    fn source_mut(&mut self, id: SourceId) -> Result<&mut InterruptSource, InterruptError> {
        self.sources
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(InterruptError::UnknownSource(id))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        rst, InterruptController, InterruptRequest, SourceId, SourceState,
        MAX_INTERRUPT_SOURCES,
    };
    use crate::InterruptError;

    const VBLANK: SourceId = SourceId::new(1);
    const MID_SCREEN: SourceId = SourceId::new(2);

    fn periodic(period: u64) -> InterruptController {
        let mut irq = InterruptController::new();
        irq.register(VBLANK, rst(1), Some(period))
            .expect("registers");
        irq
    }

    #[rstest]
    #[case(0, 0xC7)]
    #[case(1, 0xCF)]
    #[case(2, 0xD7)]
    #[case(7, 0xFF)]
    fn rst_opcodes_match_i8080_encoding(#[case] line: u8, #[case] opcode: u8) {
        assert_eq!(rst(line), opcode);
    }

    #[test]
    fn armed_source_becomes_due_exactly_at_deadline() {
        let mut irq = periodic(16_667);
        irq.arm(VBLANK, 16_667).expect("arms");

        irq.advance(16_666);
        assert_eq!(irq.next_due(), None);

        irq.advance(1);
        assert_eq!(
            irq.next_due(),
            Some(InterruptRequest {
                source: VBLANK,
                vector: 0xCF
            })
        );
    }

    #[test]
    fn acknowledge_rearms_relative_to_previous_deadline() {
        let mut irq = periodic(16_667);
        irq.arm(VBLANK, 16_667).expect("arms");
        irq.advance(16_667);
        irq.acknowledge(VBLANK).expect("acknowledges");

        let source = irq.source(VBLANK).expect("registered");
        assert_eq!(source.state(), SourceState::Armed);
        assert_eq!(source.deadline(), 16_667 * 2);
    }

    #[test]
    fn late_acknowledgement_does_not_drift() {
        let mut irq = periodic(1_000);
        irq.arm(VBLANK, 1_000).expect("arms");

        irq.advance(1_750);
        irq.acknowledge(VBLANK).expect("acknowledges");
        assert_eq!(irq.source(VBLANK).map(|s| s.deadline()), Some(2_000));

        irq.advance(250);
        assert!(irq.next_due().is_some());
    }

    #[test]
    fn next_due_is_pure_and_prefers_lower_identifier() {
        let mut irq = InterruptController::new();
        irq.register(MID_SCREEN, rst(2), None).expect("registers");
        irq.register(VBLANK, rst(1), None).expect("registers");
        irq.arm(VBLANK, 10).expect("arms");
        irq.arm(MID_SCREEN, 10).expect("arms");
        irq.advance(10);

        assert_eq!(irq.next_due().map(|r| r.source), Some(VBLANK));
        assert_eq!(irq.next_due().map(|r| r.source), Some(VBLANK));

        irq.acknowledge(VBLANK).expect("acknowledges");
        assert_eq!(irq.next_due().map(|r| r.source), Some(MID_SCREEN));
        assert_eq!(
            irq.source(VBLANK).map(|s| s.state()),
            Some(SourceState::Acknowledged)
        );
    }

    #[test]
    fn disabled_source_neither_rearms_nor_accepts_raises() {
        let mut irq = periodic(100);
        irq.arm(VBLANK, 100).expect("arms");
        irq.advance(100);
        irq.disable(VBLANK).expect("disables");

        assert_eq!(irq.next_due(), None);
        irq.raise(VBLANK).expect("known source");
        assert_eq!(irq.next_due(), None);

        irq.enable(VBLANK).expect("enables");
        irq.raise(VBLANK).expect("known source");
        assert_eq!(irq.next_due().map(|r| r.source), Some(VBLANK));
    }

    #[test]
    fn raise_while_armed_keeps_the_scheduled_deadline() {
        let mut irq = periodic(1_000);
        irq.arm(VBLANK, 1_000).expect("arms");
        irq.advance(10);
        irq.raise(VBLANK).expect("known source");
        assert_eq!(irq.next_due().map(|r| r.source), Some(VBLANK));

        irq.acknowledge(VBLANK).expect("acknowledges");
        let source = irq.source(VBLANK).expect("registered");
        assert_eq!(source.state(), SourceState::Armed);
        assert_eq!(source.deadline(), 1_000);

        irq.advance(989);
        assert_eq!(irq.next_due(), None);
        irq.advance(1);
        assert_eq!(irq.next_due().map(|r| r.source), Some(VBLANK));
        irq.acknowledge(VBLANK).expect("acknowledges");
        assert_eq!(irq.source(VBLANK).map(|s| s.deadline()), Some(2_000));
    }

    #[test]
    fn raise_on_an_idle_periodic_source_arms_from_the_acknowledgement() {
        let mut irq = periodic(100);
        let mut delivered = Vec::new();
        for _ in 0..1_000 {
            irq.advance(1);
            if irq.now() % 100 == 0 {
                irq.raise(VBLANK).expect("known source");
            }
            if irq.next_due().is_some() {
                delivered.push(irq.now());
                irq.acknowledge(VBLANK).expect("acknowledges");
            }
        }
        assert_eq!(delivered, (1..=10).map(|n| n * 100).collect::<Vec<_>>());
    }

    #[test]
    fn raise_on_a_due_source_is_absorbed() {
        let mut irq = InterruptController::new();
        irq.register(VBLANK, rst(1), None).expect("registers");
        irq.raise(VBLANK).expect("known source");
        irq.raise(VBLANK).expect("known source");
        irq.acknowledge(VBLANK).expect("acknowledges");
        assert_eq!(irq.next_due(), None);
        assert_eq!(
            irq.source(VBLANK).map(|s| s.state()),
            Some(SourceState::Acknowledged)
        );
    }

    #[test]
    fn illegal_transitions_are_reported() {
        let mut irq = periodic(100);
        assert_eq!(
            irq.acknowledge(VBLANK),
            Err(InterruptError::InvalidTransition {
                id: VBLANK,
                state: SourceState::Disarmed
            })
        );

        irq.arm(VBLANK, 5).expect("arms");
        assert_eq!(
            irq.arm(VBLANK, 5),
            Err(InterruptError::InvalidTransition {
                id: VBLANK,
                state: SourceState::Armed
            })
        );
    }

    #[test]
    fn registration_rejects_bad_declarations() {
        let mut irq = periodic(100);
        assert_eq!(
            irq.register(VBLANK, rst(1), None),
            Err(InterruptError::DuplicateSource(VBLANK))
        );

        let out_of_range = SourceId::new(u8::try_from(MAX_INTERRUPT_SOURCES).expect("fits"));
        assert_eq!(
            irq.register(out_of_range, rst(0), None),
            Err(InterruptError::SourceOutOfRange(out_of_range))
        );
        assert_eq!(
            irq.register(MID_SCREEN, rst(2), Some(0)),
            Err(InterruptError::ZeroPeriod(MID_SCREEN))
        );
        assert_eq!(
            irq.raise(SourceId::new(5)),
            Err(InterruptError::UnknownSource(SourceId::new(5)))
        );
    }
}
