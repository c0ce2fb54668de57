use thiserror::Error;

use crate::{Access, AddressSpace, DeviceId, SourceId, SourceState};

/// Rejected map-table or device-arena registration.
///
/// A failing bind leaves the table exactly as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum BindError {
    /// The new memory range intersects an already bound range.
    #[error(
        "memory range {start:#06x}..={end:#06x} overlaps bound range {existing_start:#06x}..={existing_end:#06x}"
    )]
    Overlap {
        /// Inclusive start of the rejected range.
        start: u16,
        /// Inclusive end of the rejected range.
        end: u16,
        /// Inclusive start of the conflicting entry.
        existing_start: u16,
        /// Inclusive end of the conflicting entry.
        existing_end: u16,
    },
    /// The port is already bound for the same transfer direction.
    #[error("port {port:#04x} is already bound for {access:?}")]
    DuplicatePort {
        /// Rejected port number.
        port: u8,
        /// Direction that is already taken.
        access: Access,
    },
    /// Range start lies above its end.
    #[error("range start {start:#06x} is greater than end {end:#06x}")]
    InvalidRange {
        /// Inclusive start.
        start: u16,
        /// Inclusive end.
        end: u16,
    },
    /// No free entry is left in the table for this address space.
    #[error("{space:?} map table is full")]
    TableFull {
        /// Address space whose table overflowed.
        space: AddressSpace,
    },
    /// The device arena has no free slot.
    #[error("device arena is full")]
    ArenaFull,
    /// The binding would address bytes beyond the device's declared width.
    #[error("binding reaches device offset {last:#06x} but the device is {width} bytes wide")]
    OffsetOutOfRange {
        /// Highest device offset the binding could produce.
        last: u32,
        /// Declared width of the target device.
        width: u16,
    },
    /// The device id does not name a registered device.
    #[error("device {0:?} is not registered")]
    UnknownDevice(DeviceId),
    /// A writable binding was requested for a ROM window.
    #[error("device {0:?} is read-only and cannot take a writable binding")]
    ReadOnlyDevice(DeviceId),
}

/// Failed bus transaction.
///
/// `Unmapped` means no device answers at the address; `AccessDenied` means a
/// device is there but its binding forbids the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AccessError {
    /// No binding covers the address or port.
    #[error("unmapped {space:?} {access:?} at {address:#06x}")]
    Unmapped {
        /// Address space of the transaction.
        space: AddressSpace,
        /// Address or port number.
        address: u16,
        /// Transfer direction.
        access: Access,
    },
    /// A device is bound but not for this direction.
    #[error("{space:?} {access:?} at {address:#06x} is not permitted by its binding")]
    AccessDenied {
        /// Address space of the transaction.
        space: AddressSpace,
        /// Address or port number.
        address: u16,
        /// Transfer direction.
        access: Access,
    },
}

/// Interrupt controller misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum InterruptError {
    /// Source identifier does not fit the controller.
    #[error("interrupt source {0} is out of range")]
    SourceOutOfRange(SourceId),
    /// Source identifier registered twice.
    #[error("interrupt source {0} is already registered")]
    DuplicateSource(SourceId),
    /// Source identifier was never registered.
    #[error("interrupt source {0} is not registered")]
    UnknownSource(SourceId),
    /// Periodic sources need a non-zero period.
    #[error("interrupt source {0} has a zero period")]
    ZeroPeriod(SourceId),
    /// Requested transition is not legal from the current state.
    #[error("interrupt source {id} cannot make that transition from {state:?}")]
    InvalidTransition {
        /// Source the operation targeted.
        id: SourceId,
        /// State the source was in.
        state: SourceState,
    },
}

/// Structurally invalid hardware description; no machine is produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A binding was rejected by a map table.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// An interrupt declaration was rejected by the controller.
    #[error(transparent)]
    Interrupt(#[from] InterruptError),
    /// A device's parameters cannot be realised.
    #[error("device {index}: {reason}")]
    InvalidDevice {
        /// Position of the device in the description.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// More initial register values than the device is wide.
    #[error("device {index}: {len} initial register values exceed its width of {width}")]
    InitTooLong {
        /// Position of the device in the description.
        index: usize,
        /// Number of initial values supplied.
        len: usize,
        /// Declared device width.
        width: u16,
    },
    /// A device raises an interrupt source the controller does not know.
    #[error("device {device:?} raises interrupt source {id} which is not registered")]
    UnregisteredSource {
        /// Offending device.
        device: DeviceId,
        /// Source it raises.
        id: SourceId,
    },
    /// A device raises a source that also re-arms itself on a period.
    #[error("device {device:?} raises interrupt source {id} which is periodic")]
    PeriodicDeviceSource {
        /// Offending device.
        device: DeviceId,
        /// Source it raises.
        id: SourceId,
    },
    /// The JSON text could not be decoded into a description.
    #[cfg(feature = "json")]
    #[error("malformed hardware description: {0}")]
    Json(#[from] serde_json::Error),
}
