//! Address routing: memory-range and port tables binding the bus to devices.

/// Sorted, non-overlapping memory-range table.
pub mod memory;
/// Direct-indexed 8-bit port table.
pub mod port;

pub use memory::{MemoryEntry, MemoryMap, MAX_MEMORY_RANGES};
pub use port::{PortEntry, PortMap, PORT_COUNT};

use crate::DeviceId;

/// Bus address space a transaction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "kebab-case")
)]
pub enum AddressSpace {
    /// 16-bit memory space (loads, stores, fetches).
    Memory,
    /// 8-bit port space (`IN` / `OUT`).
    Port,
}

/// Direction of one bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "kebab-case")
)]
pub enum Access {
    /// Device to CPU.
    Read,
    /// CPU to device.
    Write,
}

/// Directions a binding accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "kebab-case")
)]
pub enum AccessMode {
    /// Reads only; writes are denied.
    ReadOnly,
    /// Writes only; reads are denied.
    WriteOnly,
    /// Both directions.
    #[default]
    ReadWrite,
}

impl AccessMode {
    /// Returns `true` when this mode accepts `access`.
    #[must_use]
    pub const fn permits(self, access: Access) -> bool {
        matches!(
            (self, access),
            (Self::ReadWrite, _) | (Self::ReadOnly, Access::Read) | (Self::WriteOnly, Access::Write)
        )
    }
}

/// A successfully resolved bus target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolved {
    /// Device that answers the transaction.
    pub device: DeviceId,
    /// Offset within the device's own register space.
    pub offset: u16,
}

#[cfg(test)]
mod tests {
    use super::{Access, AccessMode};

    #[test]
    fn access_mode_permission_table() {
        assert!(AccessMode::ReadOnly.permits(Access::Read));
        assert!(!AccessMode::ReadOnly.permits(Access::Write));
        assert!(!AccessMode::WriteOnly.permits(Access::Read));
        assert!(AccessMode::WriteOnly.permits(Access::Write));
        assert!(AccessMode::ReadWrite.permits(Access::Read));
        assert!(AccessMode::ReadWrite.permits(Access::Write));
    }

    #[test]
    fn default_mode_is_read_write() {
        assert_eq!(AccessMode::default(), AccessMode::ReadWrite);
    }
}
