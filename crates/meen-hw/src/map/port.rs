use crate::map::{Access, AccessMode, AddressSpace, Resolved};
use crate::{AccessError, BindError, DeviceId};

/// Size of the i8080 port space.
pub const PORT_COUNT: usize = 256;

/// One port binding for a single transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortEntry {
    /// Bound device.
    pub device: DeviceId,
    /// Device register the port lands on.
    pub offset: u16,
    /// Mode the binding was declared with.
    pub mode: AccessMode,
}

/// Port routing table.
///
/// Port numbers are unique per direction. `IN` and `OUT` are separate bus
/// cycles, so each port has one input slot and one output slot: a read-only
/// and a write-only binding may share a number (the arcade boards put the DIP
/// switches and the shift amount both on port 2), while a second binding for
/// an already bound direction fails with [`BindError::DuplicatePort`].
/// Lookup is a direct index.
#[derive(Debug, Clone)]
pub struct PortMap {
    inputs: [Option<PortEntry>; PORT_COUNT],
    outputs: [Option<PortEntry>; PORT_COUNT],
}

impl Default for PortMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PortMap {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inputs: [None; PORT_COUNT],
            outputs: [None; PORT_COUNT],
        }
    }

    /// Binds `port` to `device` register `offset` for the directions in `mode`.
    ///
    /// # Errors
    ///
    /// [`BindError::DuplicatePort`] when a direction `mode` covers is already
    /// bound. Nothing is bound on error.
    pub fn bind(
        &mut self,
        port: u8,
        device: DeviceId,
        offset: u16,
        mode: AccessMode,
    ) -> Result<(), BindError> {
        let index = usize::from(port);
        for access in [Access::Read, Access::Write] {
            if mode.permits(access) && self.slot(index, access).is_some() {
                return Err(BindError::DuplicatePort { port, access });
            }
        }

        let entry = Some(PortEntry {
            device,
            offset,
            mode,
        });
        if mode.permits(Access::Read) {
            self.inputs[index] = entry;
        }
        if mode.permits(Access::Write) {
            self.outputs[index] = entry;
        }
        Ok(())
    }

    /// Returns the binding serving `access` on `port`.
    #[must_use]
    pub const fn lookup(&self, port: u8, access: Access) -> Option<&PortEntry> {
        self.slot(port as usize, access).as_ref()
    }

    /// Resolves `port` for `access` to its device and register offset.
    ///
    /// # Errors
    ///
    /// [`AccessError::AccessDenied`] when the port is bound only for the other
    /// direction, [`AccessError::Unmapped`] when it is not bound at all.
    pub fn resolve(&self, port: u8, access: Access) -> Result<Resolved, AccessError> {
        if let Some(entry) = self.lookup(port, access) {
            return Ok(Resolved {
                device: entry.device,
                offset: entry.offset,
            });
        }

        let other = match access {
            Access::Read => Access::Write,
            Access::Write => Access::Read,
        };
        let address = u16::from(port);
        if self.lookup(port, other).is_some() {
            Err(AccessError::AccessDenied {
                space: AddressSpace::Port,
                address,
                access,
            })
        } else {
            Err(AccessError::Unmapped {
                space: AddressSpace::Port,
                address,
                access,
            })
        }
    }

    /// Number of bound port directions.
    #[must_use]
    pub fn bound_directions(&self) -> usize {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .filter(|slot| slot.is_some())
            .count()
    }

    const fn slot(&self, index: usize, access: Access) -> &Option<PortEntry> {
        match access {
            Access::Read => &self.inputs[index],
            Access::Write => &self.outputs[index],
        }
    }
}
