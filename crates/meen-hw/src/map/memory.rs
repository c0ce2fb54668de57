use crate::map::{Access, AccessMode, AddressSpace, Resolved};
use crate::{AccessError, BindError, DeviceId};

/// Maximum number of memory ranges one machine can bind.
pub const MAX_MEMORY_RANGES: usize = 16;

/// One memory binding: `start..=end` routed to `device` starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryEntry {
    /// Inclusive start address.
    pub start: u16,
    /// Inclusive end address.
    pub end: u16,
    /// Bound device.
    pub device: DeviceId,
    /// Device offset that `start` maps to.
    pub offset: u16,
    /// Directions the binding accepts.
    pub mode: AccessMode,
}

impl MemoryEntry {
    const VACANT: Self = Self {
        start: 0,
        end: 0,
        device: DeviceId::from_index(0),
        offset: 0,
        mode: AccessMode::ReadWrite,
    };

    /// Returns `true` when `addr` lies inside this entry.
    #[must_use]
    pub const fn contains(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }

    /// Number of addresses covered.
    #[must_use]
    pub const fn span(&self) -> u32 {
        self.end as u32 - self.start as u32 + 1
    }

    const fn intersects(&self, start: u16, end: u16) -> bool {
        start <= self.end && end >= self.start
    }
}

/// Memory-range routing table.
///
/// Entries are kept sorted by start address and never overlap, so lookup is a
/// binary search. Storage is a fixed array; binding never allocates.
#[derive(Debug, Clone)]
pub struct MemoryMap {
    entries: [MemoryEntry; MAX_MEMORY_RANGES],
    len: usize,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMap {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [MemoryEntry::VACANT; MAX_MEMORY_RANGES],
            len: 0,
        }
    }

    /// Bound entries in ascending address order.
    #[must_use]
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries[..self.len]
    }

    /// Number of bound ranges.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Binds `start..=end` to `device`, with `start` landing on device `offset`.
    ///
    /// # Errors
    ///
    /// [`BindError::InvalidRange`] when `start > end`, [`BindError::Overlap`]
    /// when the range intersects a bound one and [`BindError::TableFull`] when
    /// no entry is free. The table is unchanged on error.
    pub fn bind(
        &mut self,
        start: u16,
        end: u16,
        device: DeviceId,
        offset: u16,
        mode: AccessMode,
    ) -> Result<(), BindError> {
        if start > end {
            return Err(BindError::InvalidRange { start, end });
        }

        let slot = self.entries().partition_point(|entry| entry.end < start);
        if let Some(existing) = self
            .entries()
            .get(slot)
            .filter(|entry| entry.intersects(start, end))
        {
            return Err(BindError::Overlap {
                start,
                end,
                existing_start: existing.start,
                existing_end: existing.end,
            });
        }

        if self.len == MAX_MEMORY_RANGES {
            return Err(BindError::TableFull {
                space: AddressSpace::Memory,
            });
        }

        self.entries.copy_within(slot..self.len, slot + 1);
        self.entries[slot] = MemoryEntry {
            start,
            end,
            device,
            offset,
            mode,
        };
        self.len += 1;
        Ok(())
    }

    /// Returns the entry covering `addr`, if any.
    #[must_use]
    pub fn lookup(&self, addr: u16) -> Option<&MemoryEntry> {
        let entries = self.entries();
        let slot = entries.partition_point(|entry| entry.end < addr);
        entries.get(slot).filter(|entry| entry.contains(addr))
    }

    /// Resolves `addr` to its device and device-relative offset.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unmapped`] when no range covers `addr`, and
    /// [`AccessError::AccessDenied`] when the covering binding does not accept
    /// `access`.
    pub fn resolve(&self, addr: u16, access: Access) -> Result<Resolved, AccessError> {
        let entry = self.lookup(addr).ok_or(AccessError::Unmapped {
            space: AddressSpace::Memory,
            address: addr,
            access,
        })?;

        if !entry.mode.permits(access) {
            return Err(AccessError::AccessDenied {
                space: AddressSpace::Memory,
                address: addr,
                access,
            });
        }

        Ok(Resolved {
            device: entry.device,
            offset: entry.offset.wrapping_add(addr - entry.start),
        })
    }
}
