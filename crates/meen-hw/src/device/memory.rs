use core::fmt;

use crate::Device;

/// Storage carried inline by every memory window (8 KiB).
pub const MEMORY_WINDOW_CAPACITY: usize = 0x2000;

/// Plain byte storage: RAM, ROM, or video RAM.
///
/// Whether the CPU may write is decided by the binding's access mode, and a
/// ROM window refuses any binding that permits writes. The window itself
/// accepts every write so images can be preloaded through the same path.
/// Storage is a fixed inline array.
#[derive(Clone)]
pub struct MemoryWindow {
    cells: [u8; MEMORY_WINDOW_CAPACITY],
    size: u16,
    writable: bool,
}

impl MemoryWindow {
    /// Zero-filled window of `size` bytes intended for read-write binding.
    ///
    /// Returns `None` when `size` is zero or above [`MEMORY_WINDOW_CAPACITY`].
    #[must_use]
    pub const fn ram(size: u16) -> Option<Self> {
        Self::with_size(size, true)
    }

    /// Zero-filled window of `size` bytes intended for read-only binding.
    ///
    /// Returns `None` when `size` is zero or above [`MEMORY_WINDOW_CAPACITY`].
    #[must_use]
    pub const fn rom(size: u16) -> Option<Self> {
        Self::with_size(size, false)
    }

    const fn with_size(size: u16, writable: bool) -> Option<Self> {
        if size == 0 || size as usize > MEMORY_WINDOW_CAPACITY {
            return None;
        }
        Some(Self {
            cells: [0; MEMORY_WINDOW_CAPACITY],
            size,
            writable,
        })
    }

    /// Whether this window was created as RAM. ROM windows only take
    /// read-only bindings.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    /// Copies `image` into the window starting at offset zero.
    ///
    /// Returns the number of bytes copied; anything past the window is
    /// ignored.
    pub fn load(&mut self, image: &[u8]) -> usize {
        let len = image.len().min(usize::from(self.size));
        self.cells[..len].copy_from_slice(&image[..len]);
        len
    }

    /// The window's bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.cells[..usize::from(self.size)]
    }
}

impl fmt::Debug for MemoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryWindow")
            .field("size", &self.size)
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}

impl Device for MemoryWindow {
    fn width(&self) -> u16 {
        self.size
    }

    fn read(&mut self, offset: u16) -> u8 {
        self.cells[usize::from(offset)]
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.cells[usize::from(offset)] = value;
    }
}
