//! The hardware aggregate the CPU core talks to.
//!
//! A [`Machine`] owns every device, both map tables and the interrupt
//! controller of one emulated board. It is assembled once through
//! [`MachineBuilder`]; after that the CPU core drives it with
//! [`Machine::read`], [`Machine::write`], [`Machine::tick`] and
//! [`Machine::acknowledge_interrupt`]. Nothing allocates and nothing blocks.

use log::debug;

use crate::map::{Access, AccessMode, AddressSpace, MemoryMap, PortMap, Resolved};
use crate::{
    AccessError, BindError, ConfigError, Device, DeviceId, InterruptController, InterruptError,
    InterruptRequest, Peripheral, SourceId,
};

/// Maximum number of devices one machine owns.
pub const MAX_DEVICES: usize = 12;

/// Emulated peripheral hardware of one machine instance.
#[derive(Debug, Clone)]
pub struct Machine {
    devices: [Option<Peripheral>; MAX_DEVICES],
    device_count: usize,
    memory: MemoryMap,
    ports: PortMap,
    interrupts: InterruptController,
}

impl Machine {
    /// Starts assembling a machine.
    #[must_use]
    pub fn builder() -> MachineBuilder {
        MachineBuilder::new()
    }

    /// Reads one byte from `address` in `space`.
    ///
    /// Port addresses above `0xFF` are unmapped.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unmapped`] when nothing is bound there,
    /// [`AccessError::AccessDenied`] when the binding is write-only.
    pub fn read(&mut self, address: u16, space: AddressSpace) -> Result<u8, AccessError> {
        let (device, offset) = self.route(address, space, Access::Read)?;
        Ok(device.read(offset))
    }

    /// Writes one byte to `address` in `space`.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unmapped`] when nothing is bound there,
    /// [`AccessError::AccessDenied`] when the binding is read-only.
    pub fn write(
        &mut self,
        address: u16,
        space: AddressSpace,
        value: u8,
    ) -> Result<(), AccessError> {
        let (device, offset) = self.route(address, space, Access::Write)?;
        device.write(offset, value);
        Ok(())
    }

    /// Advances emulated time by the cycles the last instruction consumed.
    ///
    /// The controller clock moves first, then every device ticks in
    /// registration order and any source a device raises becomes due. Returns
    /// the highest-priority due interrupt, which stays pending until
    /// acknowledged.
    ///
    /// # Errors
    ///
    /// [`InterruptError::UnknownSource`] when a device raises an undeclared
    /// source. Devices ticked before the failing one keep their new state.
    pub fn tick(&mut self, elapsed_cycles: u64) -> Result<Option<InterruptRequest>, InterruptError> {
        self.interrupts.advance(elapsed_cycles);
        for device in self.devices[..self.device_count].iter_mut().flatten() {
            if let Some(source) = device.tick(elapsed_cycles) {
                self.interrupts.raise(source)?;
            }
        }
        Ok(self.interrupts.next_due())
    }

    /// Tells the controller the CPU has taken interrupt `source`.
    ///
    /// # Errors
    ///
    /// [`InterruptError::UnknownSource`] or
    /// [`InterruptError::InvalidTransition`] when `source` is not due.
    pub fn acknowledge_interrupt(&mut self, source: SourceId) -> Result<(), InterruptError> {
        self.interrupts.acknowledge(source)
    }

    /// Cycles elapsed since the machine was built.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.interrupts.now()
    }

    /// Interrupt controller state.
    #[must_use]
    pub const fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    /// Memory routing table.
    #[must_use]
    pub const fn memory_map(&self) -> &MemoryMap {
        &self.memory
    }

    /// Port routing table.
    #[must_use]
    pub const fn port_map(&self) -> &PortMap {
        &self.ports
    }

    /// Device in slot `id`.
    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Peripheral> {
        self.devices.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable device in slot `id`, for host-side input and output such as
    /// pressing switches or draining triggered sounds.
    #[must_use]
    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Peripheral> {
        self.devices.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Number of devices owned.
    #[must_use]
    pub const fn device_count(&self) -> usize {
        self.device_count
    }

    fn route(
        &mut self,
        address: u16,
        space: AddressSpace,
        access: Access,
    ) -> Result<(&mut Peripheral, u16), AccessError> {
        let unmapped = AccessError::Unmapped {
            space,
            address,
            access,
        };
        let Resolved { device, offset } = match space {
            AddressSpace::Memory => self.memory.resolve(address, access)?,
            AddressSpace::Port => {
                let port = u8::try_from(address).map_err(|_| unmapped)?;
                self.ports.resolve(port, access)?
            }
        };
        let device = self.device_mut(device).ok_or(unmapped)?;
        Ok((device, offset))
    }
}

/// Assembles a [`Machine`], validating every binding as it is added.
#[derive(Debug, Clone)]
pub struct MachineBuilder {
    machine: Machine,
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            machine: Machine {
                devices: core::array::from_fn(|_| None),
                device_count: 0,
                memory: MemoryMap::new(),
                ports: PortMap::new(),
                interrupts: InterruptController::new(),
            },
        }
    }

    /// Moves `device` into the next arena slot. Slots tick in this order.
    ///
    /// # Errors
    ///
    /// [`BindError::ArenaFull`] once [`MAX_DEVICES`] devices are added.
    pub fn add_device(&mut self, device: impl Into<Peripheral>) -> Result<DeviceId, BindError> {
        let machine = &mut self.machine;
        let index = machine.device_count;
        let slot = machine.devices.get_mut(index).ok_or(BindError::ArenaFull)?;
        let id = DeviceId::from_index(u8::try_from(index).map_err(|_| BindError::ArenaFull)?);
        *slot = Some(device.into());
        machine.device_count += 1;
        Ok(id)
    }

    /// Device already added in slot `id`, e.g. to preload a ROM image.
    #[must_use]
    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Peripheral> {
        self.machine.device_mut(id)
    }

    /// Binds memory `start..=end` to `device`, `start` landing on `offset`.
    ///
    /// # Errors
    ///
    /// Any [`MemoryMap::bind`] error, [`BindError::UnknownDevice`],
    /// [`BindError::OffsetOutOfRange`] when the range runs past the device, or
    /// [`BindError::ReadOnlyDevice`] when `mode` lets the CPU write a ROM.
    pub fn bind_memory(
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
        self.check_offsets(device, offset, u32::from(end - start))?;
        self.check_mode(device, mode)?;
        self.machine.memory.bind(start, end, device, offset, mode)
    }

    /// Binds `port` to register `offset` of `device`.
    ///
    /// # Errors
    ///
    /// Any [`PortMap::bind`] error, [`BindError::UnknownDevice`],
    /// [`BindError::OffsetOutOfRange`] or [`BindError::ReadOnlyDevice`].
    pub fn bind_port(
        &mut self,
        port: u8,
        device: DeviceId,
        offset: u16,
        mode: AccessMode,
    ) -> Result<(), BindError> {
        self.check_offsets(device, offset, 0)?;
        self.check_mode(device, mode)?;
        self.machine.ports.bind(port, device, offset, mode)
    }

    /// Declares interrupt source `id` delivering `vector`, re-arming every
    /// `period` cycles when given.
    ///
    /// # Errors
    ///
    /// See [`InterruptController::register`].
    pub fn register_interrupt(
        &mut self,
        id: SourceId,
        vector: u8,
        period: Option<u64>,
    ) -> Result<(), InterruptError> {
        self.machine.interrupts.register(id, vector, period)
    }

    /// Arms source `id` to fire `deadline_cycles` after power-on.
    ///
    /// # Errors
    ///
    /// See [`InterruptController::arm`].
    pub fn arm_interrupt(&mut self, id: SourceId, deadline_cycles: u64) -> Result<(), InterruptError> {
        self.machine.interrupts.arm(id, deadline_cycles)
    }

    /// Finishes the machine.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnregisteredSource`] when a device can raise a source the
    /// controller was never told about, [`ConfigError::PeriodicDeviceSource`]
    /// when that source also has a period.
    pub fn build(self) -> Result<Machine, ConfigError> {
        let machine = self.machine;
        for (index, device) in machine.devices[..machine.device_count].iter().enumerate() {
            let Some(id) = device.as_ref().and_then(Device::interrupt_source) else {
                continue;
            };
            let device = DeviceId::from_index(u8::try_from(index).unwrap_or(u8::MAX));
            match machine.interrupts.source(id) {
                None => return Err(ConfigError::UnregisteredSource { device, id }),
                Some(source) if source.period().is_some() => {
                    return Err(ConfigError::PeriodicDeviceSource { device, id });
                }
                Some(_) => {}
            }
        }

        debug!(
            "machine built: {} devices, {} memory ranges, {} port directions, {} interrupt sources",
            machine.device_count,
            machine.memory.len(),
            machine.ports.bound_directions(),
            machine.interrupts.sources().count()
        );
        Ok(machine)
    }

    fn check_mode(&self, device: DeviceId, mode: AccessMode) -> Result<(), BindError> {
        match self.machine.device(device) {
            Some(Peripheral::Memory(window))
                if !window.is_writable() && mode.permits(Access::Write) =>
            {
                Err(BindError::ReadOnlyDevice(device))
            }
            _ => Ok(()),
        }
    }

    fn check_offsets(&self, device: DeviceId, offset: u16, extent: u32) -> Result<(), BindError> {
        let width = self
            .machine
            .device(device)
            .ok_or(BindError::UnknownDevice(device))?
            .width();
        let last = u32::from(offset) + extent;
        if last >= u32::from(width) {
            return Err(BindError::OffsetOutOfRange { last, width });
        }
        Ok(())
    }
}
