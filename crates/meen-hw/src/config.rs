//! Hardware descriptions and their translation into a [`Machine`].
//!
//! A [`MachineDescription`] lists devices, each with its bindings and initial
//! register values, plus the interrupt sources the board declares. With the
//! `serde` feature it derives `Deserialize`; with `json` it can be read
//! straight from text. Every structural problem is reported as a
//! [`ConfigError`] and no machine is produced.

use alloc::vec::Vec;

use log::debug;

use crate::map::{AccessMode, AddressSpace};
use crate::{
    ConfigError, Device, DeviceId, IntervalTimer, Machine, MachineBuilder, MemoryWindow,
    Peripheral, SourceId, SwitchBank,
};

#[cfg(feature = "i8080-arcade")]
use crate::{ShiftRegister, SoundLatch, Watchdog};

#[cfg(feature = "serde")]
const fn one() -> u32 {
    1
}

/// Device type and its construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(tag = "type", rename_all = "kebab-case")
)]
pub enum DeviceKind {
    /// Read-write memory window of `size` bytes.
    Ram {
        /// Window size in bytes.
        size: u16,
    },
    /// Read-only memory window of `size` bytes; contents come from `init`.
    /// Its bindings must not permit writes.
    Rom {
        /// Window size in bytes.
        size: u16,
    },
    /// One byte of switches; `init` holds the power-on value.
    Switches,
    /// Interval timer raising `source`.
    Timer {
        /// Source raised on expiry.
        source: SourceId,
        /// Cycles per counter step.
        #[cfg_attr(feature = "serde", serde(default = "one"))]
        prescale: u32,
    },
    /// Arcade barrel shifter.
    #[cfg(feature = "i8080-arcade")]
    ShiftRegister,
    /// Arcade sound latch.
    #[cfg(feature = "i8080-arcade")]
    SoundLatch {
        /// Bits that re-trigger while held.
        #[cfg_attr(feature = "serde", serde(default))]
        repeat_mask: u8,
    },
    /// Arcade watchdog.
    #[cfg(feature = "i8080-arcade")]
    Watchdog {
        /// Unserviced cycles before the watchdog bites; zero disables it.
        timeout: u64,
        /// Source raised when it bites.
        source: SourceId,
    },
}

impl DeviceKind {
    fn instantiate(self, index: usize) -> Result<Peripheral, ConfigError> {
        let window = |window: Option<MemoryWindow>| {
            window.map(Peripheral::from).ok_or(ConfigError::InvalidDevice {
                index,
                reason: "memory window size must be between 1 and 8192 bytes",
            })
        };
        Ok(match self {
            Self::Ram { size } => window(MemoryWindow::ram(size))?,
            Self::Rom { size } => window(MemoryWindow::rom(size))?,
            Self::Switches => SwitchBank::default().into(),
            Self::Timer { source, prescale } => IntervalTimer::new(source, prescale).into(),
            #[cfg(feature = "i8080-arcade")]
            Self::ShiftRegister => ShiftRegister::new().into(),
            #[cfg(feature = "i8080-arcade")]
            Self::SoundLatch { repeat_mask } => SoundLatch::new(repeat_mask).into(),
            #[cfg(feature = "i8080-arcade")]
            Self::Watchdog { timeout, source } => Watchdog::new(source, timeout).into(),
        })
    }
}

/// Where a device appears on the bus.
///
/// A memory binding maps `start..=end` onto consecutive device offsets from
/// `offset`. A port binding with an `end` binds each port in the run to the
/// next register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(deny_unknown_fields)
)]
pub struct BindingDescription {
    /// Target address space.
    pub space: AddressSpace,
    /// First address or port.
    pub start: u16,
    /// Last address or port, inclusive; defaults to `start`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub end: Option<u16>,
    /// Device offset that `start` lands on.
    #[cfg_attr(feature = "serde", serde(default))]
    pub offset: u16,
    /// Permitted directions.
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: AccessMode,
}

impl BindingDescription {
    /// Single memory or port binding at `start`.
    #[must_use]
    pub const fn at(space: AddressSpace, start: u16, offset: u16, mode: AccessMode) -> Self {
        Self {
            space,
            start,
            end: None,
            offset,
            mode,
        }
    }

    /// Memory range binding starting at device offset zero.
    #[must_use]
    pub const fn memory(start: u16, end: u16, mode: AccessMode) -> Self {
        Self {
            space: AddressSpace::Memory,
            start,
            end: Some(end),
            offset: 0,
            mode,
        }
    }

    fn apply(
        &self,
        builder: &mut MachineBuilder,
        device: DeviceId,
        index: usize,
    ) -> Result<(), ConfigError> {
        let end = self.end.unwrap_or(self.start);
        match self.space {
            AddressSpace::Memory => {
                builder.bind_memory(self.start, end, device, self.offset, self.mode)?;
            }
            AddressSpace::Port => {
                let (Ok(first), Ok(last)) = (u8::try_from(self.start), u8::try_from(end)) else {
                    return Err(ConfigError::InvalidDevice {
                        index,
                        reason: "port binding lies above port 0xff",
                    });
                };
                if first > last {
                    return Err(crate::BindError::InvalidRange {
                        start: self.start,
                        end,
                    }
                    .into());
                }
                for port in first..=last {
                    let offset = self.offset.saturating_add(u16::from(port - first));
                    builder.bind_port(port, device, offset, self.mode)?;
                }
            }
        }
        Ok(())
    }
}

/// One device with its bus bindings and initial register values.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeviceDescription {
    /// Device type and parameters.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub device: DeviceKind,
    /// Bus bindings.
    #[cfg_attr(feature = "serde", serde(default))]
    pub bindings: Vec<BindingDescription>,
    /// Power-on values for offsets `0..`, set without side effects.
    #[cfg_attr(feature = "serde", serde(default))]
    pub init: Vec<u8>,
}

/// One interrupt source declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(deny_unknown_fields)
)]
pub struct InterruptDescription {
    /// Source identifier; lower wins ties.
    pub id: SourceId,
    /// Opcode delivered to the CPU.
    pub vector: u8,
    /// Auto-rearm period in cycles.
    #[cfg_attr(feature = "serde", serde(default))]
    pub period: Option<u64>,
    /// First deadline in cycles from power-on; unarmed when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub deadline: Option<u64>,
}

/// Complete hardware description of one board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(deny_unknown_fields)
)]
pub struct MachineDescription {
    /// Devices in registration (and tick) order; the n-th becomes device n.
    pub devices: Vec<DeviceDescription>,
    /// Interrupt sources.
    #[cfg_attr(feature = "serde", serde(default))]
    pub interrupts: Vec<InterruptDescription>,
}

impl MachineDescription {
    /// Decodes a description from JSON text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Json`] for malformed input.
    #[cfg(feature = "json")]
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds a machine from this description.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] encountered.
    pub fn build(&self) -> Result<Machine, ConfigError> {
        let mut builder = Machine::builder();
        for irq in &self.interrupts {
            builder.register_interrupt(irq.id, irq.vector, irq.period)?;
        }

        for (index, description) in self.devices.iter().enumerate() {
            let mut device = description.device.instantiate(index)?;
            let width = device.width();
            if description.init.len() > usize::from(width) {
                return Err(ConfigError::InitTooLong {
                    index,
                    len: description.init.len(),
                    width,
                });
            }
            for (offset, value) in (0..width).zip(&description.init) {
                device.preload(offset, *value);
            }

            debug!("device {index}: {} ({width} bytes)", device.kind());
            let id = builder.add_device(device)?;
            for binding in &description.bindings {
                binding.apply(&mut builder, id, index)?;
            }
        }

        for irq in &self.interrupts {
            if let Some(deadline) = irq.deadline {
                builder.arm_interrupt(irq.id, deadline)?;
            }
        }
        builder.build()
    }
}

/// Device slots of the built-in i8080 arcade board.
#[cfg(feature = "i8080-arcade")]
pub mod arcade {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::{
        BindingDescription, DeviceDescription, DeviceKind, InterruptDescription,
        MachineDescription,
    };
    use crate::device::shifter::{SHIFT_AMOUNT, SHIFT_DATA, SHIFT_RESULT};
    use crate::map::{AccessMode, AddressSpace};
    use crate::timing::ARCADE_SCREEN_INTERRUPTS;
    use crate::{DeviceId, SourceId};

    /// Program ROM at `0x0000..=0x1FFF`.
    pub const ROM: DeviceId = DeviceId::from_index(0);
    /// Work and video RAM at `0x2000..=0x3FFF`.
    pub const RAM: DeviceId = DeviceId::from_index(1);
    /// Input port 0; powers up as `0x40`.
    pub const INPUT_0: DeviceId = DeviceId::from_index(2);
    /// Input port 1 (coin, start, player one controls).
    pub const INPUT_1: DeviceId = DeviceId::from_index(3);
    /// Input port 2 (DIP switches, player two controls).
    pub const INPUT_2: DeviceId = DeviceId::from_index(4);
    /// Barrel shifter: OUT 2 amount, OUT 4 data, IN 3 result.
    pub const SHIFTER: DeviceId = DeviceId::from_index(5);
    /// Sound latch on OUT 3; bit 0 (UFO) repeats.
    pub const SOUND_1: DeviceId = DeviceId::from_index(6);
    /// Sound latch on OUT 5.
    pub const SOUND_2: DeviceId = DeviceId::from_index(7);
    /// Watchdog on OUT 6. Shipped disabled.
    pub const WATCHDOG: DeviceId = DeviceId::from_index(8);

    /// Source the disabled watchdog would raise.
    pub const WATCHDOG_SOURCE: SourceId = SourceId::new(0);

    const fn port(port: u16, offset: u16, mode: AccessMode) -> BindingDescription {
        BindingDescription::at(AddressSpace::Port, port, offset, mode)
    }

    fn device(device: DeviceKind, bindings: Vec<BindingDescription>) -> DeviceDescription {
        DeviceDescription {
            device,
            bindings,
            init: vec![],
        }
    }

    impl MachineDescription {
        /// Space Invaders style board: 8 KiB ROM, 8 KiB RAM, three input
        /// ports, the shifter, two sound latches, a watchdog, and the two
        /// alternating screen interrupts.
        #[must_use]
        pub fn i8080_arcade() -> Self {
            let mut input_0 = device(
                DeviceKind::Switches,
                vec![port(0, 0, AccessMode::ReadOnly)],
            );
            input_0.init = vec![0x40];

            Self {
                devices: vec![
                    device(
                        DeviceKind::Rom { size: 0x2000 },
                        vec![BindingDescription::memory(0x0000, 0x1FFF, AccessMode::ReadOnly)],
                    ),
                    device(
                        DeviceKind::Ram { size: 0x2000 },
                        vec![BindingDescription::memory(0x2000, 0x3FFF, AccessMode::ReadWrite)],
                    ),
                    input_0,
                    device(DeviceKind::Switches, vec![port(1, 0, AccessMode::ReadOnly)]),
                    device(DeviceKind::Switches, vec![port(2, 0, AccessMode::ReadOnly)]),
                    device(
                        DeviceKind::ShiftRegister,
                        vec![
                            port(2, SHIFT_AMOUNT, AccessMode::WriteOnly),
                            port(3, SHIFT_RESULT, AccessMode::ReadOnly),
                            port(4, SHIFT_DATA, AccessMode::WriteOnly),
                        ],
                    ),
                    device(
                        DeviceKind::SoundLatch { repeat_mask: 0x01 },
                        vec![port(3, 0, AccessMode::WriteOnly)],
                    ),
                    device(
                        DeviceKind::SoundLatch { repeat_mask: 0x00 },
                        vec![port(5, 0, AccessMode::WriteOnly)],
                    ),
                    device(
                        DeviceKind::Watchdog {
                            timeout: 0,
                            source: WATCHDOG_SOURCE,
                        },
                        vec![port(6, 0, AccessMode::WriteOnly)],
                    ),
                ],
                interrupts: ARCADE_SCREEN_INTERRUPTS
                    .iter()
                    .map(|screen| InterruptDescription {
                        id: screen.source,
                        vector: screen.vector,
                        period: Some(screen.period),
                        deadline: Some(screen.first_deadline),
                    })
                    .collect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BindingDescription, DeviceDescription, DeviceKind, MachineDescription};
    use crate::map::{AccessMode, AddressSpace};
    use crate::{BindError, ConfigError, SourceId};

    fn single(
        device: DeviceKind,
        bindings: Vec<BindingDescription>,
        init: Vec<u8>,
    ) -> MachineDescription {
        MachineDescription {
            devices: vec![DeviceDescription {
                device,
                bindings,
                init,
            }],
            interrupts: vec![],
        }
    }

    #[test]
    fn init_bytes_preload_rom() {
        let description = single(
            DeviceKind::Rom { size: 4 },
            vec![BindingDescription::memory(0x0000, 0x0003, AccessMode::ReadOnly)],
            vec![0xC3, 0x00, 0x01],
        );
        let mut machine = description.build().expect("valid description");
        assert_eq!(machine.read(0x0000, AddressSpace::Memory), Ok(0xC3));
        assert_eq!(machine.read(0x0002, AddressSpace::Memory), Ok(0x01));
        assert_eq!(machine.read(0x0003, AddressSpace::Memory), Ok(0x00));
    }

    #[test]
    fn port_runs_bind_consecutive_registers() {
        let description = MachineDescription {
            devices: vec![DeviceDescription {
                device: DeviceKind::Timer {
                    source: SourceId::new(4),
                    prescale: 1,
                },
                bindings: vec![BindingDescription {
                    space: AddressSpace::Port,
                    start: 0x20,
                    end: Some(0x23),
                    offset: 0,
                    mode: AccessMode::ReadWrite,
                }],
                init: vec![0x34, 0x12],
            }],
            interrupts: vec![super::InterruptDescription {
                id: SourceId::new(4),
                vector: crate::interrupt::rst(4),
                period: None,
                deadline: None,
            }],
        };
        let mut machine = description.build().expect("valid description");
        assert_eq!(machine.read(0x20, AddressSpace::Port), Ok(0x34));
        assert_eq!(machine.read(0x21, AddressSpace::Port), Ok(0x12));
        assert_eq!(machine.port_map().bound_directions(), 8);
    }

    #[test]
    fn structural_errors_produce_no_machine() {
        let too_long = single(DeviceKind::Switches, vec![], vec![1, 2]);
        assert!(matches!(
            too_long.build(),
            Err(ConfigError::InitTooLong { index: 0, len: 2, width: 1 })
        ));

        let empty_ram = single(DeviceKind::Ram { size: 0 }, vec![], vec![]);
        assert!(matches!(
            empty_ram.build(),
            Err(ConfigError::InvalidDevice { index: 0, .. })
        ));

        let high_port = single(
            DeviceKind::Switches,
            vec![BindingDescription::at(AddressSpace::Port, 0x100, 0, AccessMode::ReadOnly)],
            vec![],
        );
        assert!(matches!(
            high_port.build(),
            Err(ConfigError::InvalidDevice { index: 0, .. })
        ));
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let mut description = single(
            DeviceKind::Ram { size: 0x100 },
            vec![BindingDescription::memory(0x1000, 0x10FF, AccessMode::ReadWrite)],
            vec![],
        );
        description.devices.push(DeviceDescription {
            device: DeviceKind::Ram { size: 0x100 },
            bindings: vec![BindingDescription::memory(0x10F0, 0x11EF, AccessMode::ReadWrite)],
            init: vec![],
        });
        assert!(matches!(
            description.build(),
            Err(ConfigError::Bind(BindError::Overlap { existing_start: 0x1000, .. }))
        ));
    }

    #[test]
    fn writable_rom_bindings_are_rejected() {
        let description = single(
            DeviceKind::Rom { size: 16 },
            vec![BindingDescription::memory(0x0000, 0x000F, AccessMode::ReadWrite)],
            vec![0xC3],
        );
        assert!(matches!(
            description.build(),
            Err(ConfigError::Bind(BindError::ReadOnlyDevice(_)))
        ));
    }

    #[test]
    #[cfg(feature = "i8080-arcade")]
    fn preloaded_sound_latch_starts_silent() {
        let description = single(
            DeviceKind::SoundLatch { repeat_mask: 0 },
            vec![BindingDescription::at(AddressSpace::Port, 3, 0, AccessMode::WriteOnly)],
            vec![0x0F],
        );
        let mut machine = description.build().expect("valid description");
        match machine.device_mut(crate::DeviceId::from_index(0)) {
            Some(crate::Peripheral::Sound(latch)) => {
                assert_eq!(latch.latch(), 0x0F);
                assert_eq!(latch.take_triggered(), 0x00);
            }
            other => panic!("expected a sound latch, found {other:?}"),
        }
    }

    #[test]
    #[cfg(feature = "i8080-arcade")]
    fn arcade_board_builds() {
        let machine = MachineDescription::i8080_arcade()
            .build()
            .expect("arcade description is valid");
        assert_eq!(machine.device_count(), 9);
        assert_eq!(machine.memory_map().len(), 2);
        assert_eq!(machine.interrupts().sources().count(), 2);
    }
}
