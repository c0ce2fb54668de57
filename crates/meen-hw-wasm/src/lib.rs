use meen_hw::{
    Access, AddressSpace, Machine, MachineDescription, Peripheral, SourceId, SourceState,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&JsValue::from_str(&format!($($t)*))))
}

/// Fill value for unmapped bytes in memory dumps.
const OPEN_BUS: u8 = 0xFF;

/// JS view of one interrupt source.
#[derive(Serialize)]
pub struct WasmInterruptSource {
    pub id: u8,
    pub vector: u8,
    pub state: &'static str,
    pub enabled: bool,
    pub deadline: u64,
}

const fn state_name(state: SourceState) -> &'static str {
    match state {
        SourceState::Disarmed => "disarmed",
        SourceState::Armed => "armed",
        SourceState::Due => "due",
        SourceState::Acknowledged => "acknowledged",
    }
}

#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Builds the i8080 arcade board.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<Self, JsError> {
        console_error_panic_hook::set_once();
        let machine = MachineDescription::i8080_arcade().build()?;
        console_log!("arcade board ready: {} devices", machine.device_count());
        Ok(Self { machine })
    }

    /// Builds a board from a JSON hardware description.
    pub fn from_json(text: &str) -> Result<Self, JsError> {
        console_error_panic_hook::set_once();
        let machine = MachineDescription::from_json_str(text)?.build()?;
        Ok(Self { machine })
    }

    /// The built-in arcade description, for editing on the JS side.
    pub fn arcade_description() -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(
            &MachineDescription::i8080_arcade(),
        )?)
    }

    /// Copies a program image into the start of the memory window mapped at
    /// `address`. Returns the number of bytes copied.
    pub fn load_image(&mut self, address: u16, image: &[u8]) -> usize {
        let Some(entry) = self.machine.memory_map().lookup(address).copied() else {
            return 0;
        };
        match self.machine.device_mut(entry.device) {
            Some(Peripheral::Memory(window)) => window.load(image),
            _ => 0,
        }
    }

    /// Copies `len` bytes starting at `start` out of memory space. Unmapped
    /// addresses read as `0xFF`.
    pub fn dump_memory(&mut self, start: u16, len: u16) -> js_sys::Uint8Array {
        let bytes: Vec<u8> = (0..len)
            .map(|step| {
                self.machine
                    .read(start.wrapping_add(step), AddressSpace::Memory)
                    .unwrap_or(OPEN_BUS)
            })
            .collect();
        js_sys::Uint8Array::from(bytes.as_slice())
    }

    pub fn read_memory(&mut self, address: u16) -> Result<u8, JsError> {
        Ok(self.machine.read(address, AddressSpace::Memory)?)
    }

    pub fn write_memory(&mut self, address: u16, value: u8) -> Result<(), JsError> {
        Ok(self.machine.write(address, AddressSpace::Memory, value)?)
    }

    /// `IN port`.
    pub fn read_port(&mut self, port: u8) -> Result<u8, JsError> {
        Ok(self.machine.read(u16::from(port), AddressSpace::Port)?)
    }

    /// `OUT port`.
    pub fn write_port(&mut self, port: u8, value: u8) -> Result<(), JsError> {
        Ok(self
            .machine
            .write(u16::from(port), AddressSpace::Port, value)?)
    }

    /// Advances the board and returns the `RST` opcode to deliver, if any.
    pub fn tick(&mut self, cycles: u32) -> Result<Option<u8>, JsError> {
        Ok(self
            .machine
            .tick(u64::from(cycles))?
            .map(|request| request.vector))
    }

    /// Source id of the interrupt [`Self::tick`] reported.
    #[must_use]
    pub fn pending_source(&self) -> Option<u8> {
        self.machine
            .interrupts()
            .next_due()
            .map(|request| request.source.get())
    }

    pub fn acknowledge(&mut self, source: u8) -> Result<(), JsError> {
        Ok(self.machine.acknowledge_interrupt(SourceId::new(source))?)
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.machine.cycles()
    }

    /// Sets switch bits on the bank read through `port`.
    pub fn press(&mut self, port: u8, mask: u8) -> bool {
        self.with_switches(port, |bank| bank.press(mask))
    }

    /// Clears switch bits on the bank read through `port`.
    pub fn release(&mut self, port: u8, mask: u8) -> bool {
        self.with_switches(port, |bank| bank.release(mask))
    }

    /// Drains the sound effects triggered through output `port`.
    pub fn take_sounds(&mut self, port: u8) -> u8 {
        let Some(entry) = self.machine.port_map().lookup(port, Access::Write).copied() else {
            return 0;
        };
        match self.machine.device_mut(entry.device) {
            Some(Peripheral::Sound(latch)) => latch.take_triggered(),
            _ => 0,
        }
    }

    /// Interrupt source table as a JS array.
    pub fn interrupt_sources(&self) -> Result<JsValue, JsValue> {
        let sources: Vec<WasmInterruptSource> = self
            .machine
            .interrupts()
            .sources()
            .map(|source| WasmInterruptSource {
                id: source.id().get(),
                vector: source.vector(),
                state: state_name(source.state()),
                enabled: source.enabled(),
                deadline: source.deadline(),
            })
            .collect();
        Ok(serde_wasm_bindgen::to_value(&sources)?)
    }
}

impl WasmMachine {
    fn with_switches(&mut self, port: u8, apply: impl FnOnce(&mut meen_hw::SwitchBank)) -> bool {
        let Some(entry) = self.machine.port_map().lookup(port, Access::Read).copied() else {
            return false;
        };
        match self.machine.device_mut(entry.device) {
            Some(Peripheral::Switches(bank)) => {
                apply(bank);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{state_name, WasmMachine};
    use meen_hw::{MachineDescription, SourceState};

    fn board() -> WasmMachine {
        WasmMachine {
            machine: MachineDescription::i8080_arcade()
                .build()
                .expect("arcade description is valid"),
        }
    }

    #[test]
    fn switch_and_sound_helpers_follow_port_bindings() {
        let mut board = board();
        assert!(board.press(1, 0x04));
        assert!(!board.press(3, 0x04));
        assert_eq!(board.machine.read(1, meen_hw::AddressSpace::Port), Ok(0x04));

        board
            .machine
            .write(5, meen_hw::AddressSpace::Port, 0x10)
            .expect("sound port");
        assert_eq!(board.take_sounds(5), 0x10);
        assert_eq!(board.take_sounds(5), 0x00);
        assert_eq!(board.take_sounds(0), 0x00);
    }

    #[test]
    fn images_load_into_the_window_under_the_address() {
        let mut board = board();
        assert_eq!(board.load_image(0x0000, &[0x31, 0x00, 0x24]), 3);
        assert_eq!(board.machine.read(0x0002, meen_hw::AddressSpace::Memory), Ok(0x24));
        assert_eq!(board.load_image(0x8000, &[1]), 0);
    }

    #[test]
    fn pending_source_tracks_the_due_interrupt() {
        let mut board = board();
        assert_eq!(board.pending_source(), None);
        board.machine.tick(20_000).expect("ticks");
        assert_eq!(board.pending_source(), Some(1));
        assert_eq!(state_name(SourceState::Due), "due");
    }

    #[test]
    fn json_board_ticks_and_acknowledges_screen_interrupts() {
        let text = serde_json::to_string(&MachineDescription::i8080_arcade())
            .expect("description serialises");
        let Ok(mut board) = WasmMachine::from_json(&text) else {
            panic!("arcade json builds");
        };

        assert!(matches!(board.tick(16_000), Ok(None)));
        assert!(matches!(board.tick(1_000), Ok(Some(0xCF))));
        assert_eq!(board.pending_source(), Some(1));
        assert!(board.acknowledge(1).is_ok());
        assert_eq!(board.pending_source(), None);

        assert!(matches!(board.tick(17_000), Ok(Some(0xD7))));
        assert!(board.acknowledge(2).is_ok());
        assert_eq!(board.cycles(), 34_000);
    }
}
