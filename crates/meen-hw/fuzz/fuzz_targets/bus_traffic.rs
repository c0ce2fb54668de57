#![no_main]

use libfuzzer_sys::fuzz_target;
use meen_hw::{AddressSpace, MachineDescription};

fuzz_target!(|data: &[u8]| {
    let Ok(mut machine) = MachineDescription::i8080_arcade().build() else {
        return;
    };

    for chunk in data.chunks_exact(4) {
        let address = u16::from_le_bytes([chunk[1], chunk[2]]);
        let value = chunk[3];
        let space = if chunk[0] & 0x01 == 0 {
            AddressSpace::Memory
        } else {
            AddressSpace::Port
        };

        match (chunk[0] >> 1) & 0x03 {
            0 => {
                let _ = machine.read(address, space);
            }
            1 => {
                let _ = machine.write(address, space, value);
            }
            2 => {
                if let Ok(Some(request)) = machine.tick(u64::from(value) * 64) {
                    let _ = machine.acknowledge_interrupt(request.source);
                }
            }
            _ => {
                let _ = machine.tick(u64::from(address));
            }
        }
    }
});
