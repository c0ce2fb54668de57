//! Behaviour of the built-in i8080 arcade board as the CPU sees it.

#![cfg(all(feature = "i8080-arcade", feature = "alloc"))]
#![allow(clippy::pedantic, clippy::nursery)]

use env_logger as _;
use log as _;
use meen_hw::config::arcade;
use meen_hw::{
    AccessError, AddressSpace, DeviceId, Machine, MachineDescription, Peripheral, SourceId,
    FRAME_CYCLES,
};
use proptest as _;
use rstest::{fixture, rstest};
#[cfg(feature = "serde")]
use serde as _;
#[cfg(feature = "json")]
use serde_json as _;
use thiserror as _;

#[fixture]
fn board() -> Machine {
    let _ = env_logger::builder().is_test(true).try_init();
    MachineDescription::i8080_arcade()
        .build()
        .expect("arcade description is valid")
}

fn out(machine: &mut Machine, port: u16, value: u8) {
    machine
        .write(port, AddressSpace::Port, value)
        .expect("output port is bound");
}

fn input(machine: &mut Machine, port: u16) -> u8 {
    machine
        .read(port, AddressSpace::Port)
        .expect("input port is bound")
}

fn sounds(machine: &mut Machine, latch: DeviceId) -> u8 {
    match machine.device_mut(latch) {
        Some(Peripheral::Sound(sound)) => sound.take_triggered(),
        other => panic!("expected a sound latch, found {other:?}"),
    }
}

#[rstest]
fn port_zero_powers_up_as_0x40(mut board: Machine) {
    assert_eq!(input(&mut board, 0), 0x40);
    assert_eq!(input(&mut board, 1), 0x00);
    assert_eq!(input(&mut board, 2), 0x00);
}

#[rstest]
#[case(3, arcade::SOUND_1)]
#[case(5, arcade::SOUND_2)]
fn sound_effects_trigger_on_rising_edges(
    mut board: Machine,
    #[case] port: u16,
    #[case] latch: DeviceId,
) {
    for (value, expected) in [
        (0x02, 0x02),
        (0x02, 0x00),
        (0x06, 0x04),
        (0x04, 0x00),
        (0x06, 0x02),
        (0x00, 0x00),
    ] {
        out(&mut board, port, value);
        assert_eq!(sounds(&mut board, latch), expected, "after writing {value:#04x}");
    }
}

#[rstest]
fn ufo_sound_repeats_until_released(mut board: Machine) {
    for (value, expected) in [(0x03, 0x03), (0x03, 0x01), (0x00, 0x01), (0x00, 0x00)] {
        out(&mut board, 3, value);
        assert_eq!(sounds(&mut board, arcade::SOUND_1), expected);
    }
}

#[rstest]
fn shift_register_walks_through_ports(mut board: Machine) {
    out(&mut board, 4, 0xFF);
    out(&mut board, 4, 0x00);

    for amount in 0_u8..8 {
        out(&mut board, 2, amount);
        assert_eq!(input(&mut board, 3), (1_u8 << amount).wrapping_sub(1));
    }
}

#[rstest]
fn shared_port_numbers_keep_their_directions(mut board: Machine) {
    if let Some(Peripheral::Switches(dips)) = board.device_mut(arcade::INPUT_2) {
        dips.press(0x03);
    }
    out(&mut board, 2, 0x05);
    assert_eq!(input(&mut board, 2), 0x03);

    assert!(matches!(
        board.read(6, AddressSpace::Port),
        Err(AccessError::AccessDenied { .. })
    ));
    assert!(matches!(
        board.write(7, AddressSpace::Port, 0),
        Err(AccessError::Unmapped { .. })
    ));
}

#[rstest]
fn rom_rejects_writes_and_ram_accepts_them(mut board: Machine) {
    assert!(matches!(
        board.write(0x0010, AddressSpace::Memory, 0xFF),
        Err(AccessError::AccessDenied { .. })
    ));
    board
        .write(0x2400, AddressSpace::Memory, 0x81)
        .expect("video ram is writable");
    assert_eq!(board.read(0x2400, AddressSpace::Memory), Ok(0x81));
    assert_eq!(board.read(0x0010, AddressSpace::Memory), Ok(0x00));
}

#[rstest]
fn screen_interrupts_alternate(mut board: Machine) {
    let mut delivered = Vec::new();
    while board.cycles() < FRAME_CYCLES * 3 {
        if let Some(request) = board.tick(1_000).expect("no device raises unknown sources") {
            delivered.push(request.vector);
            board
                .acknowledge_interrupt(request.source)
                .expect("due source acknowledges");
        }
    }

    assert_eq!(delivered, [0xCF, 0xD7, 0xCF, 0xD7, 0xCF, 0xD7]);
}

#[rstest]
fn watchdog_ships_disabled(mut board: Machine) {
    out(&mut board, 6, 0xFF);
    let request = board.tick(u64::from(u32::MAX)).expect("ticks");
    assert_eq!(request.map(|r| r.source), Some(SourceId::new(1)));
    assert!(board.interrupts().source(arcade::WATCHDOG_SOURCE).is_none());
}
