use super::sim::{Access, SimBus};
use super::Reg;

const ADDR: u32 = 0x4000_1000;

#[test]
fn full_write_skips_the_read() {
    let sim = SimBus::new();
    sim.clear_log();

    Reg::new(ADDR).write(&sim, 0xFFFF_FFFF);

    assert_eq!(sim.log(), [Access::Write(ADDR, 0xFFFF_FFFF)]);
}

#[test]
fn reserved_bits_keep_their_value() {
    let sim = SimBus::new();
    sim.set(ADDR, 0xA000_0005);
    let reg = Reg::new(ADDR).reserved(0x0000_FFFF, 0);

    reg.write(&sim, 0x1234_0000);
    assert_eq!(sim.get(ADDR), 0xA000_0000);

    reg.write(&sim, 0xFFFF_FFFF);
    assert_eq!(sim.get(ADDR), 0xA000_FFFF);
}

#[test]
fn forced_bits_are_always_written_as_one() {
    let sim = SimBus::new();
    let reg = Reg::new(ADDR).reserved(u32::MAX, 1 << 13);

    reg.write(&sim, 0);
    assert_eq!(sim.get(ADDR), 1 << 13);

    reg.clear_bits(&sim, 1 << 13);
    assert_eq!(sim.get(ADDR), 1 << 13);
    assert_eq!(reg.writable(), !(1 << 13));
}

#[test]
fn write_masked_only_touches_selected_bits() {
    let sim = SimBus::new();
    sim.set(ADDR, 0xFFFF_0000);
    let reg = Reg::new(ADDR);

    reg.write_masked(&sim, 0x0000_00AB, 0x0000_00FF);
    assert_eq!(sim.get(ADDR), 0xFFFF_00AB);
}

#[test]
fn modify_respects_reserved_mask() {
    let sim = SimBus::new();
    sim.set(ADDR, 0x8000_0000);
    let reg = Reg::new(ADDR).reserved(0x0000_00FF, 0);

    reg.modify(&sim, |_| 0x0000_0F0F);
    assert_eq!(sim.get(ADDR), 0x8000_000F);
    assert!(reg.any_set(&sim, 0x8000_0000));
}
