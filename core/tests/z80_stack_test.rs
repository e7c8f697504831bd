use mastersys_core::cpu::z80::Z80;
mod common;
use common::TestBus;

#[test]
fn test_push_pop_bc() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1000;
    cpu.set_bc(0x1234);
    bus.load(0, &[0xC5, 0xD1]); // PUSH BC; POP DE

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 11, "PUSH should be 11 T-states");
    assert_eq!(cpu.sp, 0x0FFE);
    assert_eq!(bus.memory[0x0FFF], 0x12, "high byte pushed first");
    assert_eq!(bus.memory[0x0FFE], 0x34);

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 10, "POP should be 10 T-states");
    assert_eq!(cpu.sp, 0x1000);
    assert_eq!(cpu.get_de(), 0x1234);
}

#[test]
fn test_push_pop_af() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1000;
    cpu.a = 0xAB;
    cpu.f = 0xCD;
    bus.load(0, &[0xF5, 0xF1]); // PUSH AF; POP AF

    cpu.step_one(&mut bus);
    cpu.a = 0;
    cpu.f = 0;
    cpu.step_one(&mut bus);
    assert_eq!(cpu.a, 0xAB);
    assert_eq!(cpu.f, 0xCD);
}

#[test]
fn test_ex_sp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1000;
    cpu.set_hl(0x1234);
    bus.memory[0x1000] = 0x78;
    bus.memory[0x1001] = 0x56;
    bus.load(0, &[0xE3]); // EX (SP),HL

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 19);
    assert_eq!(cpu.get_hl(), 0x5678);
    assert_eq!(bus.memory[0x1000], 0x34);
    assert_eq!(bus.memory[0x1001], 0x12);
    assert_eq!(cpu.sp, 0x1000, "SP itself is unchanged");
}

#[test]
fn test_stack_wraps() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x0001;
    cpu.set_bc(0xAABB);
    bus.load(0x0100, &[0xC5]); // PUSH BC
    cpu.pc = 0x0100;

    cpu.step_one(&mut bus);
    assert_eq!(cpu.sp, 0xFFFF);
    assert_eq!(bus.memory[0x0000], 0xAA);
    assert_eq!(bus.memory[0xFFFF], 0xBB);
}
