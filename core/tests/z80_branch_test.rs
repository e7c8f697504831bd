use mastersys_core::cpu::z80::Z80;
mod common;
use common::TestBus;

const FLAG_Z: u8 = 0x40;
const FLAG_C: u8 = 0x01;

#[test]
fn test_jp_nn() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xC3, 0x34, 0x12]); // JP 0x1234

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 10);
    assert_eq!(cpu.pc, 0x1234);
}

#[test]
fn test_jp_cc_taken_and_not() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.f = FLAG_Z;
    bus.load(0, &[0xCA, 0x00, 0x20]); // JP Z,0x2000

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 10, "JP cc is 10 T-states either way");
    assert_eq!(cpu.pc, 0x2000);

    cpu.pc = 0;
    cpu.f = 0;
    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 10);
    assert_eq!(cpu.pc, 3, "not taken falls through");
}

#[test]
fn test_jp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x4321);
    bus.load(0, &[0xE9]); // JP (HL)

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 4);
    assert_eq!(cpu.pc, 0x4321);
}

#[test]
fn test_jr_forward_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x18, 0x10]); // JR +0x10

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 12);
    assert_eq!(cpu.pc, 0x0012);

    bus.load(0x0012, &[0x18, 0xFE]); // JR -2 (tight loop)
    cpu.step_one(&mut bus);
    assert_eq!(cpu.pc, 0x0012);
}

#[test]
fn test_jr_cc_timing() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.f = 0;
    bus.load(0, &[0x28, 0x10]); // JR Z,+0x10 — not taken

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 7, "JR cc not taken is 7 T-states");
    assert_eq!(cpu.pc, 2);

    cpu.pc = 0;
    cpu.f = FLAG_Z;
    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 12, "JR cc taken is 12 T-states");
    assert_eq!(cpu.pc, 0x0012);
}

#[test]
fn test_djnz() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.b = 2;
    bus.load(0x0100, &[0x10, 0xFE]); // DJNZ -2
    cpu.pc = 0x0100;

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 13, "DJNZ taken is 13 T-states");
    assert_eq!(cpu.pc, 0x0100);
    assert_eq!(cpu.b, 1);

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 8, "DJNZ not taken is 8 T-states");
    assert_eq!(cpu.pc, 0x0102);
    assert_eq!(cpu.b, 0);
}

#[test]
fn test_call_and_ret() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1000;
    bus.load(0, &[0xCD, 0x00, 0x20]); // CALL 0x2000
    bus.load(0x2000, &[0xC9]); // RET

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 17);
    assert_eq!(cpu.pc, 0x2000);
    assert_eq!(cpu.sp, 0x0FFE);
    assert_eq!(bus.memory[0x0FFE], 0x03, "return address low");
    assert_eq!(bus.memory[0x0FFF], 0x00, "return address high");

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 10);
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.sp, 0x1000);
}

#[test]
fn test_call_cc_timing() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1000;
    cpu.f = 0;
    bus.load(0, &[0xDC, 0x00, 0x20]); // CALL C,0x2000 — not taken

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 10, "CALL cc not taken is 10 T-states");
    assert_eq!(cpu.pc, 3);

    cpu.pc = 0;
    cpu.f = FLAG_C;
    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 17, "CALL cc taken is 17 T-states");
    assert_eq!(cpu.pc, 0x2000);
}

#[test]
fn test_ret_cc_timing() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x0FFE;
    bus.memory[0x0FFE] = 0x00;
    bus.memory[0x0FFF] = 0x30;
    cpu.f = 0;
    bus.load(0, &[0xC8]); // RET Z — not taken

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 5, "RET cc not taken is 5 T-states");
    assert_eq!(cpu.pc, 1);

    cpu.pc = 0;
    cpu.f = FLAG_Z;
    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 11, "RET cc taken is 11 T-states");
    assert_eq!(cpu.pc, 0x3000);
}

#[test]
fn test_rst() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1000;
    bus.load(0x0100, &[0xFF]); // RST 38
    cpu.pc = 0x0100;

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 11);
    assert_eq!(cpu.pc, 0x0038);
    assert_eq!(bus.memory[0x0FFE], 0x01, "pushed return low");
    assert_eq!(bus.memory[0x0FFF], 0x01, "pushed return high");
}

#[test]
fn test_in_a_n() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.io_input = 0x5A;
    bus.load(0, &[0xDB, 0x7E]); // IN A,(0x7E)

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 11);
    assert_eq!(cpu.a, 0x5A);
}

#[test]
fn test_out_n_a() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x99;
    bus.load(0, &[0xD3, 0x7F]); // OUT (0x7F),A

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 11);
    assert_eq!(bus.io_writes, vec![(0x7F, 0x99)]);
}
