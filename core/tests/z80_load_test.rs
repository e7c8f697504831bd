use mastersys_core::cpu::z80::Z80;
mod common;
use common::TestBus;

const FLAG_PV: u8 = 0x04;

#[test]
fn test_ld_r_r() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.b = 0x42;
    bus.load(0, &[0x78]); // LD A,B

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 4);
    assert_eq!(cpu.a, 0x42);
}

#[test]
fn test_ld_r_hl_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x1234);
    bus.memory[0x1234] = 0x99;
    bus.load(0, &[0x7E, 0x70]); // LD A,(HL); LD (HL),B
    cpu.b = 0x55;

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 7);
    assert_eq!(cpu.a, 0x99);

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 7);
    assert_eq!(bus.memory[0x1234], 0x55);
}

#[test]
fn test_ld_hl_n() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x2000);
    bus.load(0, &[0x36, 0x77]); // LD (HL),n

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 10);
    assert_eq!(bus.memory[0x2000], 0x77);
}

#[test]
fn test_ld_a_bc_de() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_bc(0x1000);
    cpu.set_de(0x2000);
    bus.memory[0x1000] = 0x11;
    bus.memory[0x2000] = 0x22;
    bus.load(0, &[0x0A, 0x1A]); // LD A,(BC); LD A,(DE)

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 7);
    assert_eq!(cpu.a, 0x11);

    cpu.step_one(&mut bus);
    assert_eq!(cpu.a, 0x22);
}

#[test]
fn test_ld_nn_a_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x5A;
    bus.load(0, &[0x32, 0x00, 0x30, 0x3A, 0x00, 0x30]); // LD (0x3000),A; LD A,(0x3000)

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 13);
    assert_eq!(bus.memory[0x3000], 0x5A);

    cpu.a = 0;
    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 13);
    assert_eq!(cpu.a, 0x5A);
}

#[test]
fn test_ld_nn_hl_short_form() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0xBEEF);
    bus.load(0, &[0x22, 0x00, 0x40, 0x2A, 0x00, 0x40]); // LD (0x4000),HL; LD HL,(0x4000)

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 16);
    assert_eq!(bus.memory[0x4000], 0xEF, "low byte first");
    assert_eq!(bus.memory[0x4001], 0xBE);

    cpu.set_hl(0);
    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 16);
    assert_eq!(cpu.get_hl(), 0xBEEF);
}

#[test]
fn test_ld_rr_nn_ed_long_form() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_bc(0xCAFE);
    bus.load(0, &[0xED, 0x43, 0x00, 0x50]); // LD (0x5000),BC
    bus.load(4, &[0xED, 0x7B, 0x00, 0x50]); // LD SP,(0x5000)

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 20);
    assert_eq!(bus.memory[0x5000], 0xFE);
    assert_eq!(bus.memory[0x5001], 0xCA);

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 20);
    assert_eq!(cpu.sp, 0xCAFE);
}

#[test]
fn test_ld_sp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x8000);
    bus.load(0, &[0xF9]); // LD SP,HL

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 6);
    assert_eq!(cpu.sp, 0x8000);
}

#[test]
fn test_ex_de_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_de(0x1111);
    cpu.set_hl(0x2222);
    bus.load(0, &[0xEB]); // EX DE,HL

    cpu.step_one(&mut bus);
    assert_eq!(cpu.get_de(), 0x2222);
    assert_eq!(cpu.get_hl(), 0x1111);
}

#[test]
fn test_ex_af_and_exx() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x11;
    cpu.f = 0x22;
    cpu.a_prime = 0x33;
    cpu.f_prime = 0x44;
    cpu.set_bc(0x1234);
    cpu.b_prime = 0x56;
    cpu.c_prime = 0x78;
    bus.load(0, &[0x08, 0xD9]); // EX AF,AF'; EXX

    cpu.step_one(&mut bus);
    assert_eq!(cpu.a, 0x33);
    assert_eq!(cpu.f, 0x44);
    assert_eq!(cpu.a_prime, 0x11);

    cpu.step_one(&mut bus);
    assert_eq!(cpu.get_bc(), 0x5678);
    assert_eq!(cpu.b_prime, 0x12);
    assert_eq!(cpu.c_prime, 0x34);
}

#[test]
fn test_ld_a_i_pv_from_iff2() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.i = 0x80;
    cpu.iff2 = true;
    bus.load(0, &[0xED, 0x57]); // LD A,I

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 9);
    assert_eq!(cpu.a, 0x80);
    assert_ne!(cpu.f & FLAG_PV, 0, "PV mirrors IFF2");
    assert_ne!(cpu.f & 0x80, 0, "S from the value");

    cpu.pc = 0;
    cpu.iff2 = false;
    cpu.step_one(&mut bus);
    assert_eq!(cpu.f & FLAG_PV, 0);
}

#[test]
fn test_ld_i_a_and_r_a() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x42;
    bus.load(0, &[0xED, 0x47, 0xED, 0x4F]); // LD I,A; LD R,A

    let result = cpu.step_one(&mut bus);
    assert_eq!(result.cycles, 9);
    assert_eq!(cpu.i, 0x42);

    cpu.step_one(&mut bus);
    assert_eq!(cpu.r, 0x42);
}

#[test]
fn test_ld_a_r_counts_prefix_m1s() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.r = 0;
    bus.load(0, &[0xED, 0x5F]); // LD A,R

    cpu.step_one(&mut bus);
    // ED and 5F are both M1 fetches: R was incremented twice before the copy
    assert_eq!(cpu.a, 2, "LD A,R sees both prefix increments");
}
