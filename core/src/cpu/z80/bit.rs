use crate::core::Bus;
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    // --- Rotate/shift core (CB family) ---

    /// Apply a CB rotate/shift (0=RLC 1=RRC 2=RL 3=RR 4=SLA 5=SRA 6=SLL 7=SRL).
    /// Sets the full flag set: S, Z, parity, H=0, N=0, C from the shifted-out
    /// bit, X/Y from the result.
    fn do_rot(&mut self, kind: u8, val: u8) -> u8 {
        let old_c = (self.f & Flag::C as u8) != 0;
        let (result, carry) = match kind {
            0 => (val.rotate_left(1), val & 0x80 != 0),                    // RLC
            1 => (val.rotate_right(1), val & 0x01 != 0),                   // RRC
            2 => ((val << 1) | old_c as u8, val & 0x80 != 0),              // RL
            3 => ((val >> 1) | ((old_c as u8) << 7), val & 0x01 != 0),     // RR
            4 => (val << 1, val & 0x80 != 0),                              // SLA
            5 => (((val as i8) >> 1) as u8, val & 0x01 != 0),              // SRA
            6 => ((val << 1) | 0x01, val & 0x80 != 0),                     // SLL (undocumented)
            7 => (val >> 1, val & 0x01 != 0),                              // SRL
            _ => unreachable!(),
        };

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if carry { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        result
    }

    /// BIT y test flags. C is preserved, H set, N cleared, Z/PV from the
    /// tested bit, S only for a set bit 7. X/Y come from `xy_src` — the
    /// operand byte for register forms, the internal address high byte for
    /// the memory forms.
    fn bit_flags(&mut self, y: u8, val: u8, xy_src: u8) {
        let tested = val & (1 << y);
        let mut f = (self.f & Flag::C as u8) | Flag::H as u8;
        if tested == 0 {
            f |= Flag::Z as u8 | Flag::PV as u8;
        }
        if y == 7 && tested != 0 { f |= Flag::S as u8; }
        f |= xy_src & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    /// CB prefix dispatch: rotates/shifts, BIT, RES, SET.
    /// Register forms 8 T, (HL) forms 15 T (12 T for BIT).
    pub(crate) fn dispatch_cb<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        if self.index_mode != IndexMode::HL {
            return self.dispatch_index_cb(bus);
        }

        let opcode = self.fetch_m1(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;

        match x {
            // Rotate/shift
            0 => {
                if z == 6 {
                    let addr = self.get_hl();
                    let val = bus.read(addr);
                    let result = self.do_rot(y, val);
                    bus.write(addr, result);
                    15
                } else {
                    let val = self.get_reg8(z);
                    let result = self.do_rot(y, val);
                    self.set_reg8(z, result);
                    8
                }
            }
            // BIT y, r / (HL)
            1 => {
                if z == 6 {
                    let val = bus.read(self.get_hl());
                    let xy = (self.memptr >> 8) as u8;
                    self.bit_flags(y, val, xy);
                    12
                } else {
                    let val = self.get_reg8(z);
                    self.bit_flags(y, val, val);
                    8
                }
            }
            // RES y, r / (HL)
            2 => {
                if z == 6 {
                    let addr = self.get_hl();
                    let val = bus.read(addr) & !(1 << y);
                    bus.write(addr, val);
                    15
                } else {
                    let val = self.get_reg8(z) & !(1 << y);
                    self.set_reg8(z, val);
                    8
                }
            }
            // SET y, r / (HL)
            _ => {
                if z == 6 {
                    let addr = self.get_hl();
                    let val = bus.read(addr) | (1 << y);
                    bus.write(addr, val);
                    15
                } else {
                    let val = self.get_reg8(z) | (1 << y);
                    self.set_reg8(z, val);
                    8
                }
            }
        }
    }

    /// DD CB d op / FD CB d op. The displacement and the fourth byte are data
    /// reads, not M1 cycles. Every op works on (IX+d); for a non-6 register
    /// field the result is also copied into that register (undocumented
    /// double-write). BIT only tests. Returns 16 (BIT) or 19; the caller
    /// already charged 4 T for the DD/FD prefix.
    fn dispatch_index_cb<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let d = self.fetch8(bus) as i8;
        let base = match self.index_mode {
            IndexMode::IX => self.ix,
            IndexMode::IY => self.iy,
            IndexMode::HL => unreachable!(),
        };
        let addr = base.wrapping_add(d as i16 as u16);
        self.memptr = addr;

        let opcode = self.fetch8(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;

        match x {
            0 => {
                let val = bus.read(addr);
                let result = self.do_rot(y, val);
                bus.write(addr, result);
                if z != 6 { self.set_reg8(z, result); }
                19
            }
            1 => {
                let val = bus.read(addr);
                self.bit_flags(y, val, (addr >> 8) as u8);
                16
            }
            2 => {
                let result = bus.read(addr) & !(1 << y);
                bus.write(addr, result);
                if z != 6 { self.set_reg8(z, result); }
                19
            }
            _ => {
                let result = bus.read(addr) | (1 << y);
                bus.write(addr, result);
                if z != 6 { self.set_reg8(z, result); }
                19
            }
        }
    }

    // --- Accumulator rotates — 4 T, S/Z/PV preserved ---

    pub(crate) fn op_rlca(&mut self) -> u32 {
        let carry = self.a & 0x80 != 0;
        self.a = self.a.rotate_left(1);
        self.acc_rotate_flags(carry);
        4
    }

    pub(crate) fn op_rrca(&mut self) -> u32 {
        let carry = self.a & 0x01 != 0;
        self.a = self.a.rotate_right(1);
        self.acc_rotate_flags(carry);
        4
    }

    pub(crate) fn op_rla(&mut self) -> u32 {
        let old_c = (self.f & Flag::C as u8) != 0;
        let carry = self.a & 0x80 != 0;
        self.a = (self.a << 1) | old_c as u8;
        self.acc_rotate_flags(carry);
        4
    }

    pub(crate) fn op_rra(&mut self) -> u32 {
        let old_c = (self.f & Flag::C as u8) != 0;
        let carry = self.a & 0x01 != 0;
        self.a = (self.a >> 1) | ((old_c as u8) << 7);
        self.acc_rotate_flags(carry);
        4
    }

    fn acc_rotate_flags(&mut self, carry: bool) {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    // --- Nibble rotates through (HL) (ED) — 18 T ---

    /// RRD: low nibble of (HL) into A, A's low nibble into the high nibble.
    pub(crate) fn op_rrd<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_hl();
        let m = bus.read(addr);
        let result = ((self.a & 0x0F) << 4) | (m >> 4);
        self.a = (self.a & 0xF0) | (m & 0x0F);
        bus.write(addr, result);
        self.memptr = addr.wrapping_add(1);
        self.nibble_rotate_flags();
        18
    }

    /// RLD: high nibble of (HL) into A, A's low nibble into the low nibble.
    pub(crate) fn op_rld<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_hl();
        let m = bus.read(addr);
        let result = (m << 4) | (self.a & 0x0F);
        self.a = (self.a & 0xF0) | (m >> 4);
        bus.write(addr, result);
        self.memptr = addr.wrapping_add(1);
        self.nibble_rotate_flags();
        18
    }

    fn nibble_rotate_flags(&mut self) {
        let mut f = self.f & Flag::C as u8;
        if self.a == 0 { f |= Flag::Z as u8; }
        if (self.a & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(self.a) { f |= Flag::PV as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }
}
