use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    // --- Flag Helpers ---

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() % 2 == 0
    }

    fn update_flags_logic(&mut self, result: u8, is_and: bool) {
        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if is_and { f |= Flag::H as u8; } // AND sets H, others clear it
        // N is 0, C is 0

        // Undocumented X/Y
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    fn do_add(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let result_u16 = (a as u16) + (val as u16) + (c_val as u16);
        let result = result_u16 as u8;

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        // H: ((A & 0xF) + (val & 0xF) + c) > 0xF
        if ((a & 0xF) + (val & 0xF) + c_val) > 0xF { f |= Flag::H as u8; }
        // P/V: Overflow = (op1 ^ res) & (op2 ^ res) & 0x80
        if ((a ^ result) & (val ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        // C: result > 0xFF
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.set_f(f);
    }

    fn do_sub(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let result_u16 = (a as u16).wrapping_sub(val as u16).wrapping_sub(c_val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        // H: (A & 0xF) < ((val & 0xF) + c)
        if (a & 0xF) < ((val & 0xF) + c_val) { f |= Flag::H as u8; }
        // P/V: Overflow = (op1 ^ op2) & (op1 ^ res) & 0x80
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        // C: borrow
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.set_f(f);
    }

    fn do_cp(&mut self, val: u8) {
        let a = self.a;
        let result_u16 = (a as u16).wrapping_sub(val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0xF) < (val & 0xF) { f |= Flag::H as u8; }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        // X/Y come from the operand for CP, not the result
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    pub(crate) fn perform_alu_op(&mut self, op: u8, val: u8) {
        match op {
            0 => self.do_add(val, false), // ADD
            1 => self.do_add(val, true),  // ADC
            2 => self.do_sub(val, false), // SUB
            3 => self.do_sub(val, true),  // SBC
            4 => { self.a &= val; self.update_flags_logic(self.a, true); }  // AND
            5 => { self.a ^= val; self.update_flags_logic(self.a, false); } // XOR
            6 => { self.a |= val; self.update_flags_logic(self.a, false); } // OR
            7 => self.do_cp(val),         // CP
            _ => unreachable!(),
        }
    }

    // --- Instructions ---

    /// ALU A, r
    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP
    /// Opcode mask: 10 xxx zzz
    pub(crate) fn op_alu_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let alu_op = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;

        if r == 6 {
            // ALU A, (HL)/(IX+d)/(IY+d)
            let (addr, extra) = self.fetch_index_addr(bus);
            let val = bus.read(addr);
            self.perform_alu_op(alu_op, val);
            7 + extra
        } else {
            let val = self.get_reg8_ix(r);
            self.perform_alu_op(alu_op, val);
            4
        }
    }

    /// ALU A, n
    /// Opcode mask: 11 xxx 110
    pub(crate) fn op_alu_n<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let alu_op = (opcode >> 3) & 0x07;
        let val = self.fetch8(bus);
        self.perform_alu_op(alu_op, val);
        7
    }

    /// INC/DEC r
    /// Opcode mask: 00 rrr 10x
    pub(crate) fn op_inc_dec_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let r = (opcode >> 3) & 0x07;
        let is_dec = (opcode & 0x01) != 0;

        if r == 6 {
            // INC/DEC (HL)/(IX+d) — read-modify-write
            let (addr, extra) = self.fetch_index_addr(bus);
            let val = bus.read(addr);
            let result = if is_dec {
                self.calc_dec_flags(val)
            } else {
                self.calc_inc_flags(val)
            };
            bus.write(addr, result);
            11 + extra
        } else {
            let val = self.get_reg8_ix(r);
            let result = if is_dec {
                self.calc_dec_flags(val)
            } else {
                self.calc_inc_flags(val)
            };
            self.set_reg8_ix(r, result);
            4
        }
    }

    fn calc_inc_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.f & Flag::C as u8; // Preserve C
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0xF { f |= Flag::H as u8; }
        if val == 0x7F { f |= Flag::PV as u8; } // Overflow 7F -> 80
        // N is 0
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        result
    }

    fn calc_dec_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8; // Preserve C, set N
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0x0 { f |= Flag::H as u8; } // Borrow from bit 4
        if val == 0x80 { f |= Flag::PV as u8; } // Overflow 80 -> 7F
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        result
    }

    // --- 16-bit arithmetic ---

    /// ADD HL,rr (HL is IX/IY under a prefix) — 11 T.
    /// Sets H from bit-11 carry and C; preserves S, Z, PV.
    pub(crate) fn op_add_hl_rr(&mut self, opcode: u8) -> u32 {
        let src = (opcode >> 4) & 0x03;
        let hl = self.get_rp(2);
        let val = self.get_rp(src);
        let result = hl.wrapping_add(val);

        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if ((hl & 0x0FFF) + (val & 0x0FFF)) > 0x0FFF { f |= Flag::H as u8; }
        if (hl as u32 + val as u32) > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);

        self.memptr = hl.wrapping_add(1);
        self.set_rp(2, result);
        self.set_f(f);
        11
    }

    /// ADC HL,rr — 15 T. Full flags including S/Z/PV.
    pub(crate) fn op_adc_hl_rr(&mut self, opcode: u8) -> u32 {
        let src = (opcode >> 4) & 0x03;
        let hl = self.get_hl();
        let val = self.get_rp(src);
        let c = (self.f & Flag::C as u8) as u16;
        let result_u32 = hl as u32 + val as u32 + c as u32;
        let result = result_u32 as u16;

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x8000) != 0 { f |= Flag::S as u8; }
        if ((hl & 0x0FFF) + (val & 0x0FFF) + c) > 0x0FFF { f |= Flag::H as u8; }
        if ((hl ^ result) & (val ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if result_u32 > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);

        self.memptr = hl.wrapping_add(1);
        self.set_hl(result);
        self.set_f(f);
        15
    }

    /// SBC HL,rr — 15 T. Full flags including S/Z/PV.
    pub(crate) fn op_sbc_hl_rr(&mut self, opcode: u8) -> u32 {
        let src = (opcode >> 4) & 0x03;
        let hl = self.get_hl();
        let val = self.get_rp(src);
        let c = (self.f & Flag::C as u8) as u16;
        let result_u32 = (hl as u32).wrapping_sub(val as u32).wrapping_sub(c as u32);
        let result = result_u32 as u16;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x8000) != 0 { f |= Flag::S as u8; }
        if (hl & 0x0FFF) < (val & 0x0FFF) + c { f |= Flag::H as u8; }
        if ((hl ^ val) & (hl ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if result_u32 > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);

        self.memptr = hl.wrapping_add(1);
        self.set_hl(result);
        self.set_f(f);
        15
    }

    /// INC/DEC rr — 6 T. No flags.
    pub(crate) fn op_inc_dec_rr(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let val = self.get_rp(rp);
        let result = if (opcode & 0x08) != 0 {
            val.wrapping_sub(1)
        } else {
            val.wrapping_add(1)
        };
        self.set_rp(rp, result);
        6
    }

    // --- Misc ALU ---

    /// DAA — 4 T. BCD-adjust A after an add or subtract.
    pub(crate) fn op_daa(&mut self) -> u32 {
        let a = self.a;
        let n = (self.f & Flag::N as u8) != 0;
        let mut adjust = 0u8;
        let mut carry = (self.f & Flag::C as u8) != 0;

        if (self.f & Flag::H as u8) != 0 || (a & 0x0F) > 0x09 {
            adjust |= 0x06;
        }
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }

        let result = if n { a.wrapping_sub(adjust) } else { a.wrapping_add(adjust) };

        let mut f = self.f & Flag::N as u8; // N preserved
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if ((a ^ result) & 0x10) != 0 { f |= Flag::H as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if carry { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.set_f(f);
        4
    }

    /// CPL — 4 T. Sets H and N; S/Z/PV/C preserved.
    pub(crate) fn op_cpl(&mut self) -> u32 {
        self.a = !self.a;
        let mut f = self.f
            & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        4
    }

    /// SCF — 4 T. Sets C, clears H and N. X/Y follow the Q rule: when the
    /// previous instruction modified flags they come from A alone, otherwise
    /// from A OR the old F.
    pub(crate) fn op_scf(&mut self) -> u32 {
        let xy_src = if self.prev_q != 0 { self.a } else { self.a | self.f };
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        f |= Flag::C as u8;
        f |= xy_src & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        4
    }

    /// CCF — 4 T. Inverts C, sets H from the previous C, clears N.
    pub(crate) fn op_ccf(&mut self) -> u32 {
        let old_c = (self.f & Flag::C as u8) != 0;
        let xy_src = if self.prev_q != 0 { self.a } else { self.a | self.f };
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c {
            f |= Flag::H as u8;
        } else {
            f |= Flag::C as u8;
        }
        f |= xy_src & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        4
    }

    /// NEG (ED) — 8 T. A := 0 - A.
    pub(crate) fn op_neg(&mut self) -> u32 {
        let val = self.a;
        self.a = 0;
        self.do_sub(val, false);
        8
    }
}
