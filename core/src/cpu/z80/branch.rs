use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    // --- Jumps ---

    /// JP nn — 10 T
    pub(crate) fn op_jp_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        self.pc = addr;
        self.memptr = addr;
        10
    }

    /// JP cc,nn — 10 T taken or not
    pub(crate) fn op_jp_cc_nn<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.fetch16(bus);
        self.memptr = addr;
        if self.cond(cc) {
            self.pc = addr;
        }
        10
    }

    /// JP (HL) — 4 T (JP (IX)/(IY) under a prefix, no displacement)
    pub(crate) fn op_jp_hl(&mut self) -> u32 {
        self.pc = self.get_rp(2);
        4
    }

    /// JR e — 12 T
    pub(crate) fn op_jr_e<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let d = self.fetch8(bus) as i8;
        self.pc = self.pc.wrapping_add(d as i16 as u16);
        self.memptr = self.pc;
        12
    }

    /// JR cc,e — 12 T taken / 7 T not taken (NZ/Z/NC/C only)
    pub(crate) fn op_jr_cc_e<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let cc = (opcode >> 3) & 0x03;
        let d = self.fetch8(bus) as i8;
        if self.cond(cc) {
            self.pc = self.pc.wrapping_add(d as i16 as u16);
            self.memptr = self.pc;
            12
        } else {
            7
        }
    }

    /// DJNZ e — 13 T taken / 8 T not taken
    pub(crate) fn op_djnz<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let d = self.fetch8(bus) as i8;
        self.b = self.b.wrapping_sub(1);
        if self.b != 0 {
            self.pc = self.pc.wrapping_add(d as i16 as u16);
            self.memptr = self.pc;
            13
        } else {
            8
        }
    }

    // --- Calls and returns ---

    /// CALL nn — 17 T
    pub(crate) fn op_call_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        let pc = self.pc;
        self.push16(bus, pc);
        self.pc = addr;
        self.memptr = addr;
        17
    }

    /// CALL cc,nn — 17 T taken / 10 T not taken
    pub(crate) fn op_call_cc_nn<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.fetch16(bus);
        self.memptr = addr;
        if self.cond(cc) {
            let pc = self.pc;
            self.push16(bus, pc);
            self.pc = addr;
            17
        } else {
            10
        }
    }

    /// RET — 10 T
    pub(crate) fn op_ret<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.pc = self.pop16(bus);
        self.memptr = self.pc;
        10
    }

    /// RET cc — 11 T taken / 5 T not taken
    pub(crate) fn op_ret_cc<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        if self.cond(cc) {
            self.pc = self.pop16(bus);
            self.memptr = self.pc;
            11
        } else {
            5
        }
    }

    /// RST p — 11 T
    pub(crate) fn op_rst<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let pc = self.pc;
        self.push16(bus, pc);
        self.pc = (opcode & 0x38) as u16;
        self.memptr = self.pc;
        11
    }

    /// RETN/RETI (ED) — 14 T. Both restore IFF1 from IFF2.
    pub(crate) fn op_retn<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.pc = self.pop16(bus);
        self.memptr = self.pc;
        self.iff1 = self.iff2;
        14
    }

    // --- IO ---

    /// IN A,(n) — 11 T. Port high byte is A. No flags.
    pub(crate) fn op_in_a_n<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.fetch8(bus);
        let port = ((self.a as u16) << 8) | n as u16;
        self.a = bus.io_read(port);
        self.memptr = port.wrapping_add(1);
        11
    }

    /// OUT (n),A — 11 T.
    pub(crate) fn op_out_n_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.fetch8(bus);
        let port = ((self.a as u16) << 8) | n as u16;
        bus.io_write(port, self.a);
        self.memptr = ((self.a as u16) << 8) | (n.wrapping_add(1) as u16);
        11
    }

    /// IN r,(C) (ED) — 12 T. r=6 discards the input into flags only.
    pub(crate) fn op_in_r_c<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let r = (opcode >> 3) & 0x07;
        let port = self.get_bc();
        let val = bus.io_read(port);
        self.memptr = port.wrapping_add(1);
        if r != 6 {
            self.set_reg8(r, val);
        }

        let mut f = self.f & Flag::C as u8;
        if val == 0 { f |= Flag::Z as u8; }
        if (val & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(val) { f |= Flag::PV as u8; }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        12
    }

    /// OUT (C),r (ED) — 12 T. r=6 writes 0 (NMOS behavior).
    pub(crate) fn op_out_c_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let r = (opcode >> 3) & 0x07;
        let val = if r == 6 { 0 } else { self.get_reg8(r) };
        let port = self.get_bc();
        bus.io_write(port, val);
        self.memptr = port.wrapping_add(1);
        12
    }

    // --- Interrupt control ---

    /// DI — 4 T
    pub(crate) fn op_di(&mut self) -> u32 {
        self.iff1 = false;
        self.iff2 = false;
        4
    }

    /// EI — 4 T. Interrupts stay masked for one more instruction.
    pub(crate) fn op_ei(&mut self) -> u32 {
        self.iff1 = true;
        self.iff2 = true;
        self.ei_delay = true;
        4
    }

    /// IM 0/1/2 (ED) — 8 T, undocumented mirrors included.
    pub(crate) fn op_im(&mut self, opcode: u8) -> u32 {
        self.im = match (opcode >> 3) & 0x03 {
            2 => 1,
            3 => 2,
            _ => 0,
        };
        8
    }
}
