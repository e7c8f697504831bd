use crate::core::Bus;
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    // --- 8-bit loads ---

    /// LD r,r' — 4 T registers / 7 T through memory (plus displacement).
    ///
    /// Under DD/FD the pure-register forms address IXH/IXL (IYH/IYL), but the
    /// memory forms pair (IX+d) with the ordinary H/L registers.
    pub(crate) fn op_ld_r_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dst = (opcode >> 3) & 0x07;
        let src = opcode & 0x07;

        if src == 6 {
            // LD r, (HL)/(IX+d)
            let (addr, extra) = self.fetch_index_addr(bus);
            let val = bus.read(addr);
            self.set_reg8(dst, val);
            7 + extra
        } else if dst == 6 {
            // LD (HL)/(IX+d), r
            let val = self.get_reg8(src);
            let (addr, extra) = self.fetch_index_addr(bus);
            bus.write(addr, val);
            7 + extra
        } else {
            let val = self.get_reg8_ix(src);
            self.set_reg8_ix(dst, val);
            4
        }
    }

    /// LD r,n — 7 T; LD (HL),n — 10 T; LD (IX+d),n — 15 T here (the
    /// displacement comes before the immediate and there is no internal
    /// 5 T padding, so the indexed form is not 10+8).
    pub(crate) fn op_ld_r_n<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            let (addr, _) = self.fetch_index_addr(bus);
            let val = self.fetch8(bus);
            bus.write(addr, val);
            if self.index_mode == IndexMode::HL { 10 } else { 15 }
        } else {
            let val = self.fetch8(bus);
            self.set_reg8_ix(r, val);
            7
        }
    }

    /// LD A,(BC) — 7 T
    pub(crate) fn op_ld_a_bc<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_bc();
        self.a = bus.read(addr);
        self.memptr = addr.wrapping_add(1);
        7
    }

    /// LD A,(DE) — 7 T
    pub(crate) fn op_ld_a_de<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_de();
        self.a = bus.read(addr);
        self.memptr = addr.wrapping_add(1);
        7
    }

    /// LD (BC),A — 7 T
    pub(crate) fn op_ld_bc_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_bc();
        bus.write(addr, self.a);
        self.memptr = ((self.a as u16) << 8) | (addr.wrapping_add(1) & 0x00FF);
        7
    }

    /// LD (DE),A — 7 T
    pub(crate) fn op_ld_de_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_de();
        bus.write(addr, self.a);
        self.memptr = ((self.a as u16) << 8) | (addr.wrapping_add(1) & 0x00FF);
        7
    }

    /// LD A,(nn) — 13 T
    pub(crate) fn op_ld_a_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        self.a = bus.read(addr);
        self.memptr = addr.wrapping_add(1);
        13
    }

    /// LD (nn),A — 13 T
    pub(crate) fn op_ld_nn_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        bus.write(addr, self.a);
        self.memptr = ((self.a as u16) << 8) | (addr.wrapping_add(1) & 0x00FF);
        13
    }

    // --- 16-bit loads ---

    /// LD rr,nn — 10 T (rr=2 is IX/IY under a prefix)
    pub(crate) fn op_ld_rr_nn<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let val = self.fetch16(bus);
        self.set_rp(rp, val);
        10
    }

    /// LD (nn),HL — 16 T (short form; HL is IX/IY under a prefix)
    pub(crate) fn op_ld_nn_hl<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        let val = self.get_rp(2);
        self.write16(bus, addr, val);
        self.memptr = addr.wrapping_add(1);
        16
    }

    /// LD HL,(nn) — 16 T (short form)
    pub(crate) fn op_ld_hl_nn_ind<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        let val = self.read16(bus, addr);
        self.set_rp(2, val);
        self.memptr = addr.wrapping_add(1);
        16
    }

    /// LD (nn),rr (ED long form, includes the redundant HL encoding) — 20 T
    pub(crate) fn op_ld_nn_rr_ed<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch16(bus);
        let val = self.get_rp(rp);
        self.write16(bus, addr, val);
        self.memptr = addr.wrapping_add(1);
        20
    }

    /// LD rr,(nn) (ED long form) — 20 T
    pub(crate) fn op_ld_rr_nn_ed<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch16(bus);
        let val = self.read16(bus, addr);
        self.set_rp(rp, val);
        self.memptr = addr.wrapping_add(1);
        20
    }

    /// LD SP,HL — 6 T (SP,IX/IY under a prefix)
    pub(crate) fn op_ld_sp_hl(&mut self) -> u32 {
        self.sp = self.get_rp(2);
        6
    }

    // --- Exchanges ---

    /// EX AF,AF' — 4 T
    pub(crate) fn op_ex_af_af(&mut self) -> u32 {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
        4
    }

    /// EX DE,HL — 4 T. Always the real HL, prefix or not.
    pub(crate) fn op_ex_de_hl(&mut self) -> u32 {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
        4
    }

    /// EXX — 4 T
    pub(crate) fn op_exx(&mut self) -> u32 {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
        4
    }

    // --- I and R transfers (ED) — 9 T each ---

    pub(crate) fn op_ld_i_a(&mut self) -> u32 {
        self.i = self.a;
        9
    }

    pub(crate) fn op_ld_r_a(&mut self) -> u32 {
        self.r = self.a;
        9
    }

    /// LD A,I — flags from the value, PV = IFF2.
    pub(crate) fn op_ld_a_i(&mut self) -> u32 {
        self.a = self.i;
        self.ir_transfer_flags();
        9
    }

    /// LD A,R — flags from the value, PV = IFF2.
    pub(crate) fn op_ld_a_r(&mut self) -> u32 {
        self.a = self.r;
        self.ir_transfer_flags();
        9
    }

    fn ir_transfer_flags(&mut self) {
        let mut f = self.f & Flag::C as u8;
        if self.a == 0 { f |= Flag::Z as u8; }
        if (self.a & 0x80) != 0 { f |= Flag::S as u8; }
        if self.iff2 { f |= Flag::PV as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }
}
