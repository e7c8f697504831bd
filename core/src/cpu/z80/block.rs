use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

/// Collapsed block-transfer chunks stop once another iteration would push the
/// step past one scanline of T-states, so frame timing events cannot be
/// stepped over.
const BLOCK_CHUNK_CYCLES: u32 = 228;

impl Z80 {
    // --- Block transfer ---

    /// One LDI/LDD transfer: (DE) <- (HL), HL/DE stepped, BC decremented.
    /// Flags: S/Z/C preserved, H/N cleared, PV = BC != 0, X/Y from (val + A).
    fn ldi_ldd_once<B: Bus + ?Sized>(&mut self, dec: bool, bus: &mut B) {
        let val = bus.read(self.get_hl());
        bus.write(self.get_de(), val);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_de(self.get_de().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));

        let n = val.wrapping_add(self.a);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
        if self.get_bc() != 0 { f |= Flag::PV as u8; }
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.set_f(f);
    }

    /// LDI (0xA0) / LDD (0xA8) — 16 T.
    pub(crate) fn op_ldi_ldd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        self.ldi_ldd_once(dec, bus);
        16
    }

    /// LDIR/LDDR — 21 T per repeating iteration, 16 T for the final one.
    ///
    /// Iterations are collapsed into one step while they fit in the chunk
    /// budget; memory, HL/DE/BC, and flags end up exactly as if stepped one
    /// iteration at a time. When the budget runs out with BC != 0 the PC is
    /// rewound to the opcode so the transfer resumes at the next step, which
    /// is also where an interrupt can cut in — just like hardware.
    pub(crate) fn op_ldir_lddr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        let mut cycles = 0u32;
        loop {
            self.ldi_ldd_once(dec, bus);
            if self.get_bc() == 0 {
                cycles += 16;
                return cycles;
            }
            cycles += 21;
            self.memptr = self.pc.wrapping_sub(1);
            if cycles + 21 > BLOCK_CHUNK_CYCLES {
                self.pc = self.pc.wrapping_sub(2);
                return cycles;
            }
        }
    }

    // --- Block compare ---

    /// One CPI/CPD compare: flags from A - (HL), HL stepped, BC decremented.
    fn cpi_cpd_once<B: Bus + ?Sized>(&mut self, dec: bool, bus: &mut B) {
        let val = bus.read(self.get_hl());
        let result = self.a.wrapping_sub(val);
        let h = (self.a & 0xF) < (val & 0xF);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));
        self.memptr = self.memptr.wrapping_add(delta);

        let mut f = (self.f & Flag::C as u8) | Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if h { f |= Flag::H as u8; }
        if self.get_bc() != 0 { f |= Flag::PV as u8; }
        // Undocumented X/Y: n = result - H
        let n = result.wrapping_sub(h as u8);
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.set_f(f);
    }

    /// CPI (0xA1) / CPD (0xA9) — 16 T.
    pub(crate) fn op_cpi_cpd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        self.cpi_cpd_once(dec, bus);
        16
    }

    /// CPIR/CPDR — 21 T repeating / 16 T when done (BC == 0 or match found).
    /// Collapsed like LDIR, same chunk budget and resume-by-rewind rule.
    pub(crate) fn op_cpir_cpdr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        let mut cycles = 0u32;
        loop {
            self.cpi_cpd_once(dec, bus);
            let found = (self.f & Flag::Z as u8) != 0;
            if self.get_bc() == 0 || found {
                cycles += 16;
                return cycles;
            }
            cycles += 21;
            self.memptr = self.pc.wrapping_sub(1);
            if cycles + 21 > BLOCK_CHUNK_CYCLES {
                self.pc = self.pc.wrapping_sub(2);
                return cycles;
            }
        }
    }

    // --- Block IO ---

    /// Flags shared by the INI/IND/OUTI/OUTD family: S/Z/X/Y from the
    /// decremented B, N from bit 7 of the transferred byte, H and C from the
    /// 9-bit intermediate `k`, PV = parity((k & 7) ^ B).
    fn block_io_flags(&mut self, val: u8, k: u16) {
        let b = self.b;
        let mut f = 0;
        if b == 0 { f |= Flag::Z as u8; }
        if (b & 0x80) != 0 { f |= Flag::S as u8; }
        f |= b & (Flag::X as u8 | Flag::Y as u8);
        if (val & 0x80) != 0 { f |= Flag::N as u8; }
        if k > 0xFF {
            f |= Flag::H as u8 | Flag::C as u8;
        }
        if Self::get_parity(((k & 0x07) as u8) ^ b) { f |= Flag::PV as u8; }
        self.set_f(f);
    }

    /// One INI/IND: (HL) <- IN(BC), B decremented, HL stepped.
    fn ini_ind_once<B: Bus + ?Sized>(&mut self, dec: bool, bus: &mut B) {
        let port = self.get_bc();
        let val = bus.io_read(port);
        self.b = self.b.wrapping_sub(1);
        bus.write(self.get_hl(), val);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.memptr = port.wrapping_add(delta);

        let k = val as u16 + (self.c.wrapping_add(if dec { 0xFF } else { 1 }) as u16);
        self.block_io_flags(val, k);
    }

    /// INI (0xA2) / IND (0xAA) — 16 T.
    pub(crate) fn op_ini_ind<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        self.ini_ind_once(dec, bus);
        16
    }

    /// INIR/INDR — 21/16 T. One iteration per step; IO has side effects, so
    /// repeats are never collapsed.
    pub(crate) fn op_inir_indr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        self.ini_ind_once(dec, bus);
        if self.b == 0 {
            16
        } else {
            self.pc = self.pc.wrapping_sub(2);
            21
        }
    }

    /// One OUTI/OUTD: OUT(BC) <- (HL) with B already decremented, HL stepped.
    fn outi_outd_once<B: Bus + ?Sized>(&mut self, dec: bool, bus: &mut B) {
        let val = bus.read(self.get_hl());
        self.b = self.b.wrapping_sub(1);
        let port = self.get_bc();
        bus.io_write(port, val);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.memptr = port.wrapping_add(delta);

        let k = val as u16 + self.l as u16;
        self.block_io_flags(val, k);
    }

    /// OUTI (0xA3) / OUTD (0xAB) — 16 T.
    pub(crate) fn op_outi_outd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        self.outi_outd_once(dec, bus);
        16
    }

    /// OTIR/OTDR — 21/16 T. One iteration per step, like INIR.
    pub(crate) fn op_otir_otdr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        let dec = (opcode & 0x08) != 0;
        self.outi_outd_once(dec, bus);
        if self.b == 0 {
            16
        } else {
            self.pc = self.pc.wrapping_sub(2);
            21
        }
    }
}
