mod alu;
mod bit;
mod block;
mod branch;
mod load_store;
mod stack;

use crate::core::Bus;
use crate::cpu::state::{irq_gate, IrqGateHook, StepResult, TraceEvent, TraceHook, Z80State};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexMode {
    HL,
    IX,
    IY,
}

/// Instruction-stepped Z80 interpreter.
///
/// `step_one` executes exactly one instruction (or one interrupt acceptance)
/// against a [`Bus`] and reports the T-states consumed. Interrupts are
/// sampled only at step boundaries: the IRQ input is level-sensitive (the
/// device holding the line keeps re-asserting it), the NMI input is an edge
/// latch.
pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    // Internal state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub memptr: u16, // Hidden WZ register
    pub halted: bool,
    pub ei_delay: bool,
    pub q: u8,             // Copy of F when instruction modifies flags, 0 otherwise
    pub(crate) prev_q: u8, // Previous instruction's q value (for SCF/CCF X/Y)

    // Prefix handling
    pub(crate) index_mode: IndexMode,

    // Interrupt inputs
    irq_line: bool,
    irq_fresh: bool, // line rose during the instruction that just ran
    nmi_pending: bool,
    /// Byte the interrupting device drives onto the data bus during IRQ
    /// acknowledge. 0xFF on the SMS (no device drives the bus).
    pub irq_data_bus: u8,

    // Debug hooks
    trace_hook: Option<TraceHook>,
    trace_snapshots: bool,
    irq_gate_hook: Option<IrqGateHook>,
}

impl std::fmt::Debug for Z80 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Z80")
            .field("a", &self.a)
            .field("f", &self.f)
            .field("b", &self.b)
            .field("c", &self.c)
            .field("d", &self.d)
            .field("e", &self.e)
            .field("h", &self.h)
            .field("l", &self.l)
            .field("a_prime", &self.a_prime)
            .field("f_prime", &self.f_prime)
            .field("b_prime", &self.b_prime)
            .field("c_prime", &self.c_prime)
            .field("d_prime", &self.d_prime)
            .field("e_prime", &self.e_prime)
            .field("h_prime", &self.h_prime)
            .field("l_prime", &self.l_prime)
            .field("ix", &self.ix)
            .field("iy", &self.iy)
            .field("i", &self.i)
            .field("r", &self.r)
            .field("sp", &self.sp)
            .field("pc", &self.pc)
            .field("iff1", &self.iff1)
            .field("iff2", &self.iff2)
            .field("im", &self.im)
            .field("memptr", &self.memptr)
            .field("halted", &self.halted)
            .field("ei_delay", &self.ei_delay)
            .field("q", &self.q)
            .field("prev_q", &self.prev_q)
            .field("index_mode", &self.index_mode)
            .field("irq_line", &self.irq_line)
            .field("irq_fresh", &self.irq_fresh)
            .field("nmi_pending", &self.nmi_pending)
            .field("irq_data_bus", &self.irq_data_bus)
            .field("trace_hook", &self.trace_hook.is_some())
            .field("trace_snapshots", &self.trace_snapshots)
            .field("irq_gate_hook", &self.irq_gate_hook.is_some())
            .finish()
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0xFF,
            c: 0xFF,
            d: 0xFF,
            e: 0xFF,
            h: 0xFF,
            l: 0xFF,
            a_prime: 0xFF,
            f_prime: 0xFF,
            b_prime: 0xFF,
            c_prime: 0xFF,
            d_prime: 0xFF,
            e_prime: 0xFF,
            h_prime: 0xFF,
            l_prime: 0xFF,
            ix: 0xFFFF,
            iy: 0xFFFF,
            i: 0,
            r: 0,
            sp: 0xFFFF,
            pc: 0x0000,
            iff1: false,
            iff2: false,
            im: 0,
            memptr: 0,
            halted: false,
            ei_delay: false,
            q: 0,
            prev_q: 0,
            index_mode: IndexMode::HL,
            irq_line: false,
            irq_fresh: false,
            nmi_pending: false,
            irq_data_bus: 0xFF,
            trace_hook: None,
            trace_snapshots: false,
            irq_gate_hook: None,
        }
    }

    /// Cold-start reset: PC=0, SP=0, I=0, R=0, interrupts disabled, IM 0.
    pub fn reset(&mut self) {
        self.pc = 0x0000;
        self.sp = 0x0000;
        self.i = 0;
        self.r = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.im = 0;
        self.halted = false;
        self.ei_delay = false;
        self.memptr = 0;
        self.q = 0;
        self.prev_q = 0;
        self.irq_line = false;
        self.irq_fresh = false;
        self.nmi_pending = false;
    }

    /// Latch the maskable interrupt line high. Level-sensitive: while the
    /// device holds the line, the CPU re-accepts after each instruction once
    /// enabled. The device (or `clear_irq`) drops the line.
    pub fn request_irq(&mut self) {
        if !self.irq_line {
            self.irq_fresh = true;
        }
        self.irq_line = true;
    }

    /// Drop the maskable interrupt line.
    pub fn clear_irq(&mut self) {
        self.irq_line = false;
        self.irq_fresh = false;
    }

    /// Edge-trigger the non-maskable interrupt.
    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    pub fn irq_line(&self) -> bool {
        self.irq_line
    }

    /// Install a per-instruction trace callback. `snapshots` additionally
    /// captures the full register state after every step.
    pub fn set_trace_hook(&mut self, hook: TraceHook, snapshots: bool) {
        self.trace_hook = Some(hook);
        self.trace_snapshots = snapshots;
    }

    pub fn clear_trace_hook(&mut self) {
        self.trace_hook = None;
    }

    /// Install a callback that fires with an [`irq_gate`] reason whenever a
    /// pending IRQ is held off at a step boundary.
    pub fn set_irq_gate_hook(&mut self, hook: IrqGateHook) {
        self.irq_gate_hook = Some(hook);
    }

    pub fn get_state(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halted: self.halted,
            ei_delay: self.ei_delay,
            irq_pending: self.irq_line,
            nmi_pending: self.nmi_pending,
            memptr: self.memptr,
            q: self.q,
        }
    }

    pub fn set_state(&mut self, s: &Z80State) {
        self.a = s.a;
        self.f = s.f;
        self.b = s.b;
        self.c = s.c;
        self.d = s.d;
        self.e = s.e;
        self.h = s.h;
        self.l = s.l;
        self.a_prime = s.a_prime;
        self.f_prime = s.f_prime;
        self.b_prime = s.b_prime;
        self.c_prime = s.c_prime;
        self.d_prime = s.d_prime;
        self.e_prime = s.e_prime;
        self.h_prime = s.h_prime;
        self.l_prime = s.l_prime;
        self.ix = s.ix;
        self.iy = s.iy;
        self.sp = s.sp;
        self.pc = s.pc;
        self.i = s.i;
        self.r = s.r;
        self.iff1 = s.iff1;
        self.iff2 = s.iff2;
        self.im = s.im;
        self.halted = s.halted;
        self.ei_delay = s.ei_delay;
        self.irq_line = s.irq_pending;
        self.nmi_pending = s.nmi_pending;
        self.memptr = s.memptr;
        self.q = s.q;
    }

    // --- 16-bit register pair access ---

    pub fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }
    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }
    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }
    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    pub fn get_af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }
    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = val as u8;
    }

    /// Get 8-bit register by index, respecting IX/IY prefix for H/L
    /// (undocumented IXH/IXL/IYH/IYL). Index 6 is NOT handled here — callers
    /// must handle (HL)/(IX+d)/(IY+d) separately.
    pub fn get_reg8_ix(&self, index: u8) -> u8 {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => (self.ix >> 8) as u8,
            (5, IndexMode::IX) => self.ix as u8,
            (4, IndexMode::IY) => (self.iy >> 8) as u8,
            (5, IndexMode::IY) => self.iy as u8,
            _ => self.get_reg8(index),
        }
    }

    pub fn set_reg8_ix(&mut self, index: u8, val: u8) {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => self.ix = (self.ix & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IX) => self.ix = (self.ix & 0xFF00) | val as u16,
            (4, IndexMode::IY) => self.iy = (self.iy & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IY) => self.iy = (self.iy & 0xFF00) | val as u16,
            _ => self.set_reg8(index, val),
        }
    }

    pub fn get_reg8(&self, index: u8) -> u8 {
        match index {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!("get_reg8 called with index {}", index),
        }
    }

    pub fn set_reg8(&mut self, index: u8, val: u8) {
        match index {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!("set_reg8 called with index {}", index),
        }
    }

    /// Get 16-bit register pair by index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    /// Index 2 respects current index_mode for DD/FD prefixed instructions.
    pub(crate) fn get_rp(&self, index: u8) -> u16 {
        match index {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => match self.index_mode {
                IndexMode::HL => self.get_hl(),
                IndexMode::IX => self.ix,
                IndexMode::IY => self.iy,
            },
            3 => self.sp,
            _ => unreachable!("get_rp called with index {}", index),
        }
    }

    /// Set 16-bit register pair by index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    pub(crate) fn set_rp(&mut self, index: u8, val: u16) {
        match index {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => match self.index_mode {
                IndexMode::HL => self.set_hl(val),
                IndexMode::IX => self.ix = val,
                IndexMode::IY => self.iy = val,
            },
            3 => self.sp = val,
            _ => unreachable!("set_rp called with index {}", index),
        }
    }

    /// Get 16-bit register pair by index for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    pub(crate) fn get_rp_af(&self, index: u8) -> u16 {
        match index {
            3 => self.get_af(),
            _ => self.get_rp(index),
        }
    }

    /// Set 16-bit register pair by index for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    pub(crate) fn set_rp_af(&mut self, index: u8, val: u16) {
        match index {
            3 => self.set_af(val),
            _ => self.set_rp(index, val),
        }
    }

    // --- Bus access helpers ---

    /// Opcode fetch (M1 cycle): refreshes R.
    pub(crate) fn fetch_m1<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let op = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.refresh_r();
        op
    }

    /// Operand fetch: plain data read, no R refresh.
    pub(crate) fn fetch8<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let val = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    pub(crate) fn fetch16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus) as u16;
        let hi = self.fetch8(bus) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn read16<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn write16<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, val: u16) {
        bus.write(addr, val as u8);
        bus.write(addr.wrapping_add(1), (val >> 8) as u8);
    }

    pub(crate) fn push16<B: Bus + ?Sized>(&mut self, bus: &mut B, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, (val >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, val as u8);
    }

    pub(crate) fn pop16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        let hi = bus.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    pub(crate) fn refresh_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }

    /// Write F through the Q mechanism (instruction modified flags).
    pub(crate) fn set_f(&mut self, f: u8) {
        self.f = f;
        self.q = f;
    }

    /// Effective address for (HL)/(IX+d)/(IY+d). Indexed modes fetch the
    /// displacement and cost 8 extra T-states (3 for the operand, 5 internal);
    /// the returned extra is added by the caller.
    pub(crate) fn fetch_index_addr<B: Bus + ?Sized>(&mut self, bus: &mut B) -> (u16, u32) {
        match self.index_mode {
            IndexMode::HL => (self.get_hl(), 0),
            IndexMode::IX => {
                let d = self.fetch8(bus) as i8;
                let addr = self.ix.wrapping_add(d as i16 as u16);
                self.memptr = addr;
                (addr, 8)
            }
            IndexMode::IY => {
                let d = self.fetch8(bus) as i8;
                let addr = self.iy.wrapping_add(d as i16 as u16);
                self.memptr = addr;
                (addr, 8)
            }
        }
    }

    /// Condition code lookup (NZ, Z, NC, C, PO, PE, P, M).
    pub(crate) fn cond(&self, index: u8) -> bool {
        match index {
            0 => self.f & Flag::Z as u8 == 0,
            1 => self.f & Flag::Z as u8 != 0,
            2 => self.f & Flag::C as u8 == 0,
            3 => self.f & Flag::C as u8 != 0,
            4 => self.f & Flag::PV as u8 == 0,
            5 => self.f & Flag::PV as u8 != 0,
            6 => self.f & Flag::S as u8 == 0,
            7 => self.f & Flag::S as u8 != 0,
            _ => unreachable!("cond called with index {}", index),
        }
    }

    // --- Stepping ---

    /// Execute one instruction or one interrupt acceptance.
    pub fn step_one<B: Bus + ?Sized>(&mut self, bus: &mut B) -> StepResult {
        let fresh = self.irq_fresh;
        self.irq_fresh = false;
        let pc_before = self.pc;

        // NMI: edge latch, always accepted, higher priority than IRQ.
        if self.nmi_pending {
            self.nmi_pending = false;
            let cycles = self.accept_nmi(bus);
            let result = StepResult { cycles, irq_accepted: false, nmi_accepted: true };
            self.emit_trace(pc_before, 0x00, result);
            return result;
        }

        // IRQ: level input, sampled between instructions.
        if self.irq_line {
            if !self.iff1 {
                self.emit_irq_gate(irq_gate::IFF1_CLEAR);
            } else if self.ei_delay {
                self.emit_irq_gate(irq_gate::EI_MASK);
            } else {
                // An IRQ that only rose during the previous instruction does
                // not preempt a HALT opcode: the HALT executes first and
                // acceptance happens from the halted state (pushed PC then
                // points past the HALT).
                let fresh_before_halt = fresh && !self.halted && bus.read(self.pc) == 0x76;
                if fresh_before_halt {
                    self.emit_irq_gate(irq_gate::HALT_GATE);
                } else {
                    let cycles = self.accept_irq(bus);
                    let result = StepResult { cycles, irq_accepted: true, nmi_accepted: false };
                    self.emit_trace(pc_before, 0x00, result);
                    return result;
                }
            }
        }

        if self.halted {
            // Re-fetch the HALT opcode (one M1, 4 T) until an interrupt arrives.
            self.refresh_r();
            let result = StepResult { cycles: 4, ..Default::default() };
            self.emit_trace(pc_before, 0x76, result);
            return result;
        }

        // The EI mask covers exactly the one instruction executed below.
        self.ei_delay = false;

        self.index_mode = IndexMode::HL;
        self.prev_q = self.q;
        self.q = 0;

        let mut cycles = 0u32;
        let first = self.fetch_m1(bus);
        let mut opcode = first;
        // DD/FD are sticky modifiers, 4 T each; a later prefix supersedes an
        // earlier one.
        while opcode == 0xDD || opcode == 0xFD {
            self.index_mode = if opcode == 0xDD { IndexMode::IX } else { IndexMode::IY };
            cycles += 4;
            opcode = self.fetch_m1(bus);
        }

        cycles += match opcode {
            0xCB => self.dispatch_cb(bus),
            0xED => self.dispatch_ed(bus),
            _ => self.dispatch_base(opcode, bus),
        };

        let result = StepResult { cycles, irq_accepted: false, nmi_accepted: false };
        self.emit_trace(pc_before, first, result);
        result
    }

    fn emit_trace(&mut self, pc_before: u16, opcode: u8, result: StepResult) {
        if let Some(mut hook) = self.trace_hook.take() {
            let event = TraceEvent {
                pc_before,
                opcode,
                cycles: result.cycles,
                irq_accepted: result.irq_accepted,
                nmi_accepted: result.nmi_accepted,
                state: if self.trace_snapshots { Some(self.get_state()) } else { None },
                disasm: None,
            };
            hook(&event);
            self.trace_hook = Some(hook);
        }
    }

    fn emit_irq_gate(&mut self, reason: &'static str) {
        if let Some(mut hook) = self.irq_gate_hook.take() {
            hook(reason);
            self.irq_gate_hook = Some(hook);
        }
    }

    /// NMI acceptance — 11 T. Clears IFF1, preserves IFF2 for RETN.
    fn accept_nmi<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.halted = false;
        self.iff1 = false;
        self.refresh_r();
        let pc = self.pc;
        self.push16(bus, pc);
        self.pc = 0x0066;
        self.memptr = self.pc;
        11
    }

    /// IRQ acceptance. IM1 takes 13 T, IM2 19 T; IM0 executes the injected
    /// data-bus opcode (RST n, or the 0x38 fallback for non-RST bytes).
    fn accept_irq<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.halted = false;
        self.iff1 = false;
        self.iff2 = false;
        self.refresh_r();
        let pc = self.pc;
        match self.im {
            2 => {
                self.push16(bus, pc);
                let table = ((self.i as u16) << 8) | self.irq_data_bus as u16;
                self.pc = self.read16(bus, table);
                self.memptr = self.pc;
                19
            }
            1 => {
                self.push16(bus, pc);
                self.pc = 0x0038;
                self.memptr = self.pc;
                13
            }
            _ => {
                // IM0: the device's byte is executed. RST n is the only shape
                // seen in practice; anything else falls back to 0x38.
                let injected = self.irq_data_bus;
                self.push16(bus, pc);
                self.pc = if injected & 0xC7 == 0xC7 {
                    (injected & 0x38) as u16
                } else {
                    0x0038
                };
                self.memptr = self.pc;
                13
            }
        }
    }

    /// Base opcode dispatch. Handlers return the full documented T-state
    /// count for the unprefixed form; the DD/FD prefix itself (4 T) and the
    /// displacement overhead (8 T) are accounted separately.
    fn dispatch_base<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> u32 {
        match opcode {
            // NOP — 4 T
            0x00 => 4,

            // HALT — 4 T. PC stays past HALT (already incremented by the fetch).
            0x76 => {
                self.halted = true;
                4
            }

            // --- Load/Store ---

            // LD (BC), A — 7 T
            0x02 => self.op_ld_bc_a(bus),
            // LD (DE), A — 7 T
            0x12 => self.op_ld_de_a(bus),
            // LD (nn), HL — 16 T
            0x22 => self.op_ld_nn_hl(bus),
            // LD (nn), A — 13 T
            0x32 => self.op_ld_nn_a(bus),

            // EX AF, AF' — 4 T
            0x08 => self.op_ex_af_af(),

            // LD A, (BC) — 7 T
            0x0A => self.op_ld_a_bc(bus),
            // LD A, (DE) — 7 T
            0x1A => self.op_ld_a_de(bus),
            // LD HL, (nn) — 16 T
            0x2A => self.op_ld_hl_nn_ind(bus),
            // LD A, (nn) — 13 T
            0x3A => self.op_ld_a_nn(bus),

            // LD rr, nn (0x01/0x11/0x21/0x31) — 10 T
            op if (op & 0xCF) == 0x01 => self.op_ld_rr_nn(op, bus),

            // LD r, n (0x06, 0x0E, ... 0x3E) — 7 T; LD (HL), n — 10 T
            op if (op & 0xC7) == 0x06 => self.op_ld_r_n(op, bus),

            // LD r, r' (0x40-0x7F excluding 0x76) — 4/7 T
            op if (op & 0xC0) == 0x40 => self.op_ld_r_r(op, bus),

            // LD SP, HL — 6 T
            0xF9 => self.op_ld_sp_hl(),

            // EX DE, HL — 4 T
            0xEB => self.op_ex_de_hl(),
            // EXX — 4 T
            0xD9 => self.op_exx(),
            // EX (SP), HL — 19 T
            0xE3 => self.op_ex_sp_hl(bus),

            // --- Stack ---

            // PUSH rr (0xC5/D5/E5/F5) — 11 T
            op if (op & 0xCF) == 0xC5 => self.op_push(op, bus),
            // POP rr (0xC1/D1/E1/F1) — 10 T
            op if (op & 0xCF) == 0xC1 => self.op_pop(op, bus),

            // --- ALU ---

            // ALU A, r (0x80 - 0xBF) — 4 T (reg) or 7 T ((HL))
            op if (op & 0xC0) == 0x80 => self.op_alu_r(op, bus),
            // ALU A, n (0xC6, 0xCE, ... 0xFE) — 7 T
            op if (op & 0xC7) == 0xC6 => self.op_alu_n(op, bus),

            // INC r (0x04, 0x0C...) — 4 T (reg) or 11 T ((HL))
            op if (op & 0xC7) == 0x04 => self.op_inc_dec_r(op, bus),
            // DEC r (0x05, 0x0D...) — 4 T (reg) or 11 T ((HL))
            op if (op & 0xC7) == 0x05 => self.op_inc_dec_r(op, bus),

            // ADD HL,rr (0x09/0x19/0x29/0x39) — 11 T
            op if (op & 0xCF) == 0x09 => self.op_add_hl_rr(op),
            // INC rr (0x03/0x13/0x23/0x33) — 6 T
            op if (op & 0xCF) == 0x03 => self.op_inc_dec_rr(op),
            // DEC rr (0x0B/0x1B/0x2B/0x3B) — 6 T
            op if (op & 0xCF) == 0x0B => self.op_inc_dec_rr(op),

            // Accumulator rotates — 4 T
            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),

            // Misc ALU — 4 T
            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            // --- Branch/Control Flow ---

            // JP nn — 10 T
            0xC3 => self.op_jp_nn(bus),
            // JP (HL) — 4 T
            0xE9 => self.op_jp_hl(),
            // JR e — 12 T
            0x18 => self.op_jr_e(bus),
            // DJNZ e — 13/8 T
            0x10 => self.op_djnz(bus),
            // CALL nn — 17 T
            0xCD => self.op_call_nn(bus),
            // RET — 10 T
            0xC9 => self.op_ret(bus),
            // IN A,(n) — 11 T
            0xDB => self.op_in_a_n(bus),
            // OUT (n),A — 11 T
            0xD3 => self.op_out_n_a(bus),

            // DI — 4 T
            0xF3 => self.op_di(),
            // EI — 4 T
            0xFB => self.op_ei(),

            // JP cc,nn — 10 T
            op if (op & 0xC7) == 0xC2 => self.op_jp_cc_nn(op, bus),
            // JR cc,e — 12/7 T (NZ/Z/NC/C only)
            op if (op & 0xE7) == 0x20 => self.op_jr_cc_e(op, bus),
            // CALL cc,nn — 17/10 T
            op if (op & 0xC7) == 0xC4 => self.op_call_cc_nn(op, bus),
            // RET cc — 11/5 T
            op if (op & 0xC7) == 0xC0 => self.op_ret_cc(op, bus),
            // RST p — 11 T
            op if (op & 0xC7) == 0xC7 => self.op_rst(op, bus),

            _ => 4,
        }
    }

    /// ED prefix dispatch. The sub-opcode fetch is a second M1; returned
    /// counts are full instruction totals.
    fn dispatch_ed<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        // ED cancels a pending DD/FD modifier.
        self.index_mode = IndexMode::HL;
        let opcode = self.fetch_m1(bus);

        match opcode {
            // --- Specific ED opcodes ---
            0x47 => self.op_ld_i_a(),           // LD I,A — 9 T
            0x4F => self.op_ld_r_a(),           // LD R,A — 9 T
            0x57 => self.op_ld_a_i(),           // LD A,I — 9 T
            0x5F => self.op_ld_a_r(),           // LD A,R — 9 T
            0x67 => self.op_rrd(bus),           // RRD — 18 T
            0x6F => self.op_rld(bus),           // RLD — 18 T

            // --- Block transfer/compare/IO ---
            0xA0 | 0xA8 => self.op_ldi_ldd(opcode, bus),     // LDI/LDD — 16 T
            0xA1 | 0xA9 => self.op_cpi_cpd(opcode, bus),     // CPI/CPD — 16 T
            0xA2 | 0xAA => self.op_ini_ind(opcode, bus),     // INI/IND — 16 T
            0xA3 | 0xAB => self.op_outi_outd(opcode, bus),   // OUTI/OUTD — 16 T
            0xB0 | 0xB8 => self.op_ldir_lddr(opcode, bus),   // LDIR/LDDR — 21/16 T
            0xB1 | 0xB9 => self.op_cpir_cpdr(opcode, bus),   // CPIR/CPDR — 21/16 T
            0xB2 | 0xBA => self.op_inir_indr(opcode, bus),   // INIR/INDR — 21/16 T
            0xB3 | 0xBB => self.op_otir_otdr(opcode, bus),   // OTIR/OTDR — 21/16 T

            // --- Pattern-based (40-7F range) ---
            op if (op & 0xC7) == 0x40 => self.op_in_r_c(op, bus),  // IN r,(C) — 12 T
            op if (op & 0xC7) == 0x41 => self.op_out_c_r(op, bus), // OUT (C),r — 12 T
            op if (op & 0xCF) == 0x42 => self.op_sbc_hl_rr(op),    // SBC HL,rr — 15 T
            op if (op & 0xCF) == 0x43 => self.op_ld_nn_rr_ed(op, bus), // LD (nn),rr — 20 T
            op if (op & 0xC7) == 0x44 => self.op_neg(),            // NEG — 8 T
            op if (op & 0xC7) == 0x45 => self.op_retn(bus),        // RETN/RETI — 14 T
            op if (op & 0xC7) == 0x46 => self.op_im(op),           // IM 0/1/2 — 8 T
            op if (op & 0xCF) == 0x4A => self.op_adc_hl_rr(op),    // ADC HL,rr — 15 T
            op if (op & 0xCF) == 0x4B => self.op_ld_rr_nn_ed(op, bus), // LD rr,(nn) — 20 T

            // Undefined ED opcodes act as 8 T no-ops advancing past both bytes.
            _ => 8,
        }
    }
}
