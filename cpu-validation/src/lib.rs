use mastersys_core::core::Bus;
use mastersys_core::cpu::z80::Z80;
use serde::{Deserialize, Serialize};

// --- TracingBus: flat 64KB memory with bus-traffic recording ---

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusOp {
    Read,
    Write,
    IoRead,
    IoWrite,
}

#[derive(Clone, Debug)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

pub struct TracingBus {
    pub memory: [u8; 0x10000],
    pub io_input: u8,
    pub cycles: Vec<BusCycle>,
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            io_input: 0xFF,
            cycles: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for TracingBus {
    fn read(&mut self, addr: u16) -> u8 {
        let data = self.memory[addr as usize];
        self.cycles.push(BusCycle { addr, data, op: BusOp::Read });
        data
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        self.cycles.push(BusCycle { addr, data, op: BusOp::Write });
    }

    fn io_read(&mut self, port: u16) -> u8 {
        let data = self.io_input;
        self.cycles.push(BusCycle { addr: port, data, op: BusOp::IoRead });
        data
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.cycles.push(BusCycle { addr: port, data, op: BusOp::IoWrite });
    }
}

// --- JSON test vector types (SingleStepTests-style layout) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80TestCase {
    pub name: String,
    pub initial: Z80CpuState,
    #[serde(rename = "final")]
    pub final_state: Z80CpuState,
    /// Total T-states the step reported.
    pub cycles: u32,
    /// Bus traffic: (address, data, kind) with kind "r"/"w"/"i"/"o".
    pub bus: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80CpuState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub i: u8,
    pub r: u8,
    pub ix: u16,
    pub iy: u16,
    pub af_: u16,
    pub bc_: u16,
    pub de_: u16,
    pub hl_: u16,
    pub wz: u16,
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub ram: Vec<(u16, u8)>,
}

impl Z80CpuState {
    /// Capture the CPU plus the RAM cells named in `addrs`.
    pub fn capture(cpu: &Z80, bus: &TracingBus, addrs: &[u16]) -> Self {
        Self {
            pc: cpu.pc,
            sp: cpu.sp,
            a: cpu.a,
            f: cpu.f,
            b: cpu.b,
            c: cpu.c,
            d: cpu.d,
            e: cpu.e,
            h: cpu.h,
            l: cpu.l,
            i: cpu.i,
            r: cpu.r,
            ix: cpu.ix,
            iy: cpu.iy,
            af_: ((cpu.a_prime as u16) << 8) | cpu.f_prime as u16,
            bc_: ((cpu.b_prime as u16) << 8) | cpu.c_prime as u16,
            de_: ((cpu.d_prime as u16) << 8) | cpu.e_prime as u16,
            hl_: ((cpu.h_prime as u16) << 8) | cpu.l_prime as u16,
            wz: cpu.memptr,
            iff1: cpu.iff1,
            iff2: cpu.iff2,
            im: cpu.im,
            ram: addrs
                .iter()
                .map(|&addr| (addr, bus.memory[addr as usize]))
                .collect(),
        }
    }

    /// Load this state into a CPU and bus.
    pub fn apply(&self, cpu: &mut Z80, bus: &mut TracingBus) {
        cpu.pc = self.pc;
        cpu.sp = self.sp;
        cpu.a = self.a;
        cpu.f = self.f;
        cpu.b = self.b;
        cpu.c = self.c;
        cpu.d = self.d;
        cpu.e = self.e;
        cpu.h = self.h;
        cpu.l = self.l;
        cpu.i = self.i;
        cpu.r = self.r;
        cpu.ix = self.ix;
        cpu.iy = self.iy;
        cpu.a_prime = (self.af_ >> 8) as u8;
        cpu.f_prime = self.af_ as u8;
        cpu.b_prime = (self.bc_ >> 8) as u8;
        cpu.c_prime = self.bc_ as u8;
        cpu.d_prime = (self.de_ >> 8) as u8;
        cpu.e_prime = self.de_ as u8;
        cpu.h_prime = (self.hl_ >> 8) as u8;
        cpu.l_prime = self.hl_ as u8;
        cpu.memptr = self.wz;
        cpu.iff1 = self.iff1;
        cpu.iff2 = self.iff2;
        cpu.im = self.im;
        for &(addr, val) in &self.ram {
            bus.memory[addr as usize] = val;
        }
    }
}

impl From<&BusCycle> for (u16, u8, String) {
    fn from(c: &BusCycle) -> Self {
        let kind = match c.op {
            BusOp::Read => "r",
            BusOp::Write => "w",
            BusOp::IoRead => "i",
            BusOp::IoWrite => "o",
        };
        (c.addr, c.data, kind.to_string())
    }
}
