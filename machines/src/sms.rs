use mastersys_core::core::machine::{InputButton, Machine};
use mastersys_core::core::Bus;
use mastersys_core::cpu::state::{StepResult, Z80State};
use mastersys_core::cpu::z80::Z80;
use mastersys_core::device::sn76489::{Sn76489, Sn76489State};
use mastersys_core::device::vdp::{Vdp, VdpState, FRAME_BYTES, FRAME_HEIGHT, FRAME_WIDTH};

use crate::cartridge::{Bios, Cartridge, CartridgeError};
use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Input button IDs
// ---------------------------------------------------------------------------
pub const INPUT_P1_UP: u8 = 0;
pub const INPUT_P1_DOWN: u8 = 1;
pub const INPUT_P1_LEFT: u8 = 2;
pub const INPUT_P1_RIGHT: u8 = 3;
pub const INPUT_P1_BUTTON1: u8 = 4;
pub const INPUT_P1_BUTTON2: u8 = 5;
pub const INPUT_P2_UP: u8 = 6;
pub const INPUT_P2_DOWN: u8 = 7;
pub const INPUT_P2_LEFT: u8 = 8;
pub const INPUT_P2_RIGHT: u8 = 9;
pub const INPUT_P2_BUTTON1: u8 = 10;
pub const INPUT_P2_BUTTON2: u8 = 11;
pub const INPUT_PAUSE: u8 = 12;

const SMS_INPUT_MAP: &[InputButton] = &[
    InputButton { id: INPUT_P1_UP, name: "P1 Up" },
    InputButton { id: INPUT_P1_DOWN, name: "P1 Down" },
    InputButton { id: INPUT_P1_LEFT, name: "P1 Left" },
    InputButton { id: INPUT_P1_RIGHT, name: "P1 Right" },
    InputButton { id: INPUT_P1_BUTTON1, name: "P1 Button 1" },
    InputButton { id: INPUT_P1_BUTTON2, name: "P1 Button 2" },
    InputButton { id: INPUT_P2_UP, name: "P2 Up" },
    InputButton { id: INPUT_P2_DOWN, name: "P2 Down" },
    InputButton { id: INPUT_P2_LEFT, name: "P2 Left" },
    InputButton { id: INPUT_P2_RIGHT, name: "P2 Right" },
    InputButton { id: INPUT_P2_BUTTON1, name: "P2 Button 1" },
    InputButton { id: INPUT_P2_BUTTON2, name: "P2 Button 2" },
    InputButton { id: INPUT_PAUSE, name: "Pause" },
];

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
// CPU clock:  3.579545 MHz (NTSC master / 3)
// Scanline:   228 CPU cycles
// Frame:      262 lines = 59736 CPU cycles ≈ 59.92 Hz

const CPU_CLOCK_HZ: u64 = 3_579_545;
const CYCLES_PER_FRAME: u64 = 262 * 228;
const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Generated audio is buffered until the host drains it; beyond this the
/// machine stops accumulating rather than grow without bound.
const AUDIO_BUFFER_CAP: usize = 0x10000;

// Mapper control bits (0xFFFC)
const MAPPER_RAM_BANK: u8 = 0x04; // which 16 KiB half of cartridge RAM
const MAPPER_RAM_IN_SLOT2: u8 = 0x08; // cartridge RAM replaces slot 2 ROM
const MAPPER_RAM_IN_SLOT0: u8 = 0x10; // work RAM overlays 0x0000-0x03FF

// Memory control bits (port 0x3E). The cartridge-RAM enable (bit 3) is
// recorded for introspection; mapping itself is governed by 0xFFFC.
const MEMCTL_BIOS_DISABLE: u8 = 0x04;

/// Mapper/IO register snapshot, for introspection and save states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmsBusState {
    pub mapper_control: u8,
    pub banks: [u8; 3],
    pub memory_control: u8,
    pub io_control: u8,
    pub bios_enabled: bool,
    pub last_psg_byte: u8,
    pub last_vdp_data_byte: u8,
}

/// Everything on the far side of the CPU pins: the mapper-decoded memory
/// map, the IO port decode, and the two chips. Split from the CPU so
/// `Z80::step_one` can borrow it mutably.
#[derive(Debug)]
pub struct SmsBus {
    pub vdp: Vdp,
    pub psg: Sn76489,

    cartridge: Cartridge,
    bios: Option<Bios>,

    ram: [u8; 0x2000],
    cart_ram: Box<[u8; 0x8000]>,
    cart_ram_written: bool,

    // Sega mapper (0xFFFC-0xFFFF)
    mapper_control: u8,
    banks: [u8; 3],

    // Port 0x3E / 0x3F
    memory_control: u8,
    io_control: u8,
    bios_enabled: bool,

    // Controllers (active-low: up0 down1 left2 right3 b1:4 b2:5)
    joypad1: u8,
    joypad2: u8,

    // Observable write caches for tests
    last_psg_byte: u8,
    last_vdp_data_byte: u8,

    // IN/OUT hits on the VDP ports during the current step (wait-state model)
    vdp_io_accesses: u32,
}

impl SmsBus {
    fn new(cartridge: Cartridge, bios: Option<Bios>) -> Self {
        let bios_enabled = bios.is_some();
        Self {
            vdp: Vdp::new(),
            psg: Sn76489::new(),
            cartridge,
            bios,
            ram: [0; 0x2000],
            cart_ram: Box::new([0; 0x8000]),
            cart_ram_written: false,
            mapper_control: 0,
            banks: [0, 1, 2],
            memory_control: 0,
            io_control: 0xFF,
            bios_enabled,
            joypad1: 0xFF,
            joypad2: 0xFF,
            last_psg_byte: 0,
            last_vdp_data_byte: 0,
            vdp_io_accesses: 0,
        }
    }

    fn write_memory_control(&mut self, data: u8) {
        self.memory_control = data;
        self.bios_enabled = self.bios.is_some() && data & MEMCTL_BIOS_DISABLE == 0;
    }

    fn cart_ram_offset(&self, addr: u16) -> usize {
        let half = ((self.mapper_control & MAPPER_RAM_BANK) >> 2) as usize;
        half * 0x4000 + (addr as usize & 0x3FFF)
    }

    /// Port 0xDC: P1 pad plus P2 up/down, active low.
    fn read_joypad_a(&self) -> u8 {
        (self.joypad1 & 0x3F) | ((self.joypad2 & 0x03) << 6)
    }

    /// Port 0xDD: rest of P2, reset line (idle), and the TH pins as driven
    /// by the IO-control register (inputs read high on an export console).
    fn read_joypad_b(&self) -> u8 {
        let th_a = if self.io_control & 0x02 != 0 { 1 } else { (self.io_control >> 5) & 1 };
        let th_b = if self.io_control & 0x08 != 0 { 1 } else { (self.io_control >> 7) & 1 };
        ((self.joypad2 >> 2) & 0x0F) | 0x30 | (th_a << 6) | (th_b << 7)
    }
}

impl Bus for SmsBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // First kilobyte: fixed bank 0 (so the interrupt vectors survive
            // slot-0 paging), unless the mapper overlays work RAM there.
            0x0000..=0x03FF => {
                if self.mapper_control & MAPPER_RAM_IN_SLOT0 != 0 {
                    self.ram[addr as usize & 0x1FFF]
                } else if self.bios_enabled {
                    match &self.bios {
                        Some(bios) => bios.read(addr),
                        None => self.cartridge.read(0, addr),
                    }
                } else {
                    self.cartridge.read(0, addr)
                }
            }

            // Slot 0
            0x0400..=0x3FFF => {
                if self.bios_enabled {
                    match &self.bios {
                        Some(bios) => bios.read(addr),
                        None => self.cartridge.read(self.banks[0], addr),
                    }
                } else {
                    self.cartridge.read(self.banks[0], addr)
                }
            }

            // Slot 1
            0x4000..=0x7FFF => self.cartridge.read(self.banks[1], addr),

            // Slot 2: ROM bank or cartridge RAM
            0x8000..=0xBFFF => {
                if self.mapper_control & MAPPER_RAM_IN_SLOT2 != 0 {
                    self.cart_ram[self.cart_ram_offset(addr)]
                } else {
                    self.cartridge.read(self.banks[2], addr)
                }
            }

            // Work RAM and its mirror
            _ => self.ram[addr as usize & 0x1FFF],
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x8000..=0xBFFF => {
                if self.mapper_control & MAPPER_RAM_IN_SLOT2 != 0 {
                    let offset = self.cart_ram_offset(addr);
                    self.cart_ram[offset] = data;
                    self.cart_ram_written = true;
                }
            }

            0xC000..=0xFFFF => {
                self.ram[addr as usize & 0x1FFF] = data;
                // The top four addresses double as the mapper registers; the
                // RAM mirror keeps the written values readable.
                match addr {
                    0xFFFC => self.mapper_control = data,
                    0xFFFD => self.banks[0] = data,
                    0xFFFE => self.banks[1] = data,
                    0xFFFF => self.banks[2] = data,
                    _ => {}
                }
            }

            // ROM: ignored
            _ => {}
        }
    }

    fn io_read(&mut self, port: u16) -> u8 {
        let port = port as u8;
        match port {
            // Memory/IO control read back as open bus on an SMS1
            0x00..=0x3F => 0xFF,

            // V-counter (even) / H-counter (odd)
            0x40..=0x7F => self.vdp.read_port(port),

            // VDP data (even) / status (odd)
            0x80..=0xBF => {
                self.vdp_io_accesses += 1;
                self.vdp.read_port(port)
            }

            // Controller ports
            _ => {
                if port & 1 == 0 {
                    self.read_joypad_a()
                } else {
                    self.read_joypad_b()
                }
            }
        }
    }

    fn io_write(&mut self, port: u16, data: u8) {
        let port = port as u8;
        match port {
            // Memory control (even) / IO control (odd)
            0x00..=0x3F => {
                if port & 1 == 0 {
                    self.write_memory_control(data);
                } else {
                    self.io_control = data;
                }
            }

            // Any port here reaches the PSG; 0x7F is the canonical one and
            // is never shadowed by the VDP counters (those are read-only).
            0x40..=0x7F => {
                self.psg.write(data);
                self.last_psg_byte = data;
            }

            // VDP data (even) / control (odd)
            0x80..=0xBF => {
                self.vdp_io_accesses += 1;
                if port & 1 == 0 {
                    self.last_vdp_data_byte = data;
                }
                self.vdp.write_port(port, data);
            }

            // Controller range has no writable registers
            _ => {}
        }
    }
}

/// Sega Master System (Sega, 1986)
///
/// Hardware: Zilog Z80 @ 3.579545 MHz, SMS VDP (Mode 4), SN76489 PSG,
/// Sega-mapper cartridges up to 256 banks, optional boot ROM overlay.
/// Video: 256×192 active display, tile background + 64 sprites.
#[derive(Debug)]
pub struct SmsSystem {
    cpu: Z80,
    bus: SmsBus,

    // Timing
    clock: u64,
    vdp_wait_penalty: u32,
    prev_vdp_irq: bool,

    // Last completed frame, RGB24
    frame_buffer: Vec<u8>,

    // Audio output (Bresenham resampling from CPU clock to 44.1 kHz)
    audio_buffer: Vec<i16>,
    sample_phase: u64,

    // Pause button edge detect (wired to the Z80 NMI pin)
    pause_down: bool,

    // Boot-ROM escape hatch: force-disable the overlay after this many
    // consecutive frames stuck below 0x0400. Off by default.
    bios_auto_disable_frames: Option<u32>,
    frames_below_boot: u32,
}

impl SmsSystem {
    pub fn new(cartridge: Cartridge, bios: Option<Bios>) -> Self {
        let mut cpu = Z80::new();
        cpu.reset();
        Self {
            cpu,
            bus: SmsBus::new(cartridge, bios),
            clock: 0,
            vdp_wait_penalty: 0,
            prev_vdp_irq: false,
            frame_buffer: vec![0; FRAME_BYTES],
            audio_buffer: Vec::with_capacity(2048),
            sample_phase: 0,
            pause_down: false,
            bios_auto_disable_frames: None,
            frames_below_boot: 0,
        }
    }

    /// Build a machine from raw image bytes, validating the cartridge size.
    pub fn from_images(rom: &[u8], bios: Option<&[u8]>) -> Result<Self, CartridgeError> {
        let cartridge = Cartridge::new(rom.to_vec())?;
        let bios = match bios {
            Some(data) => Some(Bios::new(data.to_vec())?),
            None => None,
        };
        Ok(Self::new(cartridge, bios))
    }

    /// One scheduler iteration: step the CPU, feed the consumed cycles to
    /// the VDP and PSG, then re-latch the VDP's IRQ level into the CPU so
    /// the next step can consider acceptance.
    pub fn step(&mut self) -> StepResult {
        self.bus.vdp_io_accesses = 0;
        let mut result = self.cpu.step_one(&mut self.bus);
        if self.vdp_wait_penalty > 0 {
            result.cycles += self.vdp_wait_penalty * self.bus.vdp_io_accesses;
        }

        self.bus.vdp.tick_cycles(result.cycles as i64);
        self.bus.psg.tick_cycles(result.cycles as i64);

        // Level IRQ: re-assert every step while the VDP holds its line;
        // drop the CPU latch only on the high-to-low transition so other
        // sources (tests, debuggers) are not clobbered.
        let vdp_irq = self.bus.vdp.has_irq();
        if vdp_irq {
            self.cpu.request_irq();
        } else if self.prev_vdp_irq {
            self.cpu.clear_irq();
        }
        self.prev_vdp_irq = vdp_irq;

        self.clock += result.cycles as u64;
        self.pump_audio(result.cycles);
        result
    }

    /// Run at least `budget` cycles (the last instruction may overshoot).
    /// Returns the cycles actually consumed.
    pub fn run_cycles(&mut self, budget: u64) -> u64 {
        let mut spent = 0;
        while spent < budget {
            spent += self.step().cycles as u64;
        }
        spent
    }

    fn pump_audio(&mut self, cycles: u32) {
        self.sample_phase += cycles as u64 * AUDIO_SAMPLE_RATE as u64;
        while self.sample_phase >= CPU_CLOCK_HZ {
            self.sample_phase -= CPU_CLOCK_HZ;
            if self.audio_buffer.len() < AUDIO_BUFFER_CAP {
                self.audio_buffer.push(self.bus.psg.get_sample());
            }
        }
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Wait-state model: extra T-states charged per IN/OUT touching the VDP
    /// ports. 0 disables the model.
    pub fn set_vdp_wait_penalty(&mut self, penalty: u32) {
        self.vdp_wait_penalty = penalty;
    }

    /// Arm (or disarm with `None`) the boot-ROM auto-disable heuristic.
    pub fn set_bios_auto_disable(&mut self, frames: Option<u32>) {
        self.bios_auto_disable_frames = frames;
        self.frames_below_boot = 0;
    }

    pub fn bios_enabled(&self) -> bool {
        self.bus.bios_enabled
    }

    // --- Introspection ---

    pub fn get_cpu_state(&self) -> Z80State {
        self.cpu.get_state()
    }

    pub fn set_cpu_state(&mut self, state: &Z80State) {
        self.cpu.set_state(state);
    }

    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    pub fn vdp(&self) -> &Vdp {
        &self.bus.vdp
    }

    pub fn vdp_mut(&mut self) -> &mut Vdp {
        &mut self.bus.vdp
    }

    pub fn psg(&self) -> &Sn76489 {
        &self.bus.psg
    }

    pub fn psg_mut(&mut self) -> &mut Sn76489 {
        &mut self.bus.psg
    }

    pub fn get_vdp_state(&self) -> VdpState {
        self.bus.vdp.get_state()
    }

    pub fn get_psg_state(&self) -> Sn76489State {
        self.bus.psg.get_state()
    }

    pub fn get_bus_state(&self) -> SmsBusState {
        SmsBusState {
            mapper_control: self.bus.mapper_control,
            banks: self.bus.banks,
            memory_control: self.bus.memory_control,
            io_control: self.bus.io_control,
            bios_enabled: self.bus.bios_enabled,
            last_psg_byte: self.bus.last_psg_byte,
            last_vdp_data_byte: self.bus.last_vdp_data_byte,
        }
    }

    pub fn set_bus_state(&mut self, s: &SmsBusState) {
        self.bus.mapper_control = s.mapper_control;
        self.bus.banks = s.banks;
        self.bus.memory_control = s.memory_control;
        self.bus.io_control = s.io_control;
        self.bus.bios_enabled = s.bios_enabled;
        self.bus.last_psg_byte = s.last_psg_byte;
        self.bus.last_vdp_data_byte = s.last_vdp_data_byte;
    }

    /// CPU-visible memory read, mapper and overlays applied.
    pub fn read_mem(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    /// CPU-visible memory write.
    pub fn write_mem(&mut self, addr: u16, data: u8) {
        self.bus.write(addr, data);
    }

    /// CPU-visible IO read.
    pub fn read_io(&mut self, port: u8) -> u8 {
        self.bus.io_read(port as u16)
    }

    /// CPU-visible IO write.
    pub fn write_io(&mut self, port: u8, data: u8) {
        self.bus.io_write(port as u16, data);
    }
}

impl Machine for SmsSystem {
    fn display_size(&self) -> (u32, u32) {
        (FRAME_WIDTH as u32, FRAME_HEIGHT as u32)
    }

    fn run_frame(&mut self) {
        loop {
            self.step();
            if self.bus.vdp.take_frame_done() {
                break;
            }
        }
        self.bus.vdp.render_into(&mut self.frame_buffer);

        if let Some(limit) = self.bios_auto_disable_frames {
            if self.bus.bios_enabled {
                if self.cpu.pc < 0x0400 {
                    self.frames_below_boot += 1;
                    if self.frames_below_boot >= limit {
                        self.bus.bios_enabled = false;
                    }
                } else {
                    self.frames_below_boot = 0;
                }
            }
        }
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        buffer[..FRAME_BYTES].copy_from_slice(&self.frame_buffer);
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        match button {
            INPUT_P1_UP => set_bit_active_low(&mut self.bus.joypad1, 0, pressed),
            INPUT_P1_DOWN => set_bit_active_low(&mut self.bus.joypad1, 1, pressed),
            INPUT_P1_LEFT => set_bit_active_low(&mut self.bus.joypad1, 2, pressed),
            INPUT_P1_RIGHT => set_bit_active_low(&mut self.bus.joypad1, 3, pressed),
            INPUT_P1_BUTTON1 => set_bit_active_low(&mut self.bus.joypad1, 4, pressed),
            INPUT_P1_BUTTON2 => set_bit_active_low(&mut self.bus.joypad1, 5, pressed),

            INPUT_P2_UP => set_bit_active_low(&mut self.bus.joypad2, 0, pressed),
            INPUT_P2_DOWN => set_bit_active_low(&mut self.bus.joypad2, 1, pressed),
            INPUT_P2_LEFT => set_bit_active_low(&mut self.bus.joypad2, 2, pressed),
            INPUT_P2_RIGHT => set_bit_active_low(&mut self.bus.joypad2, 3, pressed),
            INPUT_P2_BUTTON1 => set_bit_active_low(&mut self.bus.joypad2, 4, pressed),
            INPUT_P2_BUTTON2 => set_bit_active_low(&mut self.bus.joypad2, 5, pressed),

            // The console pause button pulls the Z80 NMI pin
            INPUT_PAUSE => {
                if pressed && !self.pause_down {
                    self.cpu.request_nmi();
                }
                self.pause_down = pressed;
            }

            _ => {}
        }
    }

    fn input_map(&self) -> &[InputButton] {
        SMS_INPUT_MAP
    }

    fn save_nvram(&self) -> Option<&[u8]> {
        if self.bus.cart_ram_written {
            Some(&self.bus.cart_ram[..])
        } else {
            None
        }
    }

    fn load_nvram(&mut self, data: &[u8]) {
        let n = data.len().min(self.bus.cart_ram.len());
        self.bus.cart_ram[..n].copy_from_slice(&data[..n]);
        self.bus.cart_ram_written = true;
    }

    fn reset(&mut self) {
        self.cpu.reset();
        self.bus.vdp.reset();
        self.bus.psg.reset();
        self.bus.ram = [0; 0x2000];
        // Cartridge RAM is battery-backed: not cleared
        self.bus.mapper_control = 0;
        self.bus.banks = [0, 1, 2];
        self.bus.memory_control = 0;
        self.bus.io_control = 0xFF;
        self.bus.bios_enabled = self.bus.bios.is_some();
        self.bus.joypad1 = 0xFF;
        self.bus.joypad2 = 0xFF;
        self.bus.last_psg_byte = 0;
        self.bus.last_vdp_data_byte = 0;
        self.clock = 0;
        self.prev_vdp_irq = false;
        self.frame_buffer.fill(0);
        self.audio_buffer.clear();
        self.sample_phase = 0;
        self.pause_down = false;
        self.frames_below_boot = 0;
    }

    fn fill_audio(&mut self, buffer: &mut [i16]) -> usize {
        let n = buffer.len().min(self.audio_buffer.len());
        buffer[..n].copy_from_slice(&self.audio_buffer[..n]);
        self.audio_buffer.drain(..n);
        n
    }

    fn audio_sample_rate(&self) -> u32 {
        AUDIO_SAMPLE_RATE
    }

    fn frame_rate_hz(&self) -> f64 {
        CPU_CLOCK_HZ as f64 / CYCLES_PER_FRAME as f64
    }
}

/// Active-low bit manipulation: clear bit on press, set bit on release.
fn set_bit_active_low(reg: &mut u8, bit: u8, pressed: bool) {
    if pressed {
        *reg &= !(1 << bit);
    } else {
        *reg |= 1 << bit;
    }
}

// ---------------------------------------------------------------------------
// Machine registry
// ---------------------------------------------------------------------------

fn create_machine(
    rom: &[u8],
    bios: Option<&[u8]>,
) -> Result<Box<dyn Machine>, CartridgeError> {
    Ok(Box::new(SmsSystem::from_images(rom, bios)?))
}

inventory::submit! {
    MachineEntry::new("sms", create_machine)
}
