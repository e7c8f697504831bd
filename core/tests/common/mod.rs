use mastersys_core::core::Bus;

/// Minimal bus for testing: flat 64KB read/write memory, recorded IO ports.
pub struct TestBus {
    pub memory: [u8; 0x10000],
    /// Value returned by every IO read.
    pub io_input: u8,
    /// Recorded IO writes as (port low byte, data).
    pub io_writes: Vec<(u8, u8)>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            io_input: 0xFF,
            io_writes: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn io_read(&mut self, _port: u16) -> u8 {
        self.io_input
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.io_writes.push((port as u8, data));
    }
}
