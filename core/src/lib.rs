pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::machine::{InputButton, Machine};
    pub use crate::core::Bus;
    pub use crate::cpu::state::{StepResult, Z80State};
    pub use crate::cpu::z80::Z80;
    pub use crate::device::sn76489::Sn76489;
    pub use crate::device::vdp::Vdp;
}
