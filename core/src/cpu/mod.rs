// Re-export state types
pub mod state;
pub use state::{StepResult, TraceEvent, Z80State};

// Z80 CPU
pub mod z80;
pub use z80::Z80;
