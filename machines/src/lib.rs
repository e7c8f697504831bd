pub mod cartridge;
pub mod registry;
pub mod sms;

pub use cartridge::{Bios, Cartridge, CartridgeError};
pub use sms::SmsSystem;
