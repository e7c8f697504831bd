//! Machine registry for automatic front-end discovery.
//!
//! Each front-end-capable machine self-registers via [`inventory::submit!`]
//! with a [`MachineEntry`] containing its CLI name and a factory function.
//! The front-end discovers available machines at runtime without any
//! central list.

use mastersys_core::core::machine::Machine;

use crate::cartridge::CartridgeError;

/// Describes a front-end-capable machine.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "sms").
    pub name: &'static str,
    /// Factory: construct a Machine from a cartridge image and an optional
    /// boot ROM image.
    pub create: fn(&[u8], Option<&[u8]>) -> Result<Box<dyn Machine>, CartridgeError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        create: fn(&[u8], Option<&[u8]>) -> Result<Box<dyn Machine>, CartridgeError>,
    ) -> Self {
        Self { name, create }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered front-end-capable machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
