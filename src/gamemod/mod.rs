// src/gamemod/mod.rs
pub mod controller;
pub mod memory;
#[cfg(windows)]
mod windows;
pub use controller::{GameMod, GameModParams, GameModStatus};
pub use memory::ProcessConnector;
/// Process memory backend for the current platform.
pub fn platform_connector() -> Box<dyn ProcessConnector> {
    #[cfg(windows)]
    {
        Box::new(windows::WindowsConnector)
    }
    #[cfg(not(windows))]
    {
        Box::new(memory::UnsupportedConnector)
    }
}
