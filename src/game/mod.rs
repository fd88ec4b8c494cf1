//! Game simulation modules

pub mod arena;
pub mod boss;
pub mod combat;
pub mod coordinator;
pub mod entity;
pub mod physics;
pub mod snapshot;

pub use arena::{ArenaState, ArenaView};
pub use coordinator::{ArenaCoordinator, ArenaHandle, HostCommand};
pub use entity::Vehicle;

/// Control intent for one vehicle, consumed once per tick.
/// The input-capture collaborator translates keyboard/touch into these flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    /// Handbrake: extra drag while held
    pub special: bool,
}
