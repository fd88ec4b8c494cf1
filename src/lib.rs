//! Vehicle Arena Server - authoritative combat simulation core
//!
//! The crate owns the canonical game state for a vehicular boss-fight
//! arena: vehicles, weapons, projectiles, the boss AI state machine,
//! and the collision/physics resolver. Transport, rendering, and input
//! capture are collaborators that talk to the coordinator through
//! commands and snapshots; nothing in here touches a socket.

pub mod app;
pub mod config;
pub mod game;
pub mod math;
pub mod net;
pub mod util;

pub use app::AppState;
pub use config::Config;
