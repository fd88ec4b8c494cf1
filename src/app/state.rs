//! Application state shared across transport sessions

use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::game::coordinator::{ArenaCoordinator, ArenaRegistry};
use crate::game::ArenaHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arenas: Arc<ArenaRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            arenas: Arc::new(ArenaRegistry::new()),
        }
    }

    /// Create an arena, register it, and spawn its tick loop.
    pub fn spawn_arena(&self) -> ArenaHandle {
        let (coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &self.config);
        self.arenas.insert(handle.clone());
        tokio::spawn(coordinator.run());
        handle
    }

    /// Route a joining player to an arena with room, creating one if
    /// every existing arena is full.
    pub fn arena_for_join(&self) -> ArenaHandle {
        self.arenas
            .find_available_arena(self.config.max_players)
            .unwrap_or_else(|| self.spawn_arena())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::boss::AiPolicy;

    fn test_config() -> Config {
        Config {
            log_level: "info".to_string(),
            ai_policy: AiPolicy::Hunter,
            boss_respawn_delay_ms: 30_000,
            map_half_extent: 80.0,
            max_players: 16,
            seed: 7,
        }
    }

    #[tokio::test]
    async fn spawn_arena_registers_a_handle() {
        let state = AppState::new(test_config());
        let handle = state.spawn_arena();
        assert_eq!(state.arenas.active_arenas(), 1);
        assert!(state.arenas.get(&handle.id).is_some());
    }

    #[tokio::test]
    async fn join_routing_reuses_open_arenas() {
        let state = AppState::new(test_config());
        let first = state.spawn_arena();
        let routed = state.arena_for_join();
        assert_eq!(first.id, routed.id);
        assert_eq!(state.arenas.active_arenas(), 1);
    }
}
