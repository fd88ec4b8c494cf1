//! Authoritative arena coordinator and tick loop

use dashmap::DashMap;
use glam::Vec3;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::net::protocol::{GameEvent, ServerMsg};
use crate::util::time::{unix_millis, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};

use super::arena::{ArenaState, ArenaView};
use super::entity::VehicleClass;
use super::physics::MapBounds;
use super::snapshot::SnapshotBuilder;
use super::ControlIntent;

/// Reward pickups spawned per defeat is `BASE + streak`, capped.
const REWARD_PICKUP_BASE: usize = 2;
const REWARD_PICKUP_CAP: usize = 8;
/// Players counted toward difficulty scaling are capped here.
const DIFFICULTY_PLAYER_CAP: usize = 8;
const DIFFICULTY_PER_PLAYER: f32 = 0.15;
const DIFFICULTY_PER_STREAK: f32 = 0.25;

/// Commands sent into the coordinator by transport sessions and admin
/// surfaces. The coordinator is the only task that touches `ArenaState`.
#[derive(Debug)]
pub enum HostCommand {
    Join {
        user_id: Uuid,
        class: VehicleClass,
    },
    Intent {
        vehicle_id: Uuid,
        seq: u32,
        intent: ControlIntent,
    },
    SwitchWeapon {
        vehicle_id: Uuid,
    },
    Fire {
        vehicle_id: Uuid,
    },
    Leave {
        vehicle_id: Uuid,
    },
    /// Spawn the boss immediately, cancelling any pending respawn
    SpawnBoss,
    /// Admin difficulty override
    SetDifficulty {
        value: f32,
    },
    Ping {
        t: u64,
    },
}

/// Handle to a running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub id: Uuid,
    pub cmd_tx: mpsc::Sender<HostCommand>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    /// Latest render view, refreshed on the snapshot cadence
    pub view: Arc<parking_lot::RwLock<ArenaView>>,
    pub player_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active arenas
pub struct ArenaRegistry {
    arenas: DashMap<Uuid, ArenaHandle>,
}

impl ArenaRegistry {
    pub fn new() -> Self {
        Self {
            arenas: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<ArenaHandle> {
        self.arenas.get(id).map(|a| a.value().clone())
    }

    pub fn insert(&self, handle: ArenaHandle) {
        self.arenas.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<ArenaHandle> {
        self.arenas.remove(id).map(|(_, h)| h)
    }

    pub fn active_arenas(&self) -> usize {
        self.arenas.len()
    }

    pub fn total_players(&self) -> usize {
        self.arenas.iter().map(|a| a.value().player_count()).sum()
    }

    /// Find an arena with available slots
    pub fn find_available_arena(&self, max_players: usize) -> Option<ArenaHandle> {
        for entry in self.arenas.iter() {
            if entry.value().player_count() < max_players {
                return Some(entry.value().clone());
            }
        }
        None
    }
}

impl Default for ArenaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative arena coordinator
pub struct ArenaCoordinator {
    state: ArenaState,
    cmd_rx: mpsc::Receiver<HostCommand>,
    /// Weak handle for the respawn timer, so the coordinator itself never
    /// keeps the command channel alive
    cmd_weak: mpsc::WeakSender<HostCommand>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    view: Arc<parking_lot::RwLock<ArenaView>>,
    player_count: Arc<AtomicUsize>,

    max_players: usize,
    respawn_delay_ms: u64,
    kill_streak: u32,
    difficulty_override: Option<f32>,
    /// Pending respawn timer; aborted when the boss spawns directly
    respawn: Option<JoinHandle<()>>,
}

impl ArenaCoordinator {
    /// Create a new arena
    pub fn new(id: Uuid, config: &Config) -> (Self, ArenaHandle) {
        let seed = if config.seed != 0 {
            config.seed
        } else {
            unix_millis()
        };

        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);
        let view = Arc::new(parking_lot::RwLock::new(ArenaView::default()));
        let player_count = Arc::new(AtomicUsize::new(0));

        let cmd_weak = cmd_tx.downgrade();
        let handle = ArenaHandle {
            id,
            cmd_tx,
            snapshot_tx: snapshot_tx.clone(),
            view: view.clone(),
            player_count: player_count.clone(),
        };

        let snapshot_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        let coordinator = Self {
            state: ArenaState::new(
                id,
                seed,
                MapBounds::new(config.map_half_extent),
                config.ai_policy,
            ),
            cmd_rx,
            cmd_weak,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(snapshot_interval),
            view,
            player_count,
            max_players: config.max_players,
            respawn_delay_ms: config.boss_respawn_delay_ms,
            kill_streak: 0,
            difficulty_override: None,
            respawn: None,
        };

        (coordinator, handle)
    }

    /// Run the authoritative tick loop until every command sender is gone
    pub async fn run(mut self) {
        info!(arena_id = %self.state.id, seed = self.state.seed, "Arena started");

        self.state.spawn_boss(self.current_difficulty(), unix_millis());
        self.snapshot_builder.force_next();

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if !self.tick_once(unix_millis()) {
                break;
            }
        }

        if let Some(handle) = self.respawn.take() {
            handle.abort();
        }
        info!(arena_id = %self.state.id, "Arena stopped");
    }

    /// Drain commands, run one simulation tick, and broadcast on cadence.
    /// Returns false once the command channel is closed.
    fn tick_once(&mut self, now: u64) -> bool {
        if !self.process_commands(now) {
            return false;
        }

        let mut events = self.state.update(crate::util::time::tick_delta(), now);
        self.process_events(&mut events, now);

        if self.snapshot_builder.should_send() {
            *self.view.write() = self.state.render_view();
            let snapshot = self.snapshot_builder.build(&self.state, events);
            let _ = self.snapshot_tx.send(snapshot);
        }

        true
    }

    /// Process all pending commands. Returns false when the channel closed.
    fn process_commands(&mut self, now: u64) -> bool {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd, now),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_command(&mut self, cmd: HostCommand, now: u64) {
        match cmd {
            HostCommand::Join { user_id, class } => self.handle_join(user_id, class),
            HostCommand::Intent {
                vehicle_id,
                seq,
                intent,
            } => {
                self.state.apply_intent(vehicle_id, seq, intent);
            }
            HostCommand::SwitchWeapon { vehicle_id } => {
                self.state.switch_weapon(vehicle_id);
            }
            HostCommand::Fire { vehicle_id } => {
                let _ = self.state.fire_selected(vehicle_id, now);
            }
            HostCommand::Leave { vehicle_id } => self.handle_leave(vehicle_id),
            HostCommand::SpawnBoss => {
                // A live boss wins over any spawn request.
                if let Some(handle) = self.respawn.take() {
                    handle.abort();
                }
                if self.state.spawn_boss(self.current_difficulty(), now) {
                    self.snapshot_builder.force_next();
                }
            }
            HostCommand::SetDifficulty { value } => {
                self.difficulty_override = Some(value);
                self.state.set_difficulty(value);
                info!(arena_id = %self.state.id, difficulty = value, "Difficulty override");
            }
            HostCommand::Ping { t } => {
                let _ = self.snapshot_tx.send(ServerMsg::Pong { t });
            }
        }
    }

    fn handle_join(&mut self, user_id: Uuid, class: VehicleClass) {
        if self
            .state
            .vehicles
            .values()
            .any(|v| v.owner == Some(user_id))
        {
            warn!(user_id = %user_id, "Player already in arena");
            return;
        }

        if self.occupied_slots() >= self.max_players {
            let _ = self.snapshot_tx.send(ServerMsg::Error {
                code: "arena_full".to_string(),
                message: "Arena is full".to_string(),
            });
            return;
        }

        let vehicle_id = self.state.spawn_vehicle(Some(user_id), class);
        self.refresh_player_count();
        self.refresh_difficulty();
        self.snapshot_builder.force_next();

        let _ = self.snapshot_tx.send(ServerMsg::Joined {
            arena_id: self.state.id,
            seed: self.state.seed,
            vehicle_id,
        });

        info!(
            arena_id = %self.state.id,
            user_id = %user_id,
            vehicle_id = %vehicle_id,
            player_count = self.occupied_slots(),
            "Player joined arena"
        );
    }

    fn handle_leave(&mut self, vehicle_id: Uuid) {
        if self.state.remove_vehicle(vehicle_id) {
            self.refresh_player_count();
            self.refresh_difficulty();

            let _ = self.snapshot_tx.send(ServerMsg::VehicleRemoved {
                id: vehicle_id,
                reason: "disconnected".to_string(),
            });

            info!(
                arena_id = %self.state.id,
                vehicle_id = %vehicle_id,
                "Player left arena"
            );
        }
    }

    /// React to simulation events the coordinator owns policy for: the
    /// kill streak, reward drops, and the respawn timer.
    fn process_events(&mut self, events: &mut [GameEvent], now: u64) {
        let mut defeat_at: Option<Vec3> = None;

        for event in events.iter_mut() {
            match event {
                GameEvent::BossDefeated { x, z, kill_streak } => {
                    self.kill_streak += 1;
                    *kill_streak = self.kill_streak;
                    defeat_at = Some(Vec3::new(*x, 0.0, *z));
                }
                GameEvent::VehicleDestroyed { id, .. } => {
                    let id = *id;
                    self.refresh_player_count();
                    let _ = self.snapshot_tx.send(ServerMsg::VehicleRemoved {
                        id,
                        reason: "destroyed".to_string(),
                    });
                }
                _ => {}
            }
        }

        if let Some(center) = defeat_at {
            let count = (REWARD_PICKUP_BASE + self.kill_streak as usize).min(REWARD_PICKUP_CAP);
            self.state.spawn_reward_pickups(center, count, now);
            self.schedule_respawn();
            self.snapshot_builder.force_next();

            info!(
                arena_id = %self.state.id,
                kill_streak = self.kill_streak,
                rewards = count,
                "Boss defeated"
            );
        }
    }

    /// Arm the respawn timer. The timer task feeds back through the
    /// command channel so the coordinator stays single-writer.
    fn schedule_respawn(&mut self) {
        if let Some(handle) = self.respawn.take() {
            handle.abort();
        }
        let cmd_weak = self.cmd_weak.clone();
        let delay = Duration::from_millis(self.respawn_delay_ms);
        self.respawn = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(cmd_tx) = cmd_weak.upgrade() {
                let _ = cmd_tx.send(HostCommand::SpawnBoss).await;
            }
        }));
    }

    /// Boss difficulty scales with occupancy and the defeat streak unless
    /// an admin override is active.
    fn current_difficulty(&self) -> f32 {
        if let Some(value) = self.difficulty_override {
            return value;
        }
        scaled_difficulty(self.occupied_slots(), self.kill_streak)
    }

    fn refresh_difficulty(&mut self) {
        self.state.set_difficulty(self.current_difficulty());
    }

    fn occupied_slots(&self) -> usize {
        self.state
            .vehicles
            .values()
            .filter(|v| v.owner.is_some())
            .count()
    }

    fn refresh_player_count(&self) {
        self.player_count
            .store(self.occupied_slots(), Ordering::Relaxed);
    }
}

/// Difficulty curve: every player adds a slice, every streak kill adds a
/// bigger one, and the player term saturates so full lobbies stay sane.
pub fn scaled_difficulty(players: usize, kill_streak: u32) -> f32 {
    1.0 + DIFFICULTY_PER_PLAYER * players.min(DIFFICULTY_PLAYER_CAP) as f32
        + DIFFICULTY_PER_STREAK * kill_streak as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::boss::AiPolicy;

    fn test_config(respawn_delay_ms: u64) -> Config {
        Config {
            log_level: "info".to_string(),
            ai_policy: AiPolicy::Hunter,
            boss_respawn_delay_ms: respawn_delay_ms,
            map_half_extent: 80.0,
            max_players: 4,
            seed: 99,
        }
    }

    #[test]
    fn difficulty_scales_and_saturates() {
        assert!((scaled_difficulty(0, 0) - 1.0).abs() < 1e-6);
        assert!(scaled_difficulty(1, 0) > scaled_difficulty(0, 0));
        assert!(scaled_difficulty(4, 2) > scaled_difficulty(4, 1));
        // Player term saturates at the cap.
        assert!((scaled_difficulty(8, 0) - scaled_difficulty(16, 0)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn join_spawns_vehicle_and_updates_count() {
        let (mut coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &test_config(30_000));
        let mut rx = handle.snapshot_tx.subscribe();

        handle
            .cmd_tx
            .send(HostCommand::Join {
                user_id: Uuid::new_v4(),
                class: VehicleClass::Scorcher,
            })
            .await
            .unwrap();

        assert!(coordinator.tick_once(1_000));
        assert_eq!(handle.player_count(), 1);
        assert_eq!(coordinator.state.vehicles.len(), 1);

        let msg = rx.try_recv().unwrap();
        assert!(matches!(msg, ServerMsg::Joined { .. }));
    }

    #[tokio::test]
    async fn duplicate_join_is_rejected() {
        let (mut coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &test_config(30_000));
        let user_id = Uuid::new_v4();

        for _ in 0..2 {
            handle
                .cmd_tx
                .send(HostCommand::Join {
                    user_id,
                    class: VehicleClass::Raider,
                })
                .await
                .unwrap();
        }
        assert!(coordinator.tick_once(1_000));
        assert_eq!(coordinator.state.vehicles.len(), 1);
    }

    #[tokio::test]
    async fn full_arena_rejects_join_with_error() {
        let (mut coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &test_config(30_000));
        let mut rx = handle.snapshot_tx.subscribe();

        for _ in 0..5 {
            handle
                .cmd_tx
                .send(HostCommand::Join {
                    user_id: Uuid::new_v4(),
                    class: VehicleClass::Bulwark,
                })
                .await
                .unwrap();
        }
        assert!(coordinator.tick_once(1_000));
        assert_eq!(coordinator.state.vehicles.len(), 4);

        let mut saw_full = false;
        while let Ok(msg) = rx.try_recv() {
            if matches!(msg, ServerMsg::Error { ref code, .. } if code == "arena_full") {
                saw_full = true;
            }
        }
        assert!(saw_full);
    }

    #[tokio::test(start_paused = true)]
    async fn defeat_schedules_respawn_and_rewards() {
        let (mut coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &test_config(1_000));
        coordinator.state.spawn_boss(1.0, 0);
        coordinator.state.boss.as_mut().unwrap().health = 1.0;
        coordinator.state.damage_boss(10.0, None);

        assert!(coordinator.tick_once(1_000));
        assert!(coordinator.state.boss.is_none());
        assert!(coordinator.respawn.is_some());
        assert_eq!(coordinator.kill_streak, 1);
        // Four map pickups from the first refresh plus three rewards.
        assert_eq!(coordinator.state.pickups.len(), 7);

        // Let the timer task register its sleep before moving the paused
        // clock, then let it fire and feed the spawn command back in.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1_100)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(coordinator.tick_once(3_000));
        assert!(coordinator.state.boss.is_some());

        // Streak raises the difficulty of the respawned boss.
        let difficulty = coordinator.state.boss.as_ref().unwrap().difficulty;
        assert!((difficulty - scaled_difficulty(0, 1)).abs() < 1e-6);

        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_spawn_cancels_pending_respawn() {
        let (mut coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &test_config(1_000));
        coordinator.state.spawn_boss(1.0, 0);
        coordinator.state.boss.as_mut().unwrap().health = 1.0;
        coordinator.state.damage_boss(10.0, None);
        assert!(coordinator.tick_once(1_000));
        assert!(coordinator.respawn.is_some());

        handle.cmd_tx.send(HostCommand::SpawnBoss).await.unwrap();
        assert!(coordinator.tick_once(2_000));
        assert!(coordinator.state.boss.is_some());
        assert!(coordinator.respawn.is_none());
    }

    #[tokio::test]
    async fn closed_channel_stops_the_loop() {
        let (mut coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &test_config(30_000));
        drop(handle);
        assert!(!coordinator.tick_once(1_000));
    }

    #[test]
    fn registry_tracks_and_finds_arenas() {
        let registry = ArenaRegistry::new();
        let (_coordinator, handle) = ArenaCoordinator::new(Uuid::new_v4(), &test_config(30_000));
        let id = handle.id;

        registry.insert(handle);
        assert_eq!(registry.active_arenas(), 1);
        assert!(registry.get(&id).is_some());
        assert!(registry.find_available_arena(16).is_some());
        assert!(registry.remove(&id).is_some());
        assert_eq!(registry.active_arenas(), 0);
    }
}
