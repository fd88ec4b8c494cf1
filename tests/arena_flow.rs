//! End-to-end flows through the public crate API: raw simulation ticks
//! against the boss, and the async coordinator join path.

use std::time::Duration;

use uuid::Uuid;

use vehicle_arena_server::game::arena::ArenaState;
use vehicle_arena_server::game::boss::AiPolicy;
use vehicle_arena_server::game::combat::WeaponKind;
use vehicle_arena_server::game::coordinator::HostCommand;
use vehicle_arena_server::game::entity::VehicleClass;
use vehicle_arena_server::game::physics::MapBounds;
use vehicle_arena_server::game::snapshot::{ReplicaState, SnapshotBuilder};
use vehicle_arena_server::net::protocol::{GameEvent, ServerMsg};
use vehicle_arena_server::{AppState, Config};

const DT: f32 = 1.0 / 30.0;

fn test_config(ai_policy: AiPolicy) -> Config {
    Config {
        log_level: "info".to_string(),
        ai_policy,
        boss_respawn_delay_ms: 30_000,
        map_half_extent: 80.0,
        max_players: 16,
        seed: 1234,
    }
}

#[test]
fn homing_missiles_wear_the_boss_down() {
    let mut state = ArenaState::new(Uuid::new_v4(), 1234, MapBounds::new(80.0), AiPolicy::Hunter);
    state.spawn_boss(1.0, 0);
    let boss_max = state.boss.as_ref().unwrap().max_health;

    let shooter = state.spawn_vehicle(Some(Uuid::new_v4()), VehicleClass::Tempest);
    {
        let v = state.vehicles.get_mut(&shooter).unwrap();
        v.position = glam::Vec3::new(0.0, 0.0, -40.0);
        v.refresh_bounds();
        v.grant_weapon(WeaponKind::HomingMissile, 10);
        v.switch_weapon();
    }

    let mut boss_damaged = false;
    let mut now = 1_000;
    for _ in 0..400 {
        now += 33;
        let _ = state.fire_selected(shooter, now);
        for event in state.update(DT, now) {
            if matches!(event, GameEvent::BossDamaged { .. }) {
                boss_damaged = true;
            }
        }
        if state.boss.is_none() {
            break;
        }
    }

    assert!(boss_damaged);
    if let Some(boss) = &state.boss {
        assert!(boss.health < boss_max);
    }
}

#[test]
fn snapshots_keep_a_replica_in_sync_with_the_simulation() {
    let mut state =
        ArenaState::new(Uuid::new_v4(), 7, MapBounds::new(80.0), AiPolicy::Perimeter);
    state.spawn_boss(1.0, 0);
    state.spawn_vehicle(Some(Uuid::new_v4()), VehicleClass::Bulwark);

    let mut builder = SnapshotBuilder::new(3);
    let mut replica = ReplicaState::new();

    let mut now = 1_000;
    for _ in 0..30 {
        now += 33;
        let events = state.update(DT, now);
        if builder.should_send() {
            replica.apply_snapshot(builder.build(&state, events));
        }
    }

    assert_eq!(replica.tick, state.tick);
    assert_eq!(replica.vehicles.len(), state.vehicles.len());
    assert_eq!(replica.boss.is_some(), state.boss.is_some());
}

#[tokio::test]
async fn join_through_the_coordinator_yields_snapshots() {
    let app = AppState::new(test_config(AiPolicy::Hunter));
    let handle = app.spawn_arena();
    let mut rx = handle.snapshot_tx.subscribe();

    handle
        .cmd_tx
        .send(HostCommand::Join {
            user_id: Uuid::new_v4(),
            class: VehicleClass::Scorcher,
        })
        .await
        .unwrap();

    let mut joined = false;
    let mut snapshot = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline && !(joined && snapshot) {
        match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
            Ok(Ok(ServerMsg::Joined { vehicle_id, .. })) => {
                assert_ne!(vehicle_id, Uuid::nil());
                joined = true;
            }
            Ok(Ok(ServerMsg::Snapshot { vehicles, boss, .. })) => {
                if !vehicles.is_empty() && boss.is_some() {
                    snapshot = true;
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) | Err(_) => break,
        }
    }

    assert!(joined);
    assert!(snapshot);
    assert_eq!(handle.player_count(), 1);
}
