//! Snapshot building and replica reconciliation

use std::collections::HashMap;

use uuid::Uuid;

use crate::net::protocol::{
    BossSnapshot, GameEvent, PickupSnapshot, ServerMsg, VehicleSnapshot,
};

use super::arena::ArenaState;

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force a snapshot on the next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a full snapshot message from the authoritative state
    pub fn build(&mut self, state: &ArenaState, events: Vec<GameEvent>) -> ServerMsg {
        let vehicles: Vec<VehicleSnapshot> = state
            .vehicles
            .values()
            .map(|v| VehicleSnapshot {
                id: v.id,
                owner: v.owner,
                class: v.class,
                x: v.position.x,
                z: v.position.z,
                rotation: v.rotation_y,
                vel_x: v.velocity.x,
                vel_z: v.velocity.z,
                health: v.health,
            })
            .collect();

        let boss = state.boss.as_ref().map(|b| BossSnapshot {
            id: b.id,
            state: b.state,
            x: b.position.x,
            z: b.position.z,
            rotation: b.rotation_y,
            health: b.health,
            max_health: b.max_health,
            difficulty: b.difficulty,
        });

        let pickups: Vec<PickupSnapshot> = state
            .pickups
            .iter()
            .map(|p| PickupSnapshot {
                id: p.id,
                kind: p.kind,
                x: p.position.x,
                z: p.position.z,
            })
            .collect();

        ServerMsg::Snapshot {
            tick: state.tick,
            vehicles,
            boss,
            pickups,
            events,
        }
    }
}

/// A client-side mirror of arena state, rebuilt from snapshots.
///
/// Authority is one-directional: whatever the snapshot says wins. Entities
/// the mirror has never seen are created from the snapshot shell (late
/// join), and tracked entities absent from the snapshot are dropped.
#[derive(Debug, Default)]
pub struct ReplicaState {
    pub tick: u64,
    pub vehicles: HashMap<Uuid, VehicleSnapshot>,
    pub boss: Option<BossSnapshot>,
    pub pickups: HashMap<Uuid, PickupSnapshot>,
}

impl ReplicaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the mirror against an authoritative snapshot. Stale
    /// (out-of-order) snapshots are ignored. Returns the events carried
    /// by the snapshot for presentation-layer consumption.
    pub fn apply_snapshot(&mut self, msg: ServerMsg) -> Vec<GameEvent> {
        let ServerMsg::Snapshot {
            tick,
            vehicles,
            boss,
            pickups,
            events,
        } = msg
        else {
            return Vec::new();
        };
        if tick <= self.tick && self.tick != 0 {
            return Vec::new();
        }
        self.tick = tick;

        self.vehicles.clear();
        for v in vehicles {
            self.vehicles.insert(v.id, v);
        }
        self.boss = boss;

        self.pickups.clear();
        for p in pickups {
            self.pickups.insert(p.id, p);
        }

        events
    }

    /// Drop an entity the server removed out-of-band.
    pub fn remove_vehicle(&mut self, id: Uuid) {
        self.vehicles.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::boss::AiPolicy;
    use crate::game::entity::VehicleClass;
    use crate::game::physics::MapBounds;

    fn arena_with_vehicle() -> (ArenaState, Uuid) {
        let mut state =
            ArenaState::new(Uuid::new_v4(), 1, MapBounds::new(80.0), AiPolicy::Hunter);
        let id = state.spawn_vehicle(Some(Uuid::new_v4()), VehicleClass::Tempest);
        (state, id)
    }

    #[test]
    fn cadence_fires_every_interval_and_force_overrides() {
        let mut builder = SnapshotBuilder::new(3);
        assert!(!builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());

        builder.force_next();
        assert!(builder.should_send());
        assert!(!builder.should_send());
    }

    #[test]
    fn snapshot_carries_full_arena_state() {
        let (mut state, id) = arena_with_vehicle();
        state.spawn_boss(1.3, 0);
        state.tick = 42;

        let mut builder = SnapshotBuilder::new(3);
        let msg = builder.build(&state, Vec::new());

        let ServerMsg::Snapshot {
            tick,
            vehicles,
            boss,
            ..
        } = msg
        else {
            panic!("expected snapshot");
        };
        assert_eq!(tick, 42);
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].id, id);
        let boss = boss.expect("boss present");
        assert!((boss.difficulty - 1.3).abs() < 1e-6);
    }

    #[test]
    fn replica_creates_unknown_entities_and_drops_absent_ones() {
        let (mut state, id) = arena_with_vehicle();
        state.tick = 1;

        let mut builder = SnapshotBuilder::new(1);
        let mut replica = ReplicaState::new();

        replica.apply_snapshot(builder.build(&state, Vec::new()));
        assert!(replica.vehicles.contains_key(&id));

        // The vehicle disappears from authority; the mirror follows.
        state.remove_vehicle(id);
        state.tick = 2;
        replica.apply_snapshot(builder.build(&state, Vec::new()));
        assert!(replica.vehicles.is_empty());
    }

    #[test]
    fn stale_snapshot_is_ignored() {
        let (mut state, id) = arena_with_vehicle();

        let mut builder = SnapshotBuilder::new(1);
        let mut replica = ReplicaState::new();

        state.tick = 10;
        replica.apply_snapshot(builder.build(&state, Vec::new()));

        state.remove_vehicle(id);
        state.tick = 5;
        let events = replica.apply_snapshot(builder.build(&state, Vec::new()));
        assert!(events.is_empty());
        assert!(replica.vehicles.contains_key(&id));
        assert_eq!(replica.tick, 10);
    }

    #[test]
    fn boss_authority_snaps_the_mirror() {
        let (mut state, _) = arena_with_vehicle();
        state.spawn_boss(1.0, 0);
        state.tick = 1;

        let mut builder = SnapshotBuilder::new(1);
        let mut replica = ReplicaState::new();
        replica.apply_snapshot(builder.build(&state, Vec::new()));
        assert!(replica.boss.is_some());

        state.boss.as_mut().unwrap().health = 5.0;
        state.damage_boss(10.0, None);
        state.tick = 2;
        replica.apply_snapshot(builder.build(&state, Vec::new()));
        assert!(replica.boss.is_none());
    }
}
