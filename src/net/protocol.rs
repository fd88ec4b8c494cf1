//! Wire message definitions for the transport collaborator.
//! The core only defines these shapes; framing and delivery are the
//! transport's concern.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::boss::BossState;
use crate::game::combat::WeaponKind;
use crate::game::entity::{AppliedEffect, PickupKind, VehicleClass};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request to join the arena
    Join { class: VehicleClass },

    /// Control intent for the current tick
    Intent {
        /// Sequence number for client-side prediction reconciliation
        seq: u32,
        forward: bool,
        backward: bool,
        left: bool,
        right: bool,
        fire: bool,
        special: bool,
    },

    /// Edge-triggered weapon cycle
    SwitchWeapon,

    /// One-shot fire request (alternative to the held `fire` intent flag)
    Fire,

    /// Ping for latency measurement
    Ping { t: u64 },

    /// Leave the arena
    Leave,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { user_id: Uuid, server_time: u64 },

    /// Confirmation of arena join
    Joined {
        arena_id: Uuid,
        /// Seed for deterministic client-side prediction
        seed: u64,
        vehicle_id: Uuid,
    },

    /// A vehicle left or was destroyed and must be dropped by the client
    VehicleRemoved { id: Uuid, reason: String },

    /// Authoritative state snapshot (sent at regular intervals)
    Snapshot {
        /// Server tick number
        tick: u64,
        vehicles: Vec<VehicleSnapshot>,
        boss: Option<BossSnapshot>,
        pickups: Vec<PickupSnapshot>,
        /// Events since the last snapshot
        events: Vec<GameEvent>,
    },

    /// Pong response
    Pong { t: u64 },

    /// Error message
    Error { code: String, message: String },
}

/// Per-vehicle state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: Uuid,
    pub owner: Option<Uuid>,
    pub class: VehicleClass,
    pub x: f32,
    pub z: f32,
    pub rotation: f32,
    pub vel_x: f32,
    pub vel_z: f32,
    pub health: f32,
}

/// Canonical boss state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossSnapshot {
    pub id: Uuid,
    pub state: BossState,
    pub x: f32,
    pub z: f32,
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
    pub difficulty: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: PickupKind,
    pub x: f32,
    pub z: f32,
}

/// Game events (spawns, impacts, kills, boss lifecycle)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    ProjectileSpawned {
        id: Uuid,
        owner: Uuid,
        weapon: WeaponKind,
        x: f32,
        y: f32,
        z: f32,
    },

    ProjectileImpact {
        id: Uuid,
        x: f32,
        z: f32,
        damage: f32,
    },

    VehicleDamaged {
        id: Uuid,
        amount: f32,
        attacker: Option<Uuid>,
    },

    VehicleDestroyed {
        id: Uuid,
        attacker: Option<Uuid>,
    },

    BossSpawned {
        difficulty: f32,
    },

    BossStateChanged {
        state: BossState,
    },

    BossDamaged {
        amount: f32,
        attacker: Option<Uuid>,
    },

    BossDefeated {
        x: f32,
        z: f32,
        kill_streak: u32,
    },

    PickupSpawned {
        id: Uuid,
        x: f32,
        z: f32,
    },

    PickupCollected {
        pickup_id: Uuid,
        vehicle_id: Uuid,
        effect: AppliedEffect,
    },

    PickupExpired {
        pickup_id: Uuid,
    },

    ContactDamage {
        a: Uuid,
        b: Uuid,
        amount: f32,
    },
}
