//! Snapshot types and tick events.
//!
//! The `Snapshot` struct provides a serializable view of the simulation
//! state that the host polls for rendering. One-shot events (hits, deaths,
//! level-ups, reward collections) accumulate in `SimEvents` during the
//! tick and ride along on the next snapshot, after which they are cleared.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{
    Champion, CombatState, Health, Heading, Morale, Position, Progression, ShadowTroop, TeamId,
    UnitStats, Velocity,
};
use crate::config::DifficultySettings;
use crate::systems::game_state::GamePhase;
use crate::systems::rewards::{ActiveBuffs, Notification, Pickup, Pickups, RewardKind};
use crate::systems::waves::{ScoreState, WaveState};
use crate::systems::GameClock;

/// A landed attack, for impact effects on the host side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HitEvent {
    pub x: f32,
    pub y: f32,
    /// Team of the unit that was hit.
    pub team: u8,
    pub damage: f32,
    pub crit: bool,
}

/// A unit death.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeathEvent {
    pub x: f32,
    pub y: f32,
    pub team: u8,
}

/// A unit leveling up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LevelUpEvent {
    pub x: f32,
    pub y: f32,
    pub level: u32,
}

/// A reward pickup being collected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RewardCollectedEvent {
    pub kind: RewardKind,
    pub x: f32,
    pub y: f32,
}

/// One-shot events since the last snapshot.
#[derive(Resource, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SimEvents {
    pub hits: Vec<HitEvent>,
    pub deaths: Vec<DeathEvent>,
    pub level_ups: Vec<LevelUpEvent>,
    pub rewards: Vec<RewardCollectedEvent>,
}

/// Snapshot of a single unit's state for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub team: u8,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub health: f32,
    pub health_max: f32,
    pub level: u32,
    pub xp: f32,
    pub kills: u32,
    pub morale: f32,
    pub fleeing: bool,
    /// Unit was hit within the last few ticks (hit flash).
    pub hit: bool,
    pub shadow: bool,
    pub champion: bool,
}

/// Wave progress as seen by the HUD.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WaveSnapshot {
    pub current_wave: u32,
    pub enemies_remaining: u32,
    pub transitioning: bool,
    /// Time left on the wave timer, milliseconds.
    pub remaining_ms: f64,
    /// Time left in the transition pause, milliseconds (zero outside one).
    pub transition_remaining_ms: f64,
}

/// Score as seen by the HUD.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub total: u64,
    pub kills: u32,
    pub waves_completed: u32,
}

/// An active buff with its remaining duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuffSnapshot {
    pub kind: RewardKind,
    pub remaining_ms: f64,
}

/// Complete simulation state snapshot for the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    /// Elapsed simulation time in milliseconds.
    pub time_ms: f64,
    pub phase: Option<GamePhase>,
    pub wave: WaveSnapshot,
    pub score: ScoreSnapshot,
    pub units: Vec<UnitSnapshot>,
    pub pickups: Vec<Pickup>,
    pub buffs: Vec<BuffSnapshot>,
    pub notifications: Vec<Notification>,
    /// One-shot events since the last snapshot.
    pub events: SimEvents,
}

impl Snapshot {
    /// Create a snapshot from the ECS world, draining pending events.
    pub fn from_world(world: &mut World, tick: u64) -> Self {
        let now_ms = world.resource::<GameClock>().now_ms;
        let phase = world.get_resource::<GamePhase>().copied();
        let config = world.resource::<DifficultySettings>().0;
        let wave_state = *world.resource::<WaveState>();
        let score_state = *world.resource::<ScoreState>();
        let pickups = world.resource::<Pickups>().0.clone();
        let active_buffs = world.resource::<ActiveBuffs>().clone();

        let wave = WaveSnapshot {
            current_wave: wave_state.current_wave,
            enemies_remaining: wave_state.enemies_remaining,
            transitioning: wave_state.transitioning,
            remaining_ms: if wave_state.transitioning {
                config.wave.wave_duration_ms
            } else {
                (config.wave.wave_duration_ms - (now_ms - wave_state.wave_start_ms)).max(0.0)
            },
            transition_remaining_ms: if wave_state.transitioning {
                (config.wave.transition_duration_ms - (now_ms - wave_state.transition_start_ms))
                    .max(0.0)
            } else {
                0.0
            },
        };

        let score = ScoreSnapshot {
            total: score_state.total_score,
            kills: score_state.kills,
            waves_completed: score_state.waves_completed,
        };

        let buffs = active_buffs
            .buffs
            .iter()
            .map(|b| BuffSnapshot {
                kind: b.kind,
                remaining_ms: (b.duration_ms - (now_ms - b.start_ms)).max(0.0),
            })
            .collect();

        let mut units = Vec::new();
        let mut query = world.query::<(
            Entity,
            &Position,
            &Velocity,
            &Heading,
            &TeamId,
            &UnitStats,
            &CombatState,
            &Progression,
            &Health,
            &Morale,
            Option<&ShadowTroop>,
            Option<&Champion>,
        )>();
        for (entity, pos, _vel, heading, team, _stats, combat, prog, health, morale, shadow, champ) in
            query.iter(world)
        {
            if !health.is_alive() {
                continue;
            }
            units.push(UnitSnapshot {
                id: entity.index(),
                team: team.0,
                x: pos.x,
                y: pos.y,
                heading: heading.0,
                health: health.current,
                health_max: health.max,
                level: prog.level,
                xp: prog.xp,
                kills: prog.kills,
                morale: morale.value,
                fleeing: morale.fleeing,
                hit: combat.hit_cooldown > 0,
                shadow: shadow.is_some(),
                champion: champ.is_some(),
            });
        }

        // Drain events so each snapshot reports them exactly once
        let events = world
            .get_resource_mut::<SimEvents>()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default();

        Self {
            tick,
            time_ms: now_ms,
            phase,
            wave,
            score,
            units,
            pickups,
            buffs,
            notifications: active_buffs.notifications,
            events,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
