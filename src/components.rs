//! ECS Components for the wave-survival swarm simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{
    LEVEL_DAMAGE_MULTIPLIER, LEVEL_HEALTH_MULTIPLIER, LEVEL_SPEED_MULTIPLIER, UNIT_ATTACK_RANGE,
    UNIT_DAMAGE, UNIT_HEALTH, UNIT_MAX_SPEED, UNIT_SIZE, XP_PER_LEVEL,
};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position on the battlefield.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 2D velocity vector.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

/// Facing angle in radians, derived from velocity while moving.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Heading(pub f32);

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Which army a unit belongs to. 0 is the player, 1 the enemy swarm.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u8);

/// Marker for elite shadow warriors granted by a reward.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ShadowTroop;

/// Marker for the invincible champion granted by a reward.
#[derive(Component, Debug, Clone, Copy)]
pub struct Champion {
    /// Clock time the champion entered the field, in milliseconds.
    pub spawned_at_ms: f64,
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Health of a unit. A unit with zero health is dead and is despawned
/// at the end of the tick.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(UNIT_HEALTH)
    }
}

/// Physical and combat statistics for a single unit.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnitStats {
    /// Collision radius in world units.
    pub size: f32,
    pub max_speed: f32,
    pub attack_range: f32,
    /// Damage at level 1, before level multipliers.
    pub base_damage: f32,
    /// Current damage including level multipliers.
    pub damage: f32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            size: UNIT_SIZE,
            max_speed: UNIT_MAX_SPEED,
            attack_range: UNIT_ATTACK_RANGE,
            base_damage: UNIT_DAMAGE,
            damage: UNIT_DAMAGE,
        }
    }
}

/// Per-unit combat timers, counted down in ticks.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CombatState {
    /// Ticks until this unit may attack again.
    pub attack_cooldown: u32,
    /// Ticks remaining on the hit flash after taking damage.
    pub hit_cooldown: u32,
}

/// Experience, level and kill count.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Progression {
    pub xp: f32,
    pub level: u32,
    pub kills: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            xp: 0.0,
            level: 1,
            kills: 0,
        }
    }
}

impl Progression {
    /// Add experience and level up once if the threshold is reached.
    /// Leveling raises max health (with a full heal), damage and speed.
    /// Returns true if a level was gained.
    pub fn gain_xp(&mut self, amount: f32, stats: &mut UnitStats, health: &mut Health) -> bool {
        self.xp += amount;
        let xp_needed = self.level as f32 * XP_PER_LEVEL;
        if self.xp < xp_needed {
            return false;
        }
        self.level += 1;
        self.xp = 0.0;
        health.max = (health.max * LEVEL_HEALTH_MULTIPLIER).floor();
        health.current = health.max;
        stats.damage = (stats.damage * LEVEL_DAMAGE_MULTIPLIER).floor();
        stats.max_speed *= LEVEL_SPEED_MULTIPLIER;
        true
    }
}

/// Morale state. Units flee when morale collapses and only rejoin
/// the fight after recovering past a higher threshold.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Morale {
    pub value: f32,
    pub fleeing: bool,
}

impl Default for Morale {
    fn default() -> Self {
        Self {
            value: 100.0,
            fleeing: false,
        }
    }
}

// ============================================================================
// BUNDLES
// ============================================================================

/// Everything a combat unit needs to exist in the world.
#[derive(Bundle, Default)]
pub struct UnitBundle {
    pub position: Position,
    pub velocity: Velocity,
    pub heading: Heading,
    pub team: TeamId,
    pub stats: UnitStats,
    pub combat: CombatState,
    pub progression: Progression,
    pub health: Health,
    pub morale: Morale,
}

impl UnitBundle {
    /// A baseline soldier at the given position.
    pub fn soldier(x: f32, y: f32, team: u8) -> Self {
        Self {
            position: Position::new(x, y),
            team: TeamId(team),
            ..Default::default()
        }
    }

    /// A soldier with overridden combat stats (wave-scaled enemies,
    /// shadow troops, champions).
    pub fn with_stats(x: f32, y: f32, team: u8, stats: UnitStats, health: f32) -> Self {
        Self {
            position: Position::new(x, y),
            team: TeamId(team),
            stats,
            health: Health::new(health),
            ..Default::default()
        }
    }
}

/// Offset from a spawn point for the i-th unit of a formation:
/// a ring that widens by 30 units for every 8 soldiers.
pub fn formation_offset(index: u32, count: u32) -> (f32, f32) {
    let angle = index as f32 / count.max(1) as f32 * std::f32::consts::TAU;
    let radius = 50.0 + (index / 8) as f32 * 30.0;
    (angle.cos() * radius, angle.sin() * radius)
}

// ============================================================================
// TEAMS
// ============================================================================

/// Shared per-army state: display info and the rally target its units
/// are drawn toward.
#[derive(Debug, Clone)]
pub struct Team {
    pub name: String,
    pub color: String,
    pub is_player: bool,
    pub target_x: f32,
    pub target_y: f32,
}

/// Both armies, indexed by `TeamId`.
#[derive(Resource, Debug, Clone)]
pub struct Teams(pub Vec<Team>);

impl Teams {
    /// Player army rallying at the map center, enemy army at its own corner.
    pub fn wave_mode() -> Self {
        Self(vec![
            Team {
                name: "Red".to_string(),
                color: "#E74C3C".to_string(),
                is_player: true,
                target_x: 500.0,
                target_y: 500.0,
            },
            Team {
                name: "Enemies".to_string(),
                color: "#3498DB".to_string(),
                is_player: false,
                target_x: 100.0,
                target_y: 100.0,
            },
        ])
    }
}
