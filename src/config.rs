//! Tunable constants and difficulty configuration.
//!
//! Per-system behavior constants live next to the systems that use them;
//! this module holds the values shared across the whole simulation:
//! world geometry, base unit stats, and the difficulty/scoring tables.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Side length of the square battlefield in world units.
pub const MAP_SIZE: f32 = 1000.0;

/// Spatial grid cell size in world units.
pub const GRID_CELL_SIZE: f32 = 20.0;

/// Where each team's army spawns: (player, enemy).
pub const SPAWN_POSITIONS: [(f32, f32); 2] = [(100.0, 100.0), (900.0, 100.0)];

/// Player team index. Team 1 is the enemy swarm.
pub const PLAYER_TEAM: u8 = 0;
pub const ENEMY_TEAM: u8 = 1;

// ============================================================================
// BASE UNIT STATS
// ============================================================================

pub const UNIT_SIZE: f32 = 8.0;
pub const UNIT_SPACING: f32 = 16.0;
pub const UNIT_MAX_SPEED: f32 = 6.5;
pub const UNIT_HEALTH: f32 = 100.0;
pub const UNIT_DAMAGE: f32 = 20.0;
pub const UNIT_ATTACK_RANGE: f32 = 20.0;
pub const UNIT_ATTACK_COOLDOWN: u32 = 15;
pub const XP_PER_KILL: f32 = 10.0;

// ============================================================================
// PROGRESSION
// ============================================================================

pub const XP_PER_LEVEL: f32 = 100.0;
pub const LEVEL_HEALTH_MULTIPLIER: f32 = 1.15;
pub const LEVEL_DAMAGE_MULTIPLIER: f32 = 1.1;
pub const LEVEL_SPEED_MULTIPLIER: f32 = 1.05;

// ============================================================================
// SCORING
// ============================================================================

pub const POINTS_PER_KILL: f32 = 10.0;
pub const WAVE_COMPLETION_BONUS: f32 = 100.0;
pub const TIME_BONUS_MULTIPLIER: f32 = 2.0;
pub const SURVIVAL_BONUS: f32 = 50.0;

// ============================================================================
// DIFFICULTY
// ============================================================================

/// Difficulty presets selected at world creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

/// Wave pacing parameters for one difficulty level.
#[derive(Debug, Clone, Copy)]
pub struct WaveConfig {
    /// Enemies in wave 1.
    pub base_enemy_count: u32,
    /// Extra enemies per subsequent wave.
    pub enemy_count_increase: u32,
    /// Compounding stat growth applied per wave.
    pub stat_multiplier_per_wave: f32,
    /// Wave timer in milliseconds.
    pub wave_duration_ms: f64,
    /// Pause between waves in milliseconds.
    pub transition_duration_ms: f64,
}

/// Full tuning block for one difficulty level.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyConfig {
    pub difficulty: Difficulty,
    pub wave: WaveConfig,
    pub enemy_health_multiplier: f32,
    pub enemy_damage_multiplier: f32,
    pub enemy_speed_multiplier: f32,
    pub points_multiplier: f32,
}

impl DifficultyConfig {
    /// Look up the tuning block for a difficulty level.
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => DifficultyConfig {
                difficulty,
                wave: WaveConfig {
                    base_enemy_count: 15,
                    enemy_count_increase: 3,
                    stat_multiplier_per_wave: 1.08,
                    wave_duration_ms: 90_000.0,
                    transition_duration_ms: 3_000.0,
                },
                enemy_health_multiplier: 0.8,
                enemy_damage_multiplier: 0.7,
                enemy_speed_multiplier: 1.0,
                points_multiplier: 1.0,
            },
            Difficulty::Medium => DifficultyConfig {
                difficulty,
                wave: WaveConfig {
                    base_enemy_count: 20,
                    enemy_count_increase: 5,
                    stat_multiplier_per_wave: 1.12,
                    wave_duration_ms: 75_000.0,
                    transition_duration_ms: 2_000.0,
                },
                enemy_health_multiplier: 1.0,
                enemy_damage_multiplier: 1.0,
                enemy_speed_multiplier: 1.15,
                points_multiplier: 1.5,
            },
            Difficulty::Hard => DifficultyConfig {
                difficulty,
                wave: WaveConfig {
                    base_enemy_count: 30,
                    enemy_count_increase: 8,
                    stat_multiplier_per_wave: 1.15,
                    wave_duration_ms: 60_000.0,
                    transition_duration_ms: 2_000.0,
                },
                enemy_health_multiplier: 1.2,
                enemy_damage_multiplier: 1.3,
                enemy_speed_multiplier: 1.3,
                points_multiplier: 2.0,
            },
        }
    }
}

/// The active difficulty tuning, inserted as a resource at world creation.
#[derive(Resource, Debug, Clone, Copy)]
pub struct DifficultySettings(pub DifficultyConfig);

impl DifficultySettings {
    pub fn new(difficulty: Difficulty) -> Self {
        Self(DifficultyConfig::for_difficulty(difficulty))
    }
}
