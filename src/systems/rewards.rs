//! Reward system: wave-completion pickups and the buffs they grant.
//!
//! A pickup drops after every completed wave. Any living player unit
//! walking over it collects it, granting either a timed buff (tracked in
//! `ActiveBuffs` and queried by the movement and combat systems) or an
//! instant effect such as reinforcements or a full heal. Higher waves roll
//! better rarities.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{
    formation_offset, Champion, Health, Position, ShadowTroop, TeamId, UnitBundle, UnitStats,
};
use crate::config::{
    MAP_SIZE, PLAYER_TEAM, SPAWN_POSITIONS, UNIT_ATTACK_RANGE, UNIT_DAMAGE, UNIT_HEALTH,
    UNIT_MAX_SPEED, UNIT_SIZE,
};
use crate::obstacles::ObstacleField;
use crate::rng::SimRng;
use crate::systems::GameClock;
use crate::world::{RewardCollectedEvent, SimEvents};

pub const PICKUP_SIZE: f32 = 30.0;
pub const COLLECTION_RADIUS: f32 = 40.0;
pub const NOTIFICATION_DURATION_MS: f64 = 5000.0;

const BASE_LEGENDARY_CHANCE: f32 = 0.1;
const LEGENDARY_CHANCE_PER_WAVE: f32 = 0.03;
const MAX_LEGENDARY_CHANCE: f32 = 0.4;
const BASE_RARE_CHANCE: f32 = 0.3;
const RARE_CHANCE_PER_WAVE: f32 = 0.05;
const MAX_RARE_CHANCE: f32 = 0.5;

pub const SHADOW_TROOP_STATS_MULTIPLIER: f32 = 3.0;
pub const CHAMPION_STATS_MULTIPLIER: f32 = 5.0;

/// Reward rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
}

/// Everything a wave-completion pickup can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    DamageBoost,
    SpeedBoost,
    Reinforcements,
    HealthRegen,
    CriticalMastery,
    DivineShield,
    BerserkerRage,
    ShadowTroops,
    ImmortalChampion,
    ArmyExpansion,
}

impl RewardKind {
    pub const ALL: [RewardKind; 10] = [
        RewardKind::DamageBoost,
        RewardKind::SpeedBoost,
        RewardKind::Reinforcements,
        RewardKind::HealthRegen,
        RewardKind::CriticalMastery,
        RewardKind::DivineShield,
        RewardKind::BerserkerRage,
        RewardKind::ShadowTroops,
        RewardKind::ImmortalChampion,
        RewardKind::ArmyExpansion,
    ];

    pub fn rarity(&self) -> Rarity {
        match self {
            RewardKind::DamageBoost
            | RewardKind::SpeedBoost
            | RewardKind::Reinforcements
            | RewardKind::HealthRegen => Rarity::Common,
            RewardKind::CriticalMastery
            | RewardKind::DivineShield
            | RewardKind::BerserkerRage => Rarity::Rare,
            RewardKind::ShadowTroops
            | RewardKind::ImmortalChampion
            | RewardKind::ArmyExpansion => Rarity::Legendary,
        }
    }

    /// Duration of the timed buff this reward grants, if any.
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            RewardKind::DamageBoost => Some(60_000.0),
            RewardKind::SpeedBoost => Some(45_000.0),
            RewardKind::CriticalMastery => Some(30_000.0),
            RewardKind::DivineShield => Some(45_000.0),
            RewardKind::BerserkerRage => Some(30_000.0),
            RewardKind::ImmortalChampion => Some(20_000.0),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RewardKind::DamageBoost => "Damage Boost",
            RewardKind::SpeedBoost => "Speed Boost",
            RewardKind::Reinforcements => "Reinforcements",
            RewardKind::HealthRegen => "Health Regeneration",
            RewardKind::CriticalMastery => "Critical Mastery",
            RewardKind::DivineShield => "Divine Shield",
            RewardKind::BerserkerRage => "Berserker Rage",
            RewardKind::ShadowTroops => "Shadow Troops",
            RewardKind::ImmortalChampion => "Immortal Champion",
            RewardKind::ArmyExpansion => "Army Expansion",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RewardKind::DamageBoost => "2x damage for 60 seconds",
            RewardKind::SpeedBoost => "1.5x speed for 45 seconds",
            RewardKind::Reinforcements => "Add 50 troops to your army",
            RewardKind::HealthRegen => "Heal all troops to full health",
            RewardKind::CriticalMastery => "50% crit chance for 30 seconds",
            RewardKind::DivineShield => "50% damage reduction for 45 seconds",
            RewardKind::BerserkerRage => "3x damage but 0.5x speed for 30 seconds",
            RewardKind::ShadowTroops => "Add 10 elite shadow warriors",
            RewardKind::ImmortalChampion => "1 invincible champion for 20 seconds",
            RewardKind::ArmyExpansion => "Add 100 regular troops",
        }
    }
}

/// A timed buff currently affecting the player's army.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActiveBuff {
    pub kind: RewardKind,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// On-screen message about a collected reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// Player-army buff state, queried read-only by movement and combat.
/// Multipliers from stacked buffs combine multiplicatively.
#[derive(Resource, Debug, Default, Clone)]
pub struct ActiveBuffs {
    pub buffs: Vec<ActiveBuff>,
    pub notifications: Vec<Notification>,
}

impl ActiveBuffs {
    pub fn is_active(&self, kind: RewardKind) -> bool {
        self.buffs.iter().any(|b| b.kind == kind)
    }

    pub fn damage_multiplier(&self) -> f32 {
        let mut multiplier = 1.0;
        if self.is_active(RewardKind::DamageBoost) {
            multiplier *= 2.0;
        }
        if self.is_active(RewardKind::BerserkerRage) {
            multiplier *= 3.0;
        }
        multiplier
    }

    pub fn speed_multiplier(&self) -> f32 {
        let mut multiplier = 1.0;
        if self.is_active(RewardKind::SpeedBoost) {
            multiplier *= 1.5;
        }
        if self.is_active(RewardKind::BerserkerRage) {
            multiplier *= 0.5;
        }
        multiplier
    }

    pub fn crit_chance_bonus(&self) -> f32 {
        if self.is_active(RewardKind::CriticalMastery) {
            0.5
        } else {
            0.0
        }
    }

    pub fn damage_reduction(&self) -> f32 {
        if self.is_active(RewardKind::DivineShield) {
            0.5
        } else {
            0.0
        }
    }

    /// Whether champions are currently invincible.
    pub fn champion_invincible(&self, now_ms: f64) -> bool {
        self.buffs
            .iter()
            .find(|b| b.kind == RewardKind::ImmortalChampion)
            .map(|b| now_ms - b.start_ms < b.duration_ms)
            .unwrap_or(false)
    }

    fn activate(&mut self, kind: RewardKind, now_ms: f64) {
        if let Some(duration_ms) = kind.duration_ms() {
            self.buffs.push(ActiveBuff {
                kind,
                start_ms: now_ms,
                duration_ms,
            });
        }
    }

    fn notify(&mut self, kind: RewardKind, now_ms: f64) {
        self.notifications.push(Notification {
            message: format!("{}: {}", kind.name(), kind.description()),
            start_ms: now_ms,
            duration_ms: NOTIFICATION_DURATION_MS,
        });
    }
}

/// An uncollected reward pickup on the field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pickup {
    pub x: f32,
    pub y: f32,
    pub kind: RewardKind,
}

/// All pickups currently on the field.
#[derive(Resource, Debug, Default, Clone)]
pub struct Pickups(pub Vec<Pickup>);

/// Drop a pickup near the map center, avoiding obstacles. The rarity roll
/// improves with the wave number.
pub fn spawn_pickup(
    pickups: &mut Pickups,
    field: &ObstacleField,
    rng: &mut SimRng,
    wave: u32,
) {
    let kind = select_reward(rng, wave);

    let mut x = MAP_SIZE / 2.0;
    let mut y = MAP_SIZE / 2.0;
    for _ in 0..50 {
        let test_x = MAP_SIZE / 2.0 + rng.range(-200.0, 200.0);
        let test_y = MAP_SIZE / 2.0 + rng.range(-200.0, 200.0);
        if is_valid_pickup_position(field, test_x, test_y) {
            x = test_x;
            y = test_y;
            break;
        }
    }

    pickups.0.push(Pickup { x, y, kind });
}

fn is_valid_pickup_position(field: &ObstacleField, x: f32, y: f32) -> bool {
    let margin = PICKUP_SIZE;
    if x < margin || x > MAP_SIZE - margin || y < margin || y > MAP_SIZE - margin {
        return false;
    }
    !field.collides(x, y, PICKUP_SIZE, PICKUP_SIZE)
}

/// Roll a rarity tier, then pick uniformly within it.
fn select_reward(rng: &mut SimRng, wave: u32) -> RewardKind {
    let wave_bonus = wave.saturating_sub(1) as f32;
    let legendary_chance =
        (BASE_LEGENDARY_CHANCE + wave_bonus * LEGENDARY_CHANCE_PER_WAVE).min(MAX_LEGENDARY_CHANCE);
    let rare_chance = (BASE_RARE_CHANCE + wave_bonus * RARE_CHANCE_PER_WAVE).min(MAX_RARE_CHANCE);

    let roll = rng.unit();
    let rarity = if roll < legendary_chance {
        Rarity::Legendary
    } else if roll < legendary_chance + rare_chance {
        Rarity::Rare
    } else {
        Rarity::Common
    };

    let pool: Vec<RewardKind> = RewardKind::ALL
        .iter()
        .copied()
        .filter(|k| k.rarity() == rarity)
        .collect();
    pool[rng.index(pool.len())]
}

/// Checks pickups for collection by a living player unit, applies their
/// effects, and expires stale buffs and notifications.
pub fn reward_update_system(
    clock: Res<GameClock>,
    mut buffs: ResMut<ActiveBuffs>,
    mut pickups: ResMut<Pickups>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<SimEvents>,
    mut commands: Commands,
    mut query: Query<(&Position, &TeamId, &mut Health)>,
) {
    let now_ms = clock.now_ms;

    let mut collected = Vec::new();
    pickups.0.retain(|pickup| {
        let hit = query.iter().any(|(pos, team, health)| {
            if team.0 != PLAYER_TEAM || !health.is_alive() {
                return false;
            }
            let dx = pos.x - pickup.x;
            let dy = pos.y - pickup.y;
            dx * dx + dy * dy < COLLECTION_RADIUS * COLLECTION_RADIUS
        });
        if hit {
            collected.push(*pickup);
        }
        !hit
    });

    for pickup in collected {
        apply_reward(
            pickup.kind,
            now_ms,
            &mut buffs,
            &mut rng,
            &mut commands,
            &mut query,
        );
        events.rewards.push(RewardCollectedEvent {
            kind: pickup.kind,
            x: pickup.x,
            y: pickup.y,
        });
    }

    buffs
        .buffs
        .retain(|b| now_ms - b.start_ms < b.duration_ms);
    buffs
        .notifications
        .retain(|n| now_ms - n.start_ms < n.duration_ms);
}

fn apply_reward(
    kind: RewardKind,
    now_ms: f64,
    buffs: &mut ActiveBuffs,
    rng: &mut SimRng,
    commands: &mut Commands,
    query: &mut Query<(&Position, &TeamId, &mut Health)>,
) {
    buffs.notify(kind, now_ms);
    buffs.activate(kind, now_ms);

    match kind {
        RewardKind::Reinforcements => spawn_reinforcements(50, rng, commands),
        RewardKind::ArmyExpansion => spawn_reinforcements(100, rng, commands),
        RewardKind::ShadowTroops => spawn_shadow_troops(10, rng, commands),
        RewardKind::ImmortalChampion => spawn_champion(now_ms, rng, commands),
        RewardKind::HealthRegen => {
            for (_, team, mut health) in query.iter_mut() {
                if team.0 == PLAYER_TEAM && health.is_alive() {
                    health.current = health.max;
                }
            }
        }
        _ => {}
    }
}

fn spawn_reinforcements(count: u32, rng: &mut SimRng, commands: &mut Commands) {
    let (sx, sy) = SPAWN_POSITIONS[PLAYER_TEAM as usize];
    for i in 0..count {
        let (dx, dy) = formation_offset(i, count);
        commands.spawn(UnitBundle::soldier(
            sx + dx + rng.range(-20.0, 20.0),
            sy + dy + rng.range(-20.0, 20.0),
            PLAYER_TEAM,
        ));
    }
}

fn spawn_shadow_troops(count: u32, rng: &mut SimRng, commands: &mut Commands) {
    let (sx, sy) = SPAWN_POSITIONS[PLAYER_TEAM as usize];
    let stats = UnitStats {
        size: UNIT_SIZE,
        max_speed: UNIT_MAX_SPEED * 1.8,
        attack_range: UNIT_ATTACK_RANGE * 1.5,
        base_damage: UNIT_DAMAGE * SHADOW_TROOP_STATS_MULTIPLIER,
        damage: UNIT_DAMAGE * SHADOW_TROOP_STATS_MULTIPLIER,
    };
    for i in 0..count {
        let angle = i as f32 / count as f32 * std::f32::consts::TAU;
        let radius = 60.0;
        commands.spawn((
            UnitBundle::with_stats(
                sx + angle.cos() * radius + rng.range(-20.0, 20.0),
                sy + angle.sin() * radius + rng.range(-20.0, 20.0),
                PLAYER_TEAM,
                stats,
                UNIT_HEALTH * SHADOW_TROOP_STATS_MULTIPLIER,
            ),
            ShadowTroop,
        ));
    }
}

fn spawn_champion(now_ms: f64, rng: &mut SimRng, commands: &mut Commands) {
    let (sx, sy) = SPAWN_POSITIONS[PLAYER_TEAM as usize];
    let stats = UnitStats {
        size: UNIT_SIZE * 1.5,
        max_speed: UNIT_MAX_SPEED * 1.5,
        attack_range: UNIT_ATTACK_RANGE * 2.0,
        base_damage: UNIT_DAMAGE * CHAMPION_STATS_MULTIPLIER,
        damage: UNIT_DAMAGE * CHAMPION_STATS_MULTIPLIER,
    };
    commands.spawn((
        UnitBundle::with_stats(
            sx + rng.range(-20.0, 20.0),
            sy + rng.range(-20.0, 20.0),
            PLAYER_TEAM,
            stats,
            UNIT_HEALTH * CHAMPION_STATS_MULTIPLIER,
        ),
        Champion {
            spawned_at_ms: now_ms,
        },
    ));
}
