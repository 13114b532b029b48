//! Enemy commander AI.
//!
//! The enemy army shares a single team target, recomputed periodically from
//! the power balance between the two armies. Power weighs head count by
//! average level, and the resulting ratio picks one of five strategies that
//! range from encirclement at overwhelming advantage down to full retreat.
//! Tick-driven sine wobbles keep the maneuvers from looking mechanical.

use std::f32::consts::PI;

use bevy_ecs::prelude::*;

use crate::components::{Health, Position, Progression, TeamId, Teams};
use crate::config::{ENEMY_TEAM, PLAYER_TEAM};
use crate::systems::SimTick;

/// Ticks between strategy recomputations.
const STRATEGY_INTERVAL: i32 = 15;
/// Power ratio when the player army is wiped out.
const RATIO_NO_PLAYERS: f32 = 999.0;
/// How much each average level adds to an army's power.
const LEVEL_POWER_WEIGHT: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AiStrategy {
    /// Surround and crush with superior numbers.
    Overwhelming,
    /// Confident flanking and encirclement.
    Strong,
    /// Tactical positioning with calculated aggression.
    #[default]
    Even,
    /// Kiting and hit-and-run.
    Weak,
    /// Full retreat with evasive maneuvers.
    Desperate,
}

/// Strategy state for the enemy commander.
#[derive(Resource, Debug)]
pub struct EnemyAi {
    pub strategy: AiStrategy,
    pub update_timer: i32,
}

impl Default for EnemyAi {
    fn default() -> Self {
        Self {
            strategy: AiStrategy::default(),
            update_timer: STRATEGY_INTERVAL,
        }
    }
}

struct ArmyReadout {
    center: Option<(f32, f32)>,
    count: u32,
    total_level: u32,
}

impl ArmyReadout {
    fn power(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let avg_level = self.total_level as f32 / self.count as f32;
        self.count as f32 * (1.0 + avg_level * LEVEL_POWER_WEIGHT)
    }
}

/// Retargets the enemy team every few ticks based on the power balance.
pub fn ai_targeting_system(
    tick: Res<SimTick>,
    mut ai: ResMut<EnemyAi>,
    mut teams: ResMut<Teams>,
    query: Query<(&Position, &TeamId, &Health, &Progression)>,
) {
    ai.update_timer -= 1;
    if ai.update_timer > 0 {
        return;
    }
    ai.update_timer = STRATEGY_INTERVAL;

    let (players, enemies) = survey_armies(&query);
    let Some(player_center) = players.center else {
        return;
    };
    let Some(enemy_center) = enemies.center else {
        // Nothing left to maneuver with; converge on the player
        teams.0[ENEMY_TEAM as usize].target_x = player_center.0;
        teams.0[ENEMY_TEAM as usize].target_y = player_center.1;
        return;
    };

    let ratio = power_ratio(&players, &enemies);
    ai.strategy = select_strategy(ratio);

    let dx = player_center.0 - enemy_center.0;
    let dy = player_center.1 - enemy_center.1;
    let dist = (dx * dx + dy * dy).sqrt();
    let angle_to_player = dy.atan2(dx);
    let t = tick.0 as f32;

    let (tx, ty) = match ai.strategy {
        AiStrategy::Overwhelming => overwhelming_target(player_center, dist, angle_to_player, t),
        AiStrategy::Strong => strong_target(player_center, dist, angle_to_player, t),
        AiStrategy::Even => even_target(player_center, enemy_center, dist, angle_to_player, t),
        AiStrategy::Weak => weak_target(player_center, enemy_center, dist, angle_to_player, t),
        AiStrategy::Desperate => desperate_target(enemy_center, angle_to_player, t),
    };

    // Desperate retreats snap harder toward the new target
    let smoothing = if ai.strategy == AiStrategy::Desperate {
        0.5
    } else {
        0.3
    };
    let team = &mut teams.0[ENEMY_TEAM as usize];
    team.target_x = team.target_x * (1.0 - smoothing) + tx * smoothing;
    team.target_y = team.target_y * (1.0 - smoothing) + ty * smoothing;
}

fn survey_armies(query: &Query<(&Position, &TeamId, &Health, &Progression)>) -> (ArmyReadout, ArmyReadout) {
    let mut sums = [(0.0f32, 0.0f32); 2];
    let mut counts = [0u32; 2];
    let mut levels = [0u32; 2];
    for (pos, team, health, prog) in query.iter() {
        if !health.is_alive() {
            continue;
        }
        let side = team.0 as usize;
        if side > 1 {
            continue;
        }
        sums[side].0 += pos.x;
        sums[side].1 += pos.y;
        counts[side] += 1;
        levels[side] += prog.level;
    }
    let readout = |side: usize| ArmyReadout {
        center: (counts[side] > 0)
            .then(|| (sums[side].0 / counts[side] as f32, sums[side].1 / counts[side] as f32)),
        count: counts[side],
        total_level: levels[side],
    };
    (readout(PLAYER_TEAM as usize), readout(ENEMY_TEAM as usize))
}

/// Enemy power over player power.
fn power_ratio(players: &ArmyReadout, enemies: &ArmyReadout) -> f32 {
    if players.count == 0 {
        return RATIO_NO_PLAYERS;
    }
    if enemies.count == 0 {
        return 0.0;
    }
    enemies.power() / players.power()
}

pub fn select_strategy(power_ratio: f32) -> AiStrategy {
    if power_ratio >= 2.0 {
        AiStrategy::Overwhelming
    } else if power_ratio >= 1.3 {
        AiStrategy::Strong
    } else if power_ratio >= 0.7 {
        AiStrategy::Even
    } else if power_ratio >= 0.4 {
        AiStrategy::Weak
    } else {
        AiStrategy::Desperate
    }
}

fn overwhelming_target(player: (f32, f32), dist: f32, angle: f32, t: f32) -> (f32, f32) {
    // Orbit the player center, closing to surround
    let surround_angle = angle + (t * 0.05).sin() * PI;
    let surround_dist = (dist - 80.0).max(30.0);
    (
        player.0 + surround_angle.cos() * surround_dist,
        player.1 + surround_angle.sin() * surround_dist,
    )
}

fn strong_target(player: (f32, f32), dist: f32, angle: f32, t: f32) -> (f32, f32) {
    if dist > 150.0 {
        // Alternate flanks on the approach
        let flank_dir = if (t * 0.03).sin() > 0.0 { 1.0 } else { -1.0 };
        let flank_angle = angle + PI / 4.0 * flank_dir;
        (
            player.0 + flank_angle.cos() * 80.0,
            player.1 + flank_angle.sin() * 80.0,
        )
    } else {
        (player.0 + angle.cos() * 40.0, player.1 + angle.sin() * 40.0)
    }
}

fn even_target(
    player: (f32, f32),
    enemy: (f32, f32),
    dist: f32,
    angle: f32,
    t: f32,
) -> (f32, f32) {
    if dist > 200.0 {
        // Advance cautiously from our own center
        (enemy.0 + angle.cos() * 100.0, enemy.1 + angle.sin() * 100.0)
    } else if dist > 100.0 {
        let flank_dir = if (t * 0.04).sin() > 0.0 { 1.0 } else { -1.0 };
        let flank_angle = angle + PI / 3.0 * flank_dir;
        (
            player.0 + flank_angle.cos() * 70.0,
            player.1 + flank_angle.sin() * 70.0,
        )
    } else {
        // In close, circle the melee
        let circle_angle = angle + (t * 0.06).sin() * 0.5;
        (
            player.0 + circle_angle.cos() * 60.0,
            player.1 + circle_angle.sin() * 60.0,
        )
    }
}

fn weak_target(
    player: (f32, f32),
    enemy: (f32, f32),
    dist: f32,
    angle: f32,
    t: f32,
) -> (f32, f32) {
    if dist < 120.0 {
        // Break contact
        let retreat_angle = angle + PI;
        (
            enemy.0 + retreat_angle.cos() * 80.0,
            enemy.1 + retreat_angle.sin() * 80.0,
        )
    } else {
        // Kite at long range
        let kite_angle = angle + (t * 0.08).sin() * 1.2;
        (
            player.0 + kite_angle.cos() * 150.0,
            player.1 + kite_angle.sin() * 150.0,
        )
    }
}

fn desperate_target(enemy: (f32, f32), angle: f32, t: f32) -> (f32, f32) {
    let retreat_angle = angle + PI + (t * 0.1).sin() * 0.8;
    let tx = enemy.0 + retreat_angle.cos() * 300.0;
    let ty = enemy.1 + retreat_angle.sin() * 300.0;
    (tx.clamp(100.0, 900.0), ty.clamp(100.0, 900.0))
}
