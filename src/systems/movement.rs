//! Movement system: liquid-like attraction toward the team rally target.
//!
//! Each unit is pulled toward its team target every tick, with friction,
//! near-target damping and a jitter cutoff so crowds settle instead of
//! oscillating. Fleeing units steer away from their nearest enemy instead.
//! Obstacle collisions are resolved by pushing units back out along the
//! closest surface point.

use bevy_ecs::prelude::*;

use crate::components::{
    CombatState, Health, Heading, Morale, Position, TeamId, Teams, UnitStats, Velocity,
};
use crate::config::{MAP_SIZE, PLAYER_TEAM};
use crate::obstacles::ObstacleField;
use crate::spatial::SpatialGrid;
use crate::systems::rewards::ActiveBuffs;

pub const FRICTION: f32 = 0.9;
pub const TARGET_ATTRACTION: f32 = 0.45;
/// Enemy units chase slightly harder than the player's units.
pub const ENEMY_ATTRACTION_BONUS: f32 = 1.1;
pub const FLEE_FORCE_MULTIPLIER: f32 = 1.5;
pub const VELOCITY_STOP_THRESHOLD: f32 = 0.3;
pub const TARGET_STOP_DISTANCE: f32 = 15.0;
pub const NEAR_TARGET_DAMPING: f32 = 0.75;

/// Per-tick unit update: timers, steering, integration, collision.
pub fn unit_movement_system(
    grid: Res<SpatialGrid>,
    field: Res<ObstacleField>,
    teams: Res<Teams>,
    buffs: Res<ActiveBuffs>,
    mut query: Query<(
        Entity,
        &mut Position,
        &mut Velocity,
        &mut CombatState,
        &mut Heading,
        &TeamId,
        &UnitStats,
        &Health,
        &Morale,
    )>,
) {
    for (entity, mut pos, mut vel, mut combat, mut heading, team, stats, health, morale) in
        query.iter_mut()
    {
        if !health.is_alive() {
            continue;
        }

        combat.hit_cooldown = combat.hit_cooldown.saturating_sub(1);
        combat.attack_cooldown = combat.attack_cooldown.saturating_sub(1);

        // A unit that ends up inside an obstacle stops and works its way
        // back out before doing anything else.
        if field.collides(pos.x, pos.y, stats.size, stats.size + 1.0) {
            escape_from_obstacle(&field, &mut pos, stats.size);
            vel.vx = 0.0;
            vel.vy = 0.0;
            continue;
        }

        let Some(team_info) = teams.0.get(team.0 as usize) else {
            continue;
        };
        let mut target_x = team_info.target_x;
        let mut target_y = team_info.target_y;

        // Fleeing units run directly away from the nearest enemy.
        if morale.fleeing {
            if let Some((ex, ey)) = nearest_enemy_position(&grid, entity, &pos, team.0, stats) {
                target_x = pos.x + (pos.x - ex) * 2.0;
                target_y = pos.y + (pos.y - ey) * 2.0;
            }
        }

        let dx = target_x - pos.x;
        let dy = target_y - pos.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > 0.0 {
            let force = if team_info.is_player {
                TARGET_ATTRACTION
            } else {
                TARGET_ATTRACTION * ENEMY_ATTRACTION_BONUS
            };
            let force = if morale.fleeing {
                force * FLEE_FORCE_MULTIPLIER
            } else {
                force
            };
            vel.vx += dx / distance * force;
            vel.vy += dy / distance * force;
        }

        vel.vx *= FRICTION;
        vel.vy *= FRICTION;

        let speed = vel.magnitude();
        if speed < VELOCITY_STOP_THRESHOLD && distance < TARGET_STOP_DISTANCE {
            vel.vx *= 0.5;
            vel.vy *= 0.5;
            if speed < VELOCITY_STOP_THRESHOLD * 0.3 {
                vel.vx = 0.0;
                vel.vy = 0.0;
                continue;
            }
        }
        if distance < TARGET_STOP_DISTANCE * 2.0 {
            vel.vx *= NEAR_TARGET_DAMPING;
            vel.vy *= NEAR_TARGET_DAMPING;
        }

        let mut effective_max_speed = stats.max_speed;
        if team.0 == PLAYER_TEAM {
            effective_max_speed *= buffs.speed_multiplier();
        }
        if speed > effective_max_speed {
            vel.vx = vel.vx / speed * effective_max_speed;
            vel.vy = vel.vy / speed * effective_max_speed;
        }

        let old_x = pos.x;
        let old_y = pos.y;
        pos.x += vel.vx;
        pos.y += vel.vy;

        resolve_obstacle_collision(&field, &mut pos, &mut vel, old_x, old_y, stats.size);
        constrain_to_map(&mut pos, &mut vel, stats.size);

        if speed > 0.1 {
            heading.0 = vel.vy.atan2(vel.vx);
        }
    }
}

/// Nearest enemy within attack range, from grid data. Grid entries carry
/// tick-start positions; the exact distance is re-checked against them.
fn nearest_enemy_position(
    grid: &SpatialGrid,
    entity: Entity,
    pos: &Position,
    team: u8,
    stats: &UnitStats,
) -> Option<(f32, f32)> {
    let mut nearest = None;
    let mut nearest_dist = f32::INFINITY;
    for entry in grid.query_nearby(pos.x, pos.y, stats.attack_range) {
        if entry.entity == entity || entry.team == team {
            continue;
        }
        let dx = pos.x - entry.x;
        let dy = pos.y - entry.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance < stats.attack_range && distance < nearest_dist {
            nearest = Some((entry.x, entry.y));
            nearest_dist = distance;
        }
    }
    nearest
}

/// Probe outward in eight directions for the closest free point and
/// lerp toward it.
fn escape_from_obstacle(field: &ObstacleField, pos: &mut Position, size: f32) {
    let mut best_distance = f32::INFINITY;
    let mut best_x = pos.x;
    let mut best_y = pos.y;

    let mut angle = 0.0f32;
    while angle < std::f32::consts::TAU {
        let mut radius = size + 3.0;
        while radius < 50.0 {
            let test_x = pos.x + angle.cos() * radius;
            let test_y = pos.y + angle.sin() * radius;
            if test_x < size
                || test_x > MAP_SIZE - size
                || test_y < size
                || test_y > MAP_SIZE - size
            {
                radius += 3.0;
                continue;
            }
            if !field.collides(test_x, test_y, size, size + 1.0) {
                if radius < best_distance {
                    best_distance = radius;
                    best_x = test_x;
                    best_y = test_y;
                }
                break;
            }
            radius += 3.0;
        }
        if best_distance < 15.0 {
            break;
        }
        angle += std::f32::consts::FRAC_PI_4;
    }

    let move_speed = 0.3;
    pos.x += (best_x - pos.x) * move_speed;
    pos.y += (best_y - pos.y) * move_speed;
}

/// Push a unit back out of the first obstacle it overlaps, cancel the
/// inward velocity component and damp the rest. A degenerate overlap
/// (unit sitting on the surface point) reverts the move entirely.
fn resolve_obstacle_collision(
    field: &ObstacleField,
    pos: &mut Position,
    vel: &mut Velocity,
    old_x: f32,
    old_y: f32,
    size: f32,
) {
    let Some(obstacle) = field.first_collision(pos.x, pos.y, size, size + 1.0) else {
        return;
    };
    let (cx, cy) = obstacle.closest_point(pos.x, pos.y);
    let dx = pos.x - cx;
    let dy = pos.y - cy;
    let dist_sq = dx * dx + dy * dy;
    if dist_sq > 1.0 {
        let dist = dist_sq.sqrt();
        let inv_dist = 1.0 / dist;
        let push_distance = size + 2.0;
        let target_x = cx + dx * inv_dist * push_distance;
        let target_y = cy + dy * inv_dist * push_distance;
        pos.x = pos.x * 0.7 + target_x * 0.3;
        pos.y = pos.y * 0.7 + target_y * 0.3;

        let dot = (vel.vx * dx + vel.vy * dy) * inv_dist;
        if dot < 0.0 {
            vel.vx -= dx * inv_dist * dot * 1.1;
            vel.vy -= dy * inv_dist * dot * 1.1;
        }
        vel.vx *= 0.85;
        vel.vy *= 0.85;
    } else {
        pos.x = old_x;
        pos.y = old_y;
        vel.vx = 0.0;
        vel.vy = 0.0;
    }
}

/// Clamp to the map with a soft bounce off the border.
fn constrain_to_map(pos: &mut Position, vel: &mut Velocity, size: f32) {
    if pos.x < size {
        pos.x = size;
        vel.vx *= -0.5;
    }
    if pos.x > MAP_SIZE - size {
        pos.x = MAP_SIZE - size;
        vel.vx *= -0.5;
    }
    if pos.y < size {
        pos.y = size;
        vel.vy *= -0.5;
    }
    if pos.y > MAP_SIZE - size {
        pos.y = MAP_SIZE - size;
        vel.vy *= -0.5;
    }
}
