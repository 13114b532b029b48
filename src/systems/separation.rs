//! Separation system: the liquid feel of the swarm.
//!
//! Overlapping units push each other apart with a hard positional nudge
//! plus a velocity impulse. Enemies shove harder than allies, and allies
//! additionally feel a weak medium-range repulsion that keeps formations
//! loose. Stopped units are left alone so settled crowds stay settled.
//!
//! ## Parallelization
//!
//! Each unit's correction depends only on its own state and the grid
//! snapshot, so the gather phase is embarrassingly parallel. With
//! `--features parallel` it runs across threads via rayon; results are
//! identical either way because corrections are applied afterwards.

use bevy_ecs::prelude::*;

use crate::components::{Health, Position, TeamId, UnitStats, Velocity};
use crate::config::UNIT_SPACING;
use crate::spatial::SpatialGrid;
use crate::systems::movement::VELOCITY_STOP_THRESHOLD;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const SEPARATION_FORCE: f32 = 0.25;
/// Pairs closer than this (squared) are considered coincident and skipped.
pub const MIN_SEPARATION_DISTANCE_SQ: f32 = 9.0;
const ENEMY_PUSH: f32 = 0.12;
const ENEMY_IMPULSE: f32 = 0.25;
const ALLY_PUSH: f32 = 0.06;
const ALLY_IMPULSE: f32 = 0.1;

/// One unit's state going into the gather phase.
#[derive(Clone, Copy)]
struct SeparationInput {
    entity: Entity,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    team: u8,
    size: f32,
}

/// Positional and velocity correction for one unit.
#[derive(Clone, Copy, Default)]
struct SeparationOutput {
    dx: f32,
    dy: f32,
    dvx: f32,
    dvy: f32,
}

/// Compute how one unit is pushed by its neighbors in the grid snapshot.
fn separate_one(unit: &SeparationInput, grid: &SpatialGrid) -> SeparationOutput {
    let mut out = SeparationOutput::default();
    let min_dist = unit.size * 2.0;
    let min_dist_sq = min_dist * min_dist;
    let speed = (unit.vx * unit.vx + unit.vy * unit.vy).sqrt();
    let is_stopped = speed < VELOCITY_STOP_THRESHOLD * 0.5;

    for other in grid.query_nearby(unit.x, unit.y, UNIT_SPACING * 4.0) {
        if other.entity == unit.entity {
            continue;
        }
        let dx = unit.x - other.x;
        let dy = unit.y - other.y;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq < MIN_SEPARATION_DISTANCE_SQ {
            continue;
        }

        let is_enemy = other.team != unit.team;
        if dist_sq < min_dist_sq && dist_sq > 1.0 {
            let distance = dist_sq.sqrt();
            let overlap = min_dist - distance;
            if overlap > 0.0 && !is_stopped {
                let inv_dist = 1.0 / distance;
                let (push, impulse) = if is_enemy {
                    (ENEMY_PUSH, ENEMY_IMPULSE)
                } else {
                    (ALLY_PUSH, ALLY_IMPULSE)
                };
                out.dx += dx * inv_dist * overlap * push;
                out.dy += dy * inv_dist * overlap * push;
                out.dvx += dx * inv_dist * impulse;
                out.dvy += dy * inv_dist * impulse;
            }
        } else if !is_enemy && !is_stopped {
            // Weak medium-range repulsion between allies only
            let medium_range = UNIT_SPACING * 2.0;
            let medium_range_sq = medium_range * medium_range;
            if dist_sq < medium_range_sq && dist_sq > min_dist_sq {
                let distance = dist_sq.sqrt();
                let falloff = (medium_range - distance) / medium_range;
                let force = falloff * SEPARATION_FORCE * 0.15;
                let inv_dist = 1.0 / distance;
                out.dvx += dx * inv_dist * force;
                out.dvy += dy * inv_dist * force;
            }
        }
    }
    out
}

/// Pushes overlapping units apart using the tick-start grid snapshot.
pub fn separation_system(
    grid: Res<SpatialGrid>,
    mut query: Query<(
        Entity,
        &mut Position,
        &mut Velocity,
        &TeamId,
        &UnitStats,
        &Health,
    )>,
) {
    // Gather phase: snapshot unit state, then compute corrections against
    // the grid only.
    let inputs: Vec<SeparationInput> = query
        .iter()
        .filter(|(_, _, _, _, _, health)| health.is_alive())
        .map(|(entity, pos, vel, team, stats, _)| SeparationInput {
            entity,
            x: pos.x,
            y: pos.y,
            vx: vel.vx,
            vy: vel.vy,
            team: team.0,
            size: stats.size,
        })
        .collect();

    #[cfg(feature = "parallel")]
    let outputs: Vec<(Entity, SeparationOutput)> = inputs
        .par_iter()
        .map(|unit| (unit.entity, separate_one(unit, &grid)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outputs: Vec<(Entity, SeparationOutput)> = inputs
        .iter()
        .map(|unit| (unit.entity, separate_one(unit, &grid)))
        .collect();

    // Apply phase: sequential writes.
    for (entity, out) in outputs {
        if let Ok((_, mut pos, mut vel, _, _, _)) = query.get_mut(entity) {
            pos.x += out.dx;
            pos.y += out.dy;
            vel.vx += out.dvx;
            vel.vy += out.dvy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitBundle;

    fn run_separation(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(separation_system);
        schedule.run(world);
    }

    fn spawn_moving(world: &mut World, x: f32, y: f32, team: u8) -> Entity {
        let entity = world.spawn(UnitBundle::soldier(x, y, team)).id();
        let mut vel = world.get_mut::<Velocity>(entity).unwrap();
        vel.vx = 1.0;
        entity
    }

    fn insert_into_grid(world: &mut World, entities: &[Entity]) {
        let mut entries = Vec::new();
        for &e in entities {
            let pos = *world.get::<Position>(e).unwrap();
            let team = world.get::<TeamId>(e).unwrap().0;
            entries.push((e, pos.x, pos.y, team));
        }
        let mut grid = world.resource_mut::<SpatialGrid>();
        grid.clear();
        for (e, x, y, team) in entries {
            grid.insert(e, x, y, team);
        }
    }

    #[test]
    fn test_overlapping_enemies_push_apart() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        // 10 apart: overlapping (min distance is 16), past the coincident cutoff
        let a = spawn_moving(&mut world, 500.0, 500.0, 0);
        let b = spawn_moving(&mut world, 510.0, 500.0, 1);
        insert_into_grid(&mut world, &[a, b]);

        run_separation(&mut world);

        let pa = world.get::<Position>(a).unwrap();
        let pb = world.get::<Position>(b).unwrap();
        assert!(pa.x < 500.0, "left unit pushed further left");
        assert!(pb.x > 510.0, "right unit pushed further right");
    }

    #[test]
    fn test_enemies_push_harder_than_allies() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        let ally = spawn_moving(&mut world, 500.0, 500.0, 0);
        let ally2 = spawn_moving(&mut world, 510.0, 500.0, 0);
        insert_into_grid(&mut world, &[ally, ally2]);
        run_separation(&mut world);
        let ally_shift = 500.0 - world.get::<Position>(ally).unwrap().x;

        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        let unit = spawn_moving(&mut world, 500.0, 500.0, 0);
        let enemy = spawn_moving(&mut world, 510.0, 500.0, 1);
        insert_into_grid(&mut world, &[unit, enemy]);
        run_separation(&mut world);
        let enemy_shift = 500.0 - world.get::<Position>(unit).unwrap().x;

        assert!(ally_shift > 0.0);
        assert!(enemy_shift > ally_shift);
    }

    #[test]
    fn test_stopped_units_are_not_pushed() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        // Zero velocity: both stopped
        let a = world.spawn(UnitBundle::soldier(500.0, 500.0, 0)).id();
        let b = world.spawn(UnitBundle::soldier(510.0, 500.0, 0)).id();
        insert_into_grid(&mut world, &[a, b]);

        run_separation(&mut world);

        assert_eq!(world.get::<Position>(a).unwrap().x, 500.0);
        assert_eq!(world.get::<Position>(b).unwrap().x, 510.0);
    }

    #[test]
    fn test_coincident_pairs_are_skipped() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        // 2 apart: inside the coincident cutoff (distSq 4 < 9)
        let a = spawn_moving(&mut world, 500.0, 500.0, 0);
        let b = spawn_moving(&mut world, 502.0, 500.0, 1);
        insert_into_grid(&mut world, &[a, b]);

        run_separation(&mut world);

        assert_eq!(world.get::<Position>(a).unwrap().x, 500.0);
        assert_eq!(world.get::<Position>(b).unwrap().x, 502.0);
    }

    #[test]
    fn test_allies_feel_medium_range_drift() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        // 20 apart: outside overlap (16) but inside medium range (32)
        let a = spawn_moving(&mut world, 500.0, 500.0, 0);
        let b = spawn_moving(&mut world, 520.0, 500.0, 0);
        insert_into_grid(&mut world, &[a, b]);

        run_separation(&mut world);

        // Velocity drifts apart, position untouched at this range
        let va = world.get::<Velocity>(a).unwrap();
        assert!(va.vx < 1.0);
        assert_eq!(world.get::<Position>(a).unwrap().x, 500.0);
    }

    #[test]
    fn test_no_force_beyond_medium_range() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        // 40 apart: outside the 32-unit medium range, both moving
        let a = spawn_moving(&mut world, 500.0, 500.0, 0);
        let b = spawn_moving(&mut world, 540.0, 500.0, 0);
        insert_into_grid(&mut world, &[a, b]);

        run_separation(&mut world);

        assert_eq!(world.get::<Position>(a).unwrap().x, 500.0);
        assert_eq!(world.get::<Position>(b).unwrap().x, 540.0);
        assert_eq!(world.get::<Velocity>(a).unwrap().vx, 1.0);
        assert_eq!(world.get::<Velocity>(b).unwrap().vx, 1.0);
    }
}
