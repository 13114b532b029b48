//! Morale system: units panic when badly outnumbered and rally otherwise.
//!
//! The flee/recover thresholds are offset to form a hysteresis band, so a
//! unit hovering around the break point does not flicker between states.

use bevy_ecs::prelude::*;

use crate::components::{Health, Morale, Position, TeamId};
use crate::spatial::SpatialGrid;

/// Local head-count radius in world units.
const MORALE_RADIUS: f32 = 100.0;
/// Morale lost per tick while overwhelmed.
const MORALE_DECREASE_RATE: f32 = 2.0;
/// Morale regained per tick otherwise.
const MORALE_INCREASE_RATE: f32 = 0.5;
/// Below this a unit breaks and flees.
const FLEE_THRESHOLD: f32 = 20.0;
/// A fleeing unit only rallies once morale climbs back past this.
const RECOVER_THRESHOLD: f32 = 40.0;

/// Updates morale from the local ally/enemy balance in the grid snapshot.
/// A unit is overwhelmed when nearby enemies outnumber allies two to one
/// and there are more than five of them. The unit counts itself among the
/// allies, so a lone unit still has one head on its side.
pub fn morale_system(
    grid: Res<SpatialGrid>,
    mut query: Query<(&Position, &TeamId, &mut Morale, &Health)>,
) {
    for (pos, team, mut morale, health) in query.iter_mut() {
        if !health.is_alive() {
            continue;
        }

        let mut nearby_allies = 0u32;
        let mut nearby_enemies = 0u32;
        for entry in grid.query_nearby(pos.x, pos.y, MORALE_RADIUS) {
            if entry.team == team.0 {
                nearby_allies += 1;
            } else {
                nearby_enemies += 1;
            }
        }

        if nearby_enemies > nearby_allies * 2 && nearby_enemies > 5 {
            morale.value -= MORALE_DECREASE_RATE;
            if morale.value < FLEE_THRESHOLD {
                morale.fleeing = true;
            }
        } else {
            morale.value = (morale.value + MORALE_INCREASE_RATE).min(100.0);
            if morale.value > RECOVER_THRESHOLD {
                morale.fleeing = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitBundle;

    fn run_morale(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(morale_system);
        schedule.run(world);
    }

    /// Spawn a unit and surround it in the grid with the given head counts.
    fn setup(allies: u32, enemies: u32) -> (World, Entity) {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());
        let entity = world.spawn(UnitBundle::soldier(500.0, 500.0, 0)).id();

        let mut grid = world.resource_mut::<SpatialGrid>();
        grid.insert(entity, 500.0, 500.0, 0);
        for i in 0..allies {
            grid.insert(Entity::from_raw(1000 + i), 505.0 + i as f32, 500.0, 0);
        }
        for i in 0..enemies {
            grid.insert(Entity::from_raw(2000 + i), 495.0 - i as f32, 500.0, 1);
        }
        (world, entity)
    }

    #[test]
    fn test_outnumbered_unit_loses_morale() {
        let (mut world, entity) = setup(1, 6);
        run_morale(&mut world);
        let morale = world.get::<Morale>(entity).unwrap();
        assert_eq!(morale.value, 98.0);
        assert!(!morale.fleeing);
    }

    #[test]
    fn test_few_enemies_do_not_scare() {
        // 2:1 ratio satisfied but only 5 enemies, below the absolute floor
        let (mut world, entity) = setup(1, 5);
        run_morale(&mut world);
        let morale = world.get::<Morale>(entity).unwrap();
        assert_eq!(morale.value, 100.0);
    }

    #[test]
    fn test_unit_counts_itself_as_ally() {
        // 6 enemies vs 2 allies plus self: 6 is not more than double 3
        let (mut world, entity) = setup(2, 6);
        run_morale(&mut world);
        let morale = world.get::<Morale>(entity).unwrap();
        assert_eq!(morale.value, 100.0);
        assert!(!morale.fleeing);
    }

    #[test]
    fn test_unit_breaks_below_flee_threshold() {
        let (mut world, entity) = setup(0, 8);
        world.get_mut::<Morale>(entity).unwrap().value = 21.0;

        run_morale(&mut world);
        let morale = world.get::<Morale>(entity).unwrap();
        assert_eq!(morale.value, 19.0);
        assert!(morale.fleeing);
    }

    #[test]
    fn test_hysteresis_band_keeps_unit_fleeing() {
        // Safe again, but morale inside the 20..40 band: still fleeing
        let (mut world, entity) = setup(5, 0);
        {
            let mut morale = world.get_mut::<Morale>(entity).unwrap();
            morale.value = 30.0;
            morale.fleeing = true;
        }

        run_morale(&mut world);
        let morale = world.get::<Morale>(entity).unwrap();
        assert_eq!(morale.value, 30.5);
        assert!(morale.fleeing, "still inside the hysteresis band");

        // Keep recovering until past the recover threshold
        for _ in 0..20 {
            run_morale(&mut world);
        }
        let morale = world.get::<Morale>(entity).unwrap();
        assert!(morale.value > 40.0);
        assert!(!morale.fleeing);
    }

    #[test]
    fn test_morale_caps_at_hundred() {
        let (mut world, entity) = setup(3, 0);
        run_morale(&mut world);
        assert_eq!(world.get::<Morale>(entity).unwrap().value, 100.0);
    }
}
