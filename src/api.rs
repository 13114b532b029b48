//! Public API for the simulation.
//!
//! This module provides the main interface for a rendering host (web,
//! desktop, headless) to drive the simulation.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 60 Hz). When
//! `step(dt)` is called, the simulation accumulates time and runs fixed
//! updates as needed. Combined with the seeded RNG this makes runs fully
//! deterministic regardless of frame rate.

use bevy_ecs::prelude::*;

use crate::components::{formation_offset, Teams, UnitBundle};
use crate::config::{Difficulty, DifficultySettings, PLAYER_TEAM, SPAWN_POSITIONS};
use crate::obstacles::ObstacleField;
use crate::rng::SimRng;
use crate::spatial::{spatial_grid_update_system, SpatialGrid};
use crate::systems::ai::{ai_targeting_system, EnemyAi};
use crate::systems::combat::melee_combat_system;
use crate::systems::game_state::{game_state_system, prune_dead_system, GamePhase};
use crate::systems::morale::morale_system;
use crate::systems::movement::unit_movement_system;
use crate::systems::rewards::{reward_update_system, ActiveBuffs, Pickups};
use crate::systems::separation::separation_system;
use crate::systems::waves::{enemy_wave_stats, wave_progress_system, ScoreState, WaveState};
use crate::systems::{GameClock, SimTick};
use crate::world::{SimEvents, Snapshot};

/// Simulation tuning knobs that are not gameplay difficulty.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SimConfig {
    /// Fixed timestep in seconds.
    pub fixed_timestep: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
        }
    }
}

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing a run (difficulty, starting army size, RNG seed)
/// - Stepping the simulation forward
/// - Steering the player army
/// - Extracting state snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    config: SimConfig,
    tick: u64,
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a new run with the default 60 Hz timestep.
    pub fn new(difficulty: Difficulty, army_size: u32, seed: u64) -> Self {
        Self::with_config(SimConfig::default(), difficulty, army_size, seed)
    }

    /// Create a new run with a custom timestep.
    pub fn with_config(
        config: SimConfig,
        difficulty: Difficulty,
        army_size: u32,
        seed: u64,
    ) -> Self {
        let mut world = World::new();
        let settings = DifficultySettings::new(difficulty);
        let mut rng = SimRng::from_seed(seed);

        world.insert_resource(ObstacleField::generate(&mut rng));
        world.insert_resource(SpatialGrid::default());
        world.insert_resource(SimTick(0));
        world.insert_resource(GameClock::default());
        world.insert_resource(Teams::wave_mode());
        world.insert_resource(EnemyAi::default());
        world.insert_resource(ActiveBuffs::default());
        world.insert_resource(Pickups::default());
        world.insert_resource(WaveState::new(&settings.0, 0.0));
        world.insert_resource(ScoreState::default());
        world.insert_resource(GamePhase::default());
        world.insert_resource(SimEvents::default());

        // Starting armies: player ring at the player corner, wave 1 at the
        // enemy corner
        let (px, py) = SPAWN_POSITIONS[PLAYER_TEAM as usize];
        for i in 0..army_size {
            let (dx, dy) = formation_offset(i, army_size);
            world.spawn(UnitBundle::soldier(
                px + dx + rng.range(-20.0, 20.0),
                py + dy + rng.range(-20.0, 20.0),
                PLAYER_TEAM,
            ));
        }
        let enemy_count = settings.0.wave.base_enemy_count;
        let (health, stats) = enemy_wave_stats(&settings.0, 1);
        let (ex, ey) = SPAWN_POSITIONS[1];
        for i in 0..enemy_count {
            let (dx, dy) = formation_offset(i, enemy_count);
            world.spawn(UnitBundle::with_stats(
                ex + dx + rng.range(-20.0, 20.0),
                ey + dy + rng.range(-20.0, 20.0),
                1,
                stats,
                health,
            ));
        }

        world.insert_resource(settings);
        world.insert_resource(rng);

        // One tick, in dependency order. Movement and separation need the
        // fresh grid; combat runs after targeting so buffed damage lands the
        // same tick a pickup is collected; pruning runs last so combat can
        // attribute kills against corpses.
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                spatial_grid_update_system,
                unit_movement_system,
                separation_system,
                morale_system,
                ai_targeting_system,
                reward_update_system,
                melee_combat_system,
                wave_progress_system,
                game_state_system,
                prune_dead_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            config,
            tick: 0,
            time_accumulator: 0.0,
        }
    }

    /// Tear down the run and start a fresh one, keeping the timestep.
    pub fn restart(&mut self, difficulty: Difficulty, army_size: u32, seed: u64) {
        *self = Self::with_config(self.config, difficulty, army_size, seed);
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Uses fixed timestep internally. Time is accumulated and fixed updates
    /// run as needed, so held-back frames never change the outcome.
    pub fn step(&mut self, dt: f32) {
        let fixed_dt = self.config.fixed_timestep;
        self.time_accumulator += dt;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
        }
    }

    /// Run a single fixed timestep update. Frozen once the run is over.
    fn fixed_update(&mut self, dt: f32) {
        if *self.world.resource::<GamePhase>() == GamePhase::GameOver {
            return;
        }
        self.world.resource_mut::<GameClock>().advance(dt);
        self.world.resource_mut::<SimTick>().increment();
        self.schedule.run(&mut self.world);
        self.tick += 1;
    }

    /// Steer the player army. All player units seek this point.
    pub fn set_player_target(&mut self, x: f32, y: f32) {
        let mut teams = self.world.resource_mut::<Teams>();
        let team = &mut teams.0[PLAYER_TEAM as usize];
        team.target_x = x;
        team.target_y = y;
    }

    /// Get a snapshot of the current simulation state.
    ///
    /// Draining, for the event lists: hits, deaths, level ups and reward
    /// collections that happened since the previous snapshot ride on this
    /// one, then reset.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Elapsed simulation time in milliseconds.
    pub fn current_time_ms(&self) -> f64 {
        self.world.resource::<GameClock>().now_ms
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Health, TeamId};

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_new_world_spawns_both_armies() {
        let mut sim = SimWorld::new(Difficulty::Medium, 50, 7);
        let snapshot = sim.snapshot();
        // 50 player units plus the 20-enemy first wave on Medium
        assert_eq!(snapshot.units.len(), 70);
        assert_eq!(snapshot.units.iter().filter(|u| u.team == 0).count(), 50);
        assert_eq!(snapshot.wave.current_wave, 1);
        assert_eq!(snapshot.score.total, 0);
    }

    #[test]
    fn test_step_advances_fixed_ticks() {
        let mut sim = SimWorld::new(Difficulty::Medium, 10, 7);
        sim.step(DT);
        assert_eq!(sim.current_tick(), 1);
        // A large frame runs multiple fixed updates
        sim.step(DT * 4.5);
        assert_eq!(sim.current_tick(), 5);
        assert!((sim.current_time_ms() - 5.0 * DT as f64 * 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_player_army_moves_toward_target() {
        let mut sim = SimWorld::new(Difficulty::Medium, 30, 7);
        sim.set_player_target(600.0, 500.0);

        let center_x = |sim: &mut SimWorld| {
            let snapshot = sim.snapshot();
            let players: Vec<_> = snapshot.units.iter().filter(|u| u.team == 0).collect();
            players.iter().map(|u| u.x).sum::<f32>() / players.len() as f32
        };
        let before = center_x(&mut sim);
        for _ in 0..120 {
            sim.step(DT);
        }
        let after = center_x(&mut sim);
        assert!(after > before + 10.0, "army did not advance: {before} -> {after}");
    }

    #[test]
    fn test_adjacent_enemies_fight() {
        let mut sim = SimWorld::new(Difficulty::Medium, 10, 7);
        // Drop a skirmish pair mid-map, inside contact range
        sim.world_mut().spawn(UnitBundle::soldier(500.0, 500.0, 0));
        sim.world_mut().spawn(UnitBundle::soldier(510.0, 500.0, 1));

        sim.step(DT);

        let snapshot = sim.snapshot();
        assert!(!snapshot.events.hits.is_empty());
        // Events drain with the snapshot
        let snapshot = sim.snapshot();
        assert!(snapshot.events.hits.is_empty());
    }

    #[test]
    fn test_clearing_a_wave_starts_transition_and_scores() {
        let mut sim = SimWorld::new(Difficulty::Medium, 40, 7);
        let enemies: Vec<Entity> = {
            let world = sim.world_mut();
            let mut query = world.query::<(Entity, &TeamId)>();
            query
                .iter(world)
                .filter(|(_, team)| team.0 == 1)
                .map(|(e, _)| e)
                .collect()
        };
        for entity in enemies {
            let mut health = sim.world_mut().get_mut::<Health>(entity).unwrap();
            let max = health.max;
            health.damage(max);
        }

        sim.step(DT * 2.0);

        let snapshot = sim.snapshot();
        assert!(snapshot.wave.transitioning);
        assert_eq!(snapshot.phase, Some(GamePhase::WaveTransition));
        assert_eq!(snapshot.score.waves_completed, 1);
        // Full completion bonus: (100 + 200 time bonus) * 1.5 on Medium
        assert!(snapshot.score.total >= 450);
        // Transition expires and wave 2 spawns on Medium after 2 seconds
        for _ in 0..150 {
            sim.step(DT);
        }
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.wave.current_wave, 2);
        assert!(!snapshot.wave.transitioning);
        assert!(snapshot.units.iter().any(|u| u.team == 1));
    }

    #[test]
    fn test_losing_the_army_ends_the_run() {
        let mut sim = SimWorld::new(Difficulty::Medium, 5, 7);
        let players: Vec<Entity> = {
            let world = sim.world_mut();
            let mut query = world.query::<(Entity, &TeamId)>();
            query
                .iter(world)
                .filter(|(_, team)| team.0 == 0)
                .map(|(e, _)| e)
                .collect()
        };
        for entity in players {
            sim.world_mut().despawn(entity);
        }

        sim.step(DT);
        assert_eq!(sim.snapshot().phase, Some(GamePhase::GameOver));

        // Frozen: further steps do not advance the clock
        let tick = sim.current_tick();
        sim.step(DT * 10.0);
        assert_eq!(sim.current_tick(), tick);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = SimWorld::new(Difficulty::Hard, 60, 42);
        let mut b = SimWorld::new(Difficulty::Hard, 60, 42);
        a.set_player_target(700.0, 300.0);
        b.set_player_target(700.0, 300.0);
        for _ in 0..300 {
            a.step(DT);
            b.step(DT);
        }
        assert_eq!(a.snapshot_json(), b.snapshot_json());
    }

    #[test]
    fn test_different_seed_different_map() {
        let sim_a = SimWorld::new(Difficulty::Medium, 10, 1);
        let sim_b = SimWorld::new(Difficulty::Medium, 10, 2);
        let field_a = sim_a.world().resource::<ObstacleField>();
        let field_b = sim_b.world().resource::<ObstacleField>();
        assert_ne!(field_a.obstacles.len(), 0);
        // Same fortress count but different maze layout is possible; compare
        // full obstacle lists
        assert_ne!(
            format!("{:?}", field_a.obstacles),
            format!("{:?}", field_b.obstacles)
        );
    }

    #[test]
    fn test_restart_resets_the_run() {
        let mut sim = SimWorld::new(Difficulty::Medium, 20, 7);
        for _ in 0..60 {
            sim.step(DT);
        }
        assert!(sim.current_tick() > 0);

        sim.restart(Difficulty::Easy, 10, 9);
        assert_eq!(sim.current_tick(), 0);
        let snapshot = sim.snapshot();
        // 10 player units plus Easy's 15-enemy first wave
        assert_eq!(snapshot.units.len(), 25);
        assert_eq!(snapshot.score.total, 0);
    }

    #[test]
    fn test_stress_large_armies() {
        use std::time::Instant;

        let mut sim = SimWorld::new(Difficulty::Hard, 300, 7);
        sim.set_player_target(900.0, 100.0);

        // 10 seconds of game time at 60 Hz
        let start = Instant::now();
        for _ in 0..600 {
            sim.step(DT);
        }
        let elapsed = start.elapsed();
        let ticks = sim.current_tick();
        println!(
            "{} ticks in {:?} ({:.2} ms/tick)",
            ticks,
            elapsed,
            elapsed.as_millis() as f64 / ticks.max(1) as f64
        );
        assert!(elapsed.as_secs() < 30, "simulation too slow: {elapsed:?}");

        let snapshot = sim.snapshot();
        assert!(snapshot.units.iter().all(|u| {
            u.x >= 0.0 && u.x <= 1000.0 && u.y >= 0.0 && u.y <= 1000.0
        }));
        let _ = snapshot.units.iter().map(|u| u.health).sum::<f32>();
    }

    #[test]
    fn test_positions_stay_on_the_map() {
        let mut sim = SimWorld::new(Difficulty::Medium, 50, 3);
        sim.set_player_target(990.0, 990.0);
        for _ in 0..300 {
            sim.step(DT);
        }
        let snapshot = sim.snapshot();
        for unit in &snapshot.units {
            assert!(unit.x >= 0.0 && unit.x <= 1000.0);
            assert!(unit.y >= 0.0 && unit.y <= 1000.0);
            assert!(unit.health > 0.0);
        }
    }
}
