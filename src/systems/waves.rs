//! Wave system: timers, completion bonuses and enemy spawning.
//!
//! A wave ends when every enemy is dead or the wave timer expires
//! (surviving the timer pays a separate bonus). Completion starts a short
//! transition pause and drops a reward pickup; when the pause ends the
//! next, larger and stronger wave spawns in a ring at the enemy corner.

use bevy_ecs::prelude::*;

use crate::components::{formation_offset, Health, TeamId, UnitBundle, UnitStats};
use crate::config::{
    DifficultyConfig, DifficultySettings, ENEMY_TEAM, SPAWN_POSITIONS, SURVIVAL_BONUS,
    TIME_BONUS_MULTIPLIER, UNIT_DAMAGE, UNIT_HEALTH, UNIT_MAX_SPEED, WAVE_COMPLETION_BONUS,
    POINTS_PER_KILL,
};
use crate::obstacles::ObstacleField;
use crate::rng::SimRng;
use crate::systems::rewards::{spawn_pickup, Pickups};
use crate::systems::GameClock;

/// Wave progress, tracked against the game clock.
#[derive(Resource, Debug, Clone, Copy)]
pub struct WaveState {
    pub current_wave: u32,
    pub enemies_in_wave: u32,
    pub enemies_remaining: u32,
    pub wave_start_ms: f64,
    pub transitioning: bool,
    pub transition_start_ms: f64,
}

impl WaveState {
    pub fn new(config: &DifficultyConfig, now_ms: f64) -> Self {
        Self {
            current_wave: 1,
            enemies_in_wave: config.wave.base_enemy_count,
            enemies_remaining: config.wave.base_enemy_count,
            wave_start_ms: now_ms,
            transitioning: false,
            transition_start_ms: 0.0,
        }
    }
}

/// Running score. All bonuses are floored before being added.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ScoreState {
    pub total_score: u64,
    pub kills: u32,
    pub waves_completed: u32,
}

impl ScoreState {
    pub fn award_kill(&mut self, points_multiplier: f32) {
        self.kills += 1;
        self.total_score += (POINTS_PER_KILL * points_multiplier).floor() as u64;
    }

    pub fn award_survival(&mut self, points_multiplier: f32) {
        self.total_score += (SURVIVAL_BONUS * points_multiplier).floor() as u64;
    }

    /// Wave completion bonus plus a time bonus for finishing early.
    pub fn award_wave_completion(
        &mut self,
        elapsed_ms: f64,
        duration_ms: f64,
        points_multiplier: f32,
    ) {
        let time_ratio = (1.0 - elapsed_ms / duration_ms).max(0.0) as f32;
        let time_bonus = (WAVE_COMPLETION_BONUS * TIME_BONUS_MULTIPLIER * time_ratio).floor();
        let total = ((WAVE_COMPLETION_BONUS + time_bonus) * points_multiplier).floor();
        self.total_score += total as u64;
        self.waves_completed += 1;
    }
}

/// Combat stats for enemies of the given wave: difficulty multipliers
/// with compounding per-wave growth, speed capped at twice the base.
pub fn enemy_wave_stats(config: &DifficultyConfig, wave: u32) -> (f32, UnitStats) {
    let growth = config
        .wave
        .stat_multiplier_per_wave
        .powi(wave.saturating_sub(1) as i32);
    let health = (UNIT_HEALTH * config.enemy_health_multiplier * growth).floor();
    let damage = (UNIT_DAMAGE * config.enemy_damage_multiplier * growth).floor();
    let speed = (UNIT_MAX_SPEED * config.enemy_speed_multiplier * growth).min(UNIT_MAX_SPEED * 2.0);
    (
        health,
        UnitStats {
            max_speed: speed,
            base_damage: damage,
            damage,
            ..Default::default()
        },
    )
}

/// Spawn a wave's enemies in a widening ring at the enemy corner.
pub fn spawn_wave_enemies(
    commands: &mut Commands,
    rng: &mut SimRng,
    config: &DifficultyConfig,
    wave: u32,
    count: u32,
) {
    let (health, stats) = enemy_wave_stats(config, wave);
    let (sx, sy) = SPAWN_POSITIONS[ENEMY_TEAM as usize];
    for i in 0..count {
        let (dx, dy) = formation_offset(i, count);
        commands.spawn(UnitBundle::with_stats(
            sx + dx + rng.range(-20.0, 20.0),
            sy + dy + rng.range(-20.0, 20.0),
            ENEMY_TEAM,
            stats,
            health,
        ));
    }
}

/// Drives wave progress each tick.
pub fn wave_progress_system(
    clock: Res<GameClock>,
    settings: Res<DifficultySettings>,
    field: Res<ObstacleField>,
    mut wave: ResMut<WaveState>,
    mut score: ResMut<ScoreState>,
    mut pickups: ResMut<Pickups>,
    mut rng: ResMut<SimRng>,
    mut commands: Commands,
    query: Query<(&TeamId, &Health)>,
) {
    let now = clock.now_ms;
    let config = settings.0;

    let enemy_count = query
        .iter()
        .filter(|(team, health)| team.0 == ENEMY_TEAM && health.is_alive())
        .count() as u32;
    wave.enemies_remaining = enemy_count;

    if wave.transitioning {
        if now - wave.transition_start_ms >= config.wave.transition_duration_ms {
            wave.current_wave += 1;
            wave.enemies_in_wave = config.wave.base_enemy_count
                + (wave.current_wave - 1) * config.wave.enemy_count_increase;
            wave.enemies_remaining = wave.enemies_in_wave;
            spawn_wave_enemies(
                &mut commands,
                &mut rng,
                &config,
                wave.current_wave,
                wave.enemies_in_wave,
            );
            wave.wave_start_ms = now;
            wave.transitioning = false;
        }
        return;
    }

    if enemy_count == 0 {
        complete_wave(&mut wave, &mut score, &mut pickups, &field, &mut rng, &config, now);
        return;
    }

    let elapsed = now - wave.wave_start_ms;
    if elapsed >= config.wave.wave_duration_ms {
        score.award_survival(config.points_multiplier);
        complete_wave(&mut wave, &mut score, &mut pickups, &field, &mut rng, &config, now);
    }
}

fn complete_wave(
    wave: &mut WaveState,
    score: &mut ScoreState,
    pickups: &mut Pickups,
    field: &ObstacleField,
    rng: &mut SimRng,
    config: &DifficultyConfig,
    now: f64,
) {
    let elapsed = now - wave.wave_start_ms;
    score.award_wave_completion(
        elapsed,
        config.wave.wave_duration_ms,
        config.points_multiplier,
    );
    wave.transitioning = true;
    wave.transition_start_ms = now;
    spawn_pickup(pickups, field, rng, wave.current_wave);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;

    fn test_world(config: DifficultyConfig) -> World {
        let mut world = World::new();
        world.insert_resource(GameClock::default());
        world.insert_resource(DifficultySettings(config));
        world.insert_resource(ObstacleField::default());
        world.insert_resource(WaveState::new(&config, 0.0));
        world.insert_resource(ScoreState::default());
        world.insert_resource(Pickups::default());
        world.insert_resource(SimRng::from_seed(11));
        world
    }

    fn run_waves(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(wave_progress_system);
        schedule.run(world);
    }

    fn enemy_count(world: &mut World) -> usize {
        let mut query = world.query::<(&TeamId, &Health)>();
        query
            .iter(world)
            .filter(|(t, h)| t.0 == ENEMY_TEAM && h.is_alive())
            .count()
    }

    #[test]
    fn test_clearing_wave_starts_transition_and_drops_pickup() {
        let config = DifficultyConfig::for_difficulty(Difficulty::Medium);
        let mut world = test_world(config);
        // One living player unit, no enemies
        world.spawn((TeamId(0), Health::default()));

        run_waves(&mut world);

        let wave = world.resource::<WaveState>();
        assert!(wave.transitioning);
        assert_eq!(world.resource::<ScoreState>().waves_completed, 1);
        assert_eq!(world.resource::<Pickups>().0.len(), 1);
    }

    #[test]
    fn test_transition_end_spawns_next_wave() {
        let config = DifficultyConfig::for_difficulty(Difficulty::Medium);
        let mut world = test_world(config);
        {
            let mut wave = world.resource_mut::<WaveState>();
            wave.transitioning = true;
            wave.transition_start_ms = 0.0;
        }
        world.resource_mut::<GameClock>().now_ms = config.wave.transition_duration_ms + 1.0;

        run_waves(&mut world);

        let wave = *world.resource::<WaveState>();
        assert!(!wave.transitioning);
        assert_eq!(wave.current_wave, 2);
        // Medium: 20 base + 5 per extra wave
        assert_eq!(wave.enemies_in_wave, 25);
        assert_eq!(enemy_count(&mut world), 25);
    }

    #[test]
    fn test_timer_expiry_pays_survival_bonus() {
        let config = DifficultyConfig::for_difficulty(Difficulty::Medium);
        let mut world = test_world(config);
        world.spawn((TeamId(ENEMY_TEAM), Health::default()));
        world.resource_mut::<GameClock>().now_ms = config.wave.wave_duration_ms + 1.0;

        run_waves(&mut world);

        let wave = world.resource::<WaveState>();
        assert!(wave.transitioning);
        let score = world.resource::<ScoreState>();
        assert_eq!(score.waves_completed, 1);
        // Survival 50 * 1.5 = 75, completion (100 + 0 time bonus) * 1.5 = 150
        assert_eq!(score.total_score, 225);
    }

    #[test]
    fn test_fast_clear_earns_time_bonus() {
        let mut score = ScoreState::default();
        // Cleared instantly: full 200 time bonus, (100 + 200) * 1.5 = 450
        score.award_wave_completion(0.0, 75_000.0, 1.5);
        assert_eq!(score.total_score, 450);

        let mut slow = ScoreState::default();
        slow.award_wave_completion(75_000.0, 75_000.0, 1.5);
        assert_eq!(slow.total_score, 150);
    }

    #[test]
    fn test_enemy_wave_stats_scale_and_cap() {
        let config = DifficultyConfig::for_difficulty(Difficulty::Hard);
        let (h1, s1) = enemy_wave_stats(&config, 1);
        assert_eq!(h1, 120.0);
        assert_eq!(s1.damage, 26.0);

        let (h5, s5) = enemy_wave_stats(&config, 5);
        assert!(h5 > h1);
        assert!(s5.damage > s1.damage);

        // Growth is unbounded for health, capped for speed
        let (_, s20) = enemy_wave_stats(&config, 20);
        assert_eq!(s20.max_speed, UNIT_MAX_SPEED * 2.0);
    }

    #[test]
    fn test_kill_points_respect_multiplier() {
        let mut score = ScoreState::default();
        score.award_kill(2.0);
        assert_eq!(score.total_score, 20);
        assert_eq!(score.kills, 1);
    }
}
