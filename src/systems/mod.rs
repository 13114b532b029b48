//! ECS systems for the wave-survival simulation.
//!
//! All systems run in a single chained schedule each tick, in this order:
//!
//! 1. `spatial_grid_update_system` - rebuilds the spatial grid
//! 2. `unit_movement_system` - timers, steering, integration, collision
//! 3. `separation_system` - liquid-like crowd separation
//! 4. `morale_system` - panic and recovery from local head counts
//! 5. `ai_targeting_system` - enemy rally target from power ratio
//! 6. `reward_update_system` - buff expiry and pickup collection
//! 7. `melee_combat_system` - contact attacks, kills, experience
//! 8. `wave_progress_system` - wave timers, completion, spawning
//! 9. `game_state_system` - phase transitions and the lose condition
//! 10. `prune_dead_system` - despawns units that died this tick

pub mod ai;
pub mod combat;
pub mod game_state;
pub mod morale;
pub mod movement;
pub mod rewards;
pub mod separation;
pub mod waves;

pub use ai::*;
pub use combat::*;
pub use game_state::*;
pub use morale::morale_system;
pub use movement::*;
pub use rewards::*;
pub use separation::*;
pub use waves::*;

use bevy_ecs::prelude::*;

/// Monotonic tick counter, incremented once per fixed update.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Simulation wall clock in milliseconds, advanced by the fixed timestep.
/// Wave timers, buff durations and notifications all read this clock.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct GameClock {
    pub now_ms: f64,
}

impl GameClock {
    pub fn advance(&mut self, dt_secs: f32) {
        self.now_ms += dt_secs as f64 * 1000.0;
    }
}
