//! Game phase tracking and end-of-tick cleanup.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Health, TeamId};
use crate::config::PLAYER_TEAM;
use crate::systems::waves::WaveState;

/// The overall state of a run. `GameOver` is terminal; the host restarts
/// the world to play again.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Playing,
    WaveTransition,
    GameOver,
}

impl Default for GamePhase {
    fn default() -> Self {
        GamePhase::Playing
    }
}

/// Derives the phase from wave state and the lose condition. The run is
/// lost the moment no living player unit remains.
pub fn game_state_system(
    wave: Res<WaveState>,
    mut phase: ResMut<GamePhase>,
    query: Query<(&TeamId, &Health)>,
) {
    if *phase == GamePhase::GameOver {
        return;
    }

    let player_alive = query
        .iter()
        .any(|(team, health)| team.0 == PLAYER_TEAM && health.is_alive());
    if !player_alive {
        *phase = GamePhase::GameOver;
        return;
    }

    *phase = if wave.transitioning {
        GamePhase::WaveTransition
    } else {
        GamePhase::Playing
    };
}

/// Despawns units that died this tick. Runs last so earlier systems can
/// still observe the corpse (for events and kill attribution).
pub fn prune_dead_system(mut commands: Commands, query: Query<(Entity, &Health)>) {
    for (entity, health) in query.iter() {
        if !health.is_alive() {
            commands.entity(entity).despawn();
        }
    }
}
