//! Melee combat: contact attacks, kills, experience.
//!
//! Attacks resolve sequentially in attacker order. Each attacker off
//! cooldown strikes the nearest living enemy it is touching; a unit killed
//! earlier in the pass is no longer a valid target for later attackers,
//! and no longer attacks itself. This keeps kill attribution exact, which
//! is why this system is not parallelized.
//!
//! Player-army buffs modify outgoing damage and crit chance; the divine
//! shield reduces incoming damage; an invincible champion takes none.

use bevy_ecs::prelude::*;

use crate::components::{
    Champion, CombatState, Health, Position, Progression, TeamId, UnitStats,
};
use crate::config::{DifficultySettings, PLAYER_TEAM, UNIT_ATTACK_COOLDOWN, XP_PER_KILL};
use crate::rng::SimRng;
use crate::spatial::SpatialGrid;
use crate::systems::rewards::ActiveBuffs;
use crate::systems::waves::ScoreState;
use crate::systems::GameClock;
use crate::world::{DeathEvent, HitEvent, LevelUpEvent, SimEvents};

pub const CRIT_CHANCE: f32 = 0.1;
pub const CRIT_MULTIPLIER: f32 = 2.0;
/// Ticks of hit flash applied to a struck unit.
const HIT_COOLDOWN: u32 = 10;

type CombatQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static Position,
        &'static TeamId,
        &'static mut UnitStats,
        &'static mut CombatState,
        &'static mut Health,
        &'static mut Progression,
        Option<&'static Champion>,
    ),
>;

/// Resolves all melee attacks for the tick.
pub fn melee_combat_system(
    grid: Res<SpatialGrid>,
    clock: Res<GameClock>,
    buffs: Res<ActiveBuffs>,
    settings: Res<DifficultySettings>,
    mut rng: ResMut<SimRng>,
    mut score: ResMut<ScoreState>,
    mut events: ResMut<SimEvents>,
    mut query: CombatQuery,
) {
    let attackers: Vec<Entity> = query.iter().map(|(entity, ..)| entity).collect();

    for attacker in attackers {
        // Re-read live state: the attacker may have died earlier this pass
        let Ok((_, pos, team, stats, combat, health, _, _)) = query.get(attacker) else {
            continue;
        };
        if !health.is_alive() || combat.attack_cooldown > 0 {
            continue;
        }
        let (ax, ay) = (pos.x, pos.y);
        let my_team = team.0;
        let attack_range = stats.attack_range;
        let contact_range = stats.size * 2.0;
        let damage = stats.damage;

        let Some(target) = find_nearest_enemy(&grid, &query, attacker, ax, ay, my_team, attack_range)
        else {
            continue;
        };
        if target.distance >= contact_range {
            continue;
        }

        // Player buffs apply on the attacking or defending side only
        let mut crit_chance = CRIT_CHANCE;
        let mut damage_multiplier = 1.0;
        let mut damage_reduction = 0.0;
        if my_team == PLAYER_TEAM {
            crit_chance += buffs.crit_chance_bonus();
            damage_multiplier = buffs.damage_multiplier();
        }
        if target.team == PLAYER_TEAM {
            damage_reduction = buffs.damage_reduction();
        }

        let crit = rng.unit() < crit_chance;
        let mut final_damage = if crit { damage * CRIT_MULTIPLIER } else { damage };
        final_damage *= damage_multiplier;
        final_damage *= 1.0 - damage_reduction;
        if target.champion && buffs.champion_invincible(clock.now_ms) {
            final_damage = 0.0;
        }

        // Strike the victim
        let killed = {
            let Ok((_, _, _, _, mut victim_combat, mut victim_health, _, _)) =
                query.get_mut(target.entity)
            else {
                continue;
            };
            let was_alive = victim_health.is_alive();
            victim_health.damage(final_damage);
            victim_combat.hit_cooldown = HIT_COOLDOWN;
            was_alive && !victim_health.is_alive()
        };
        if final_damage > 0.0 {
            events.hits.push(HitEvent {
                x: target.x,
                y: target.y,
                team: target.team,
                damage: final_damage,
                crit,
            });
        }

        // Attacker follow-up: cooldown, and progression on a kill
        let Ok((_, pos, team, mut stats, mut combat, mut health, mut prog, _)) =
            query.get_mut(attacker)
        else {
            continue;
        };
        combat.attack_cooldown = UNIT_ATTACK_COOLDOWN;
        if killed {
            prog.kills += 1;
            if prog.gain_xp(XP_PER_KILL, &mut stats, &mut health) {
                events.level_ups.push(LevelUpEvent {
                    x: pos.x,
                    y: pos.y,
                    level: prog.level,
                });
            }
            events.deaths.push(DeathEvent {
                x: target.x,
                y: target.y,
                team: target.team,
            });
            if team.0 == PLAYER_TEAM {
                score.award_kill(settings.0.points_multiplier);
            }
        }
    }
}

struct TargetInfo {
    entity: Entity,
    distance: f32,
    x: f32,
    y: f32,
    team: u8,
    champion: bool,
}

/// Nearest living enemy within attack range. The grid narrows candidates;
/// distance is re-checked against live positions.
fn find_nearest_enemy(
    grid: &SpatialGrid,
    query: &CombatQuery,
    attacker: Entity,
    x: f32,
    y: f32,
    my_team: u8,
    attack_range: f32,
) -> Option<TargetInfo> {
    let mut nearest: Option<TargetInfo> = None;
    for entry in grid.query_nearby(x, y, attack_range) {
        if entry.entity == attacker || entry.team == my_team {
            continue;
        }
        let Ok((_, pos, team, _, _, health, _, champion)) = query.get(entry.entity) else {
            continue;
        };
        if !health.is_alive() {
            continue;
        }
        let dx = x - pos.x;
        let dy = y - pos.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance < attack_range && nearest.as_ref().map_or(true, |t| distance < t.distance) {
            nearest = Some(TargetInfo {
                entity: entry.entity,
                distance,
                x: pos.x,
                y: pos.y,
                team: team.0,
                champion: champion.is_some(),
            });
        }
    }
    nearest
}
