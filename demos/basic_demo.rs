//! Basic demonstration of the wave-survival simulation.
//!
//! Run with: cargo run --example basic_demo

use lw_sim::{Difficulty, SimWorld};

fn main() {
    println!("=== Liquid War - Simulation Demo ===\n");

    let mut sim = SimWorld::new(Difficulty::Medium, 80, 12345);

    println!("Initial state:");
    print_snapshot(&mut sim);

    // Send the player army at the enemy spawn corner
    println!("\n--- Ordering the army across the map ---\n");
    sim.set_player_target(900.0, 100.0);

    // Run for 30 seconds of game time at 60 Hz
    println!("Running simulation for 1800 ticks (30 seconds at 60 ticks/sec)...\n");
    for tick in 0..1800 {
        sim.step(1.0 / 60.0);

        if (tick + 1) % 300 == 0 {
            println!(
                "--- Tick {} (t={:.1}s) ---",
                sim.current_tick(),
                sim.current_time_ms() / 1000.0
            );
            print_snapshot(&mut sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("snapshot failed: {err}"),
    }
}

fn print_snapshot(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();

    let players = snapshot.units.iter().filter(|u| u.team == 0).count();
    let enemies = snapshot.units.iter().filter(|u| u.team == 1).count();
    let fleeing = snapshot.units.iter().filter(|u| u.fleeing).count();

    println!(
        "  wave {} ({} enemies left{}), score {} ({} kills)",
        snapshot.wave.current_wave,
        snapshot.wave.enemies_remaining,
        if snapshot.wave.transitioning {
            ", transitioning"
        } else {
            ""
        },
        snapshot.score.total,
        snapshot.score.kills,
    );
    println!(
        "  {} player units vs {} enemies ({} fleeing), {} pickups on the field",
        players,
        enemies,
        fleeing,
        snapshot.pickups.len()
    );
    for buff in &snapshot.buffs {
        println!("    buff {:?}: {:.1}s left", buff.kind, buff.remaining_ms / 1000.0);
    }
    if !snapshot.events.deaths.is_empty() {
        println!("    {} deaths since last report", snapshot.events.deaths.len());
    }
}
