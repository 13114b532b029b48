//! Liquid War Simulation Core
//!
//! A deterministic, fixed-timestep ECS simulation of swarm melee combat:
//! two armies of simple units that flow like a liquid, wave survival
//! progression, and a power-ratio enemy commander. Uses `bevy_ecs` for the
//! entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod obstacles;
pub mod rng;
pub mod spatial;
pub mod systems;
pub mod world;

pub use api::{SimConfig, SimWorld};
pub use components::*;
pub use config::{Difficulty, DifficultyConfig, DifficultySettings};
pub use obstacles::{Obstacle, ObstacleField, Rect};
pub use rng::SimRng;
pub use spatial::{GridEntry, SpatialGrid};
pub use systems::*;
pub use world::Snapshot;
