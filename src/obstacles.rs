//! Static battlefield obstacles and procedural map generation.
//!
//! Obstacles come in two shapes: a single axis-aligned rectangle, or a
//! compound of rectangles (the central fortress). Units never pass through
//! them; the movement system pushes colliding units back out.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MAP_SIZE;
use crate::rng::SimRng;

/// Axis-aligned rectangle with its origin at the top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Closest point on this rectangle to the given position.
    pub fn closest_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(self.x, self.x + self.w),
            y.clamp(self.y, self.y + self.h),
        )
    }
}

/// A solid obstacle on the battlefield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Obstacle {
    /// Single wall or block.
    Rect(Rect),
    /// Multi-rectangle structure, collided against per part.
    Compound(Vec<Rect>),
}

impl Obstacle {
    /// Whether a unit of the given radius at (x, y) overlaps this obstacle.
    ///
    /// Rectangles use an expanded-bounds test against the unit center;
    /// compound shapes check true distance to each part.
    pub fn collides_with(&self, x: f32, y: f32, size: f32, buffer: f32) -> bool {
        match self {
            Obstacle::Rect(r) => {
                x + buffer > r.x
                    && x - buffer < r.x + r.w
                    && y + buffer > r.y
                    && y - buffer < r.y + r.h
            }
            Obstacle::Compound(rects) => rects.iter().any(|r| {
                let (cx, cy) = r.closest_point(x, y);
                let dx = x - cx;
                let dy = y - cy;
                (dx * dx + dy * dy).sqrt() < size + buffer
            }),
        }
    }

    /// Closest point on the obstacle surface to the given position.
    pub fn closest_point(&self, x: f32, y: f32) -> (f32, f32) {
        match self {
            Obstacle::Rect(r) => r.closest_point(x, y),
            Obstacle::Compound(rects) => {
                let mut best = (x, y);
                let mut best_dist_sq = f32::INFINITY;
                for r in rects {
                    let (cx, cy) = r.closest_point(x, y);
                    let dx = x - cx;
                    let dy = y - cy;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq < best_dist_sq {
                        best_dist_sq = dist_sq;
                        best = (cx, cy);
                    }
                }
                best
            }
        }
    }
}

/// All obstacles on the battlefield, generated once at world creation.
#[derive(Resource, Debug, Clone, Default)]
pub struct ObstacleField {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    /// Whether a unit of the given radius at (x, y) is inside any obstacle.
    pub fn collides(&self, x: f32, y: f32, size: f32, buffer: f32) -> bool {
        self.obstacles
            .iter()
            .any(|o| o.collides_with(x, y, size, buffer))
    }

    /// First obstacle the unit overlaps, if any.
    pub fn first_collision(&self, x: f32, y: f32, size: f32, buffer: f32) -> Option<&Obstacle> {
        self.obstacles
            .iter()
            .find(|o| o.collides_with(x, y, size, buffer))
    }

    /// Generate the wave-mode battlefield: a central fortress, maze walls,
    /// scattered cover, and corner structures. Spawn corners and the map
    /// center are kept clear.
    pub fn generate(rng: &mut SimRng) -> Self {
        let mut obstacles = Vec::new();
        obstacles.push(fortress(MAP_SIZE / 2.0, MAP_SIZE / 2.0, 120.0));
        generate_maze_walls(&mut obstacles, rng);
        generate_cover_points(&mut obstacles, rng);
        generate_corner_structures(&mut obstacles);
        Self { obstacles }
    }
}

/// The central fortress: keep, towers, base walls and a connecting wall.
fn fortress(x: f32, y: f32, size: f32) -> Obstacle {
    Obstacle::Compound(vec![
        // Main keep
        Rect::new(x - size * 0.3, y - size * 0.4, size * 0.6, size * 0.8),
        // Left and right towers
        Rect::new(x - size * 0.6, y - size * 0.3, size * 0.35, size * 0.6),
        Rect::new(x + size * 0.25, y - size * 0.3, size * 0.35, size * 0.6),
        // Base walls
        Rect::new(x - size * 0.6, y + size * 0.2, size * 0.35, size * 0.2),
        Rect::new(x + size * 0.25, y + size * 0.2, size * 0.35, size * 0.2),
        // Connecting wall
        Rect::new(x - size * 0.25, y + size * 0.25, size * 0.5, size * 0.15),
    ])
}

fn generate_maze_walls(obstacles: &mut Vec<Obstacle>, rng: &mut SimRng) {
    let thickness = 25.0;
    let length = 120.0;

    // Vertical walls in two bands, leaving the middle column open
    for i in 2..=6 {
        if i == 4 {
            continue;
        }
        let x = i as f32 / 8.0 * MAP_SIZE;
        obstacles.push(Obstacle::Rect(Rect::new(
            x - thickness / 2.0,
            MAP_SIZE * 0.15,
            thickness,
            length + rng.range(-20.0, 20.0),
        )));
        obstacles.push(Obstacle::Rect(Rect::new(
            x - thickness / 2.0,
            MAP_SIZE * 0.75,
            thickness,
            length + rng.range(-20.0, 20.0),
        )));
    }

    // Horizontal walls, skipping spawn corners
    for i in 2..=6 {
        if i == 4 {
            continue;
        }
        let y = i as f32 / 8.0 * MAP_SIZE;
        if !is_near_spawn_corner(MAP_SIZE * 0.15, y) {
            obstacles.push(Obstacle::Rect(Rect::new(
                MAP_SIZE * 0.15,
                y - thickness / 2.0,
                length + rng.range(-20.0, 20.0),
                thickness,
            )));
        }
        if !is_near_spawn_corner(MAP_SIZE * 0.75, y) {
            obstacles.push(Obstacle::Rect(Rect::new(
                MAP_SIZE * 0.75,
                y - thickness / 2.0,
                length + rng.range(-20.0, 20.0),
                thickness,
            )));
        }
    }

    generate_l_shapes(obstacles);
    generate_t_shapes(obstacles);
}

fn generate_l_shapes(obstacles: &mut Vec<Obstacle>) {
    let arm = 60.0;
    let thickness = 20.0;
    let positions = [
        (MAP_SIZE * 0.3, MAP_SIZE * 0.3),
        (MAP_SIZE * 0.7, MAP_SIZE * 0.3),
        (MAP_SIZE * 0.3, MAP_SIZE * 0.7),
        (MAP_SIZE * 0.7, MAP_SIZE * 0.7),
    ];
    for (x, y) in positions {
        if is_near_spawn_corner(x, y) || is_near_center(x, y) {
            continue;
        }
        obstacles.push(Obstacle::Rect(Rect::new(x, y, arm, thickness)));
        obstacles.push(Obstacle::Rect(Rect::new(x, y, thickness, arm)));
    }
}

fn generate_t_shapes(obstacles: &mut Vec<Obstacle>) {
    let arm = 70.0;
    let thickness = 18.0;
    let positions = [
        (MAP_SIZE * 0.5, MAP_SIZE * 0.2),
        (MAP_SIZE * 0.2, MAP_SIZE * 0.5),
        (MAP_SIZE * 0.8, MAP_SIZE * 0.5),
        (MAP_SIZE * 0.5, MAP_SIZE * 0.8),
    ];
    for (x, y) in positions {
        if is_near_spawn_corner(x, y) || is_near_center(x, y) {
            continue;
        }
        obstacles.push(Obstacle::Rect(Rect::new(
            x - arm / 2.0,
            y - thickness / 2.0,
            arm,
            thickness,
        )));
        obstacles.push(Obstacle::Rect(Rect::new(
            x - thickness / 2.0,
            y,
            thickness,
            arm / 2.0,
        )));
    }
}

fn generate_cover_points(obstacles: &mut Vec<Obstacle>, rng: &mut SimRng) {
    let cover = 30.0;
    let spacing = 140.0;

    let mut x = spacing;
    while x < MAP_SIZE {
        let mut y = spacing;
        while y < MAP_SIZE {
            if !is_near_spawn_corner(x, y) && !is_near_center(x, y) {
                if rng.unit() > 0.6 {
                    let ox = x + rng.range(-25.0, 25.0);
                    let oy = y + rng.range(-25.0, 25.0);
                    let shape = rng.unit();
                    let rect = if shape < 0.33 {
                        Rect::new(ox - cover / 2.0, oy - cover / 2.0, cover, cover)
                    } else if shape < 0.66 {
                        Rect::new(ox - cover, oy - cover / 3.0, cover * 2.0, cover / 1.5)
                    } else {
                        Rect::new(ox - cover / 3.0, oy - cover, cover / 1.5, cover * 2.0)
                    };
                    obstacles.push(Obstacle::Rect(rect));
                }
            }
            y += spacing;
        }
        x += spacing;
    }
}

fn generate_corner_structures(obstacles: &mut Vec<Obstacle>) {
    let length = 80.0;
    let thickness = 20.0;
    let offset = 200.0;

    // Two walls framing each corner approach
    let walls = [
        Rect::new(offset - length, offset - thickness / 2.0, length, thickness),
        Rect::new(offset - thickness / 2.0, offset - length, thickness, length),
        Rect::new(MAP_SIZE - offset, offset - thickness / 2.0, length, thickness),
        Rect::new(
            MAP_SIZE - offset - thickness / 2.0,
            offset - length,
            thickness,
            length,
        ),
        Rect::new(
            offset - length,
            MAP_SIZE - offset - thickness / 2.0,
            length,
            thickness,
        ),
        Rect::new(
            offset - thickness / 2.0,
            MAP_SIZE - offset,
            thickness,
            length,
        ),
        Rect::new(
            MAP_SIZE - offset,
            MAP_SIZE - offset - thickness / 2.0,
            length,
            thickness,
        ),
        Rect::new(
            MAP_SIZE - offset - thickness / 2.0,
            MAP_SIZE - offset,
            thickness,
            length,
        ),
    ];
    obstacles.extend(walls.into_iter().map(Obstacle::Rect));
}

fn is_near_spawn_corner(x: f32, y: f32) -> bool {
    let margin = 150.0;
    (x < margin && y < margin)
        || (x > MAP_SIZE - margin && y < margin)
        || (x < margin && y > MAP_SIZE - margin)
        || (x > MAP_SIZE - margin && y > MAP_SIZE - margin)
}

fn is_near_center(x: f32, y: f32) -> bool {
    let margin = 180.0;
    let dx = x - MAP_SIZE / 2.0;
    let dy = y - MAP_SIZE / 2.0;
    (dx * dx + dy * dy).sqrt() < margin
}
