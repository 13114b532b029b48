//! Spatial partitioning for efficient neighbor queries.
//!
//! The battlefield is covered by a dense grid of cells, rebuilt from
//! scratch at the start of every tick. Queries return every entry in the
//! rectangle of cells overlapping the search radius, unsorted and without
//! an exact distance check. Callers that care about true distance must
//! re-check it themselves.

use bevy_ecs::prelude::*;

use crate::components::{Health, Position, TeamId};
use crate::config::{GRID_CELL_SIZE, MAP_SIZE};

/// Dense grid over the battlefield. Out-of-bounds coordinates are clamped
/// to the border cells, so every position maps to a valid cell.
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<GridEntry>>,
}

/// Entry in a spatial cell. Position and team are captured at insert time.
#[derive(Debug, Clone, Copy)]
pub struct GridEntry {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub team: u8,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(MAP_SIZE, MAP_SIZE, GRID_CELL_SIZE)
    }
}

impl SpatialGrid {
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil() as usize;
        let rows = (height / cell_size).ceil() as usize;
        Self {
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
        }
    }

    /// Cell index for a position, clamped to the grid bounds.
    #[inline]
    fn index_of(&self, x: f32, y: f32) -> usize {
        let col = ((x / self.cell_size).floor() as isize).clamp(0, self.cols as isize - 1);
        let row = ((y / self.cell_size).floor() as isize).clamp(0, self.rows as isize - 1);
        row as usize * self.cols + col as usize
    }

    /// Empty all cells. Called once per tick before reinsertion; there is
    /// no per-entity removal.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Insert an entity at a position.
    pub fn insert(&mut self, entity: Entity, x: f32, y: f32, team: u8) {
        let index = self.index_of(x, y);
        self.cells[index].push(GridEntry { entity, x, y, team });
    }

    /// All entries in cells overlapping the square of the given radius
    /// around a point. Unsorted; may include entries farther than `radius`.
    pub fn query_nearby(&self, x: f32, y: f32, radius: f32) -> Vec<GridEntry> {
        let min_col = (((x - radius) / self.cell_size).floor() as isize)
            .clamp(0, self.cols as isize - 1) as usize;
        let max_col = (((x + radius) / self.cell_size).floor() as isize)
            .clamp(0, self.cols as isize - 1) as usize;
        let min_row = (((y - radius) / self.cell_size).floor() as isize)
            .clamp(0, self.rows as isize - 1) as usize;
        let max_row = (((y + radius) / self.cell_size).floor() as isize)
            .clamp(0, self.rows as isize - 1) as usize;

        let mut nearby = Vec::new();
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                nearby.extend_from_slice(&self.cells[row * self.cols + col]);
            }
        }
        nearby
    }

    /// Total entries currently in the grid.
    pub fn total_count(&self) -> usize {
        self.cells.iter().map(|c| c.len()).sum()
    }
}

/// Rebuilds the spatial grid each tick. Dead units are skipped, so the
/// grid only ever holds units that were alive at the start of the tick.
pub fn spatial_grid_update_system(
    mut grid: ResMut<SpatialGrid>,
    query: Query<(Entity, &Position, &TeamId, &Health)>,
) {
    grid.clear();

    for (entity, pos, team, health) in query.iter() {
        if !health.is_alive() {
            continue;
        }
        grid.insert(entity, pos.x, pos.y, team.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialGrid::new(1000.0, 1000.0, 20.0);

        let e1 = Entity::from_raw(1);
        let e2 = Entity::from_raw(2);
        let e3 = Entity::from_raw(3);

        grid.insert(e1, 105.0, 105.0, 0);
        grid.insert(e2, 115.0, 105.0, 0);
        grid.insert(e3, 800.0, 800.0, 1);

        let nearby = grid.query_nearby(105.0, 105.0, 20.0);
        assert_eq!(nearby.len(), 2);
        assert!(nearby.iter().all(|e| e.entity != e3));

        let far = grid.query_nearby(800.0, 800.0, 10.0);
        assert_eq!(far.len(), 1);
        assert_eq!(far[0].entity, e3);
    }

    #[test]
    fn test_query_is_cell_granular() {
        // Entries in an overlapping cell are returned even when farther
        // than the radius. Callers re-check exact distance.
        let mut grid = SpatialGrid::new(1000.0, 1000.0, 20.0);
        grid.insert(Entity::from_raw(1), 119.0, 101.0, 0);

        let nearby = grid.query_nearby(101.0, 101.0, 5.0);
        assert_eq!(nearby.len(), 1);
    }

    #[test]
    fn test_query_only_scans_overlapping_cells() {
        // Fill every cell, then query a small radius: only the 4x4 cell
        // rectangle overlapping the search square comes back, never the
        // rest of the grid.
        let mut grid = SpatialGrid::new(1000.0, 1000.0, 20.0);
        let mut raw = 0u32;
        for row in 0..50 {
            for col in 0..50 {
                grid.insert(
                    Entity::from_raw(raw),
                    col as f32 * 20.0 + 10.0,
                    row as f32 * 20.0 + 10.0,
                    0,
                );
                raw += 1;
            }
        }
        assert_eq!(grid.total_count(), 2500);

        let nearby = grid.query_nearby(500.0, 500.0, 25.0);
        assert_eq!(nearby.len(), 16);
        for entry in &nearby {
            assert!((entry.x - 500.0).abs() <= 25.0 + 20.0);
            assert!((entry.y - 500.0).abs() <= 25.0 + 20.0);
        }
    }

    #[test]
    fn test_out_of_bounds_clamps_to_border_cells() {
        let mut grid = SpatialGrid::new(1000.0, 1000.0, 20.0);
        grid.insert(Entity::from_raw(1), -50.0, -50.0, 0);
        grid.insert(Entity::from_raw(2), 2000.0, 2000.0, 1);

        let near_origin = grid.query_nearby(0.0, 0.0, 10.0);
        assert_eq!(near_origin.len(), 1);

        let near_far_corner = grid.query_nearby(999.0, 999.0, 10.0);
        assert_eq!(near_far_corner.len(), 1);
        assert_eq!(grid.total_count(), 2);
    }

    #[test]
    fn test_clear_empties_grid() {
        let mut grid = SpatialGrid::default();
        grid.insert(Entity::from_raw(1), 500.0, 500.0, 0);
        assert_eq!(grid.total_count(), 1);
        grid.clear();
        assert_eq!(grid.total_count(), 0);
        assert!(grid.query_nearby(500.0, 500.0, 50.0).is_empty());
    }

    #[test]
    fn test_update_system_skips_dead_units() {
        let mut world = World::new();
        world.insert_resource(SpatialGrid::default());

        world.spawn((
            Position::new(100.0, 100.0),
            TeamId(0),
            Health::new(100.0),
        ));
        let mut dead = Health::new(100.0);
        dead.current = 0.0;
        world.spawn((Position::new(100.0, 100.0), TeamId(1), dead));

        let mut schedule = Schedule::default();
        schedule.add_systems(spatial_grid_update_system);
        schedule.run(&mut world);

        let grid = world.resource::<SpatialGrid>();
        assert_eq!(grid.total_count(), 1);
        assert_eq!(grid.query_nearby(100.0, 100.0, 10.0)[0].team, 0);
    }
}
