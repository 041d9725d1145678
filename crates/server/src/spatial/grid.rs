//! Uniform grid index for radius queries.
//!
//! Cells are keyed by `(floor(x / cell), floor(y / cell))`. Circles live in the
//! cell holding their center, boxes in every cell they overlap. A radius query
//! expands `ceil(radius / cell)` cells around the query cell (plus enough to
//! reach the largest stored circle) and filters by exact distance.

use glam::Vec2;
use std::collections::HashMap;

/// Grid cell coordinate.
pub type CellKey = (i32, i32);

/// Stored geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { center: Vec2, radius: f32 },
    Rect { min: Vec2, max: Vec2 },
}

impl Shape {
    /// Distance from `point` to the shape's edge, zero when inside.
    #[inline]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        match *self {
            Shape::Circle { center, radius } => (center.distance(point) - radius).max(0.0),
            Shape::Rect { min, max } => point.clamp(min, max).distance(point),
        }
    }
}

/// An item stored in the grid.
#[derive(Debug, Clone)]
pub struct GridItem {
    pub id: u32,
    pub shape: Shape,
    cells: Vec<CellKey>,
}

/// Grid index with flat item storage and O(1) removal.
pub struct GridIndex {
    cell_size: f32,
    items: Vec<GridItem>,
    id_to_index: HashMap<u32, usize>,
    cells: HashMap<CellKey, Vec<u32>>,
    /// Largest circle radius inserted, widens query expansion.
    max_radius: f32,
}

impl GridIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            items: Vec::with_capacity(128),
            id_to_index: HashMap::with_capacity(128),
            cells: HashMap::new(),
            max_radius: 0.0,
        }
    }

    /// Cell holding a point.
    #[inline]
    pub fn cell_of(&self, point: Vec2) -> CellKey {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    /// Insert or replace a circle.
    pub fn insert_circle(&mut self, id: u32, center: Vec2, radius: f32) {
        self.max_radius = self.max_radius.max(radius);
        let cells = vec![self.cell_of(center)];
        self.insert(GridItem { id, shape: Shape::Circle { center, radius }, cells });
    }

    /// Insert or replace a box, registering it in every overlapped cell.
    pub fn insert_rect(&mut self, id: u32, min: Vec2, max: Vec2) {
        let (lo, hi) = (self.cell_of(min), self.cell_of(max));
        let mut cells = Vec::new();
        for gy in lo.1..=hi.1 {
            for gx in lo.0..=hi.0 {
                cells.push((gx, gy));
            }
        }
        self.insert(GridItem { id, shape: Shape::Rect { min, max }, cells });
    }

    fn insert(&mut self, item: GridItem) {
        self.remove(item.id);
        for key in &item.cells {
            self.cells.entry(*key).or_default().push(item.id);
        }
        self.id_to_index.insert(item.id, self.items.len());
        self.items.push(item);
    }

    /// Remove an item. Returns false when the id was not present.
    pub fn remove(&mut self, id: u32) -> bool {
        let Some(idx) = self.id_to_index.remove(&id) else {
            return false;
        };
        let item = self.items.swap_remove(idx);
        if idx < self.items.len() {
            let swapped_id = self.items[idx].id;
            self.id_to_index.insert(swapped_id, idx);
        }
        for key in &item.cells {
            if let Some(bucket) = self.cells.get_mut(key) {
                bucket.retain(|&other| other != id);
                if bucket.is_empty() {
                    self.cells.remove(key);
                }
            }
        }
        true
    }

    /// Ids registered in one cell.
    pub fn in_cell(&self, key: CellKey) -> &[u32] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All items whose shape comes within `radius` of `center`.
    pub fn find_in_radius(&self, center: Vec2, radius: f32) -> Vec<u32> {
        let (cx, cy) = self.cell_of(center);
        let reach = ((radius + self.max_radius) / self.cell_size).ceil() as i32;
        let mut result = Vec::new();
        for gy in (cy - reach)..=(cy + reach) {
            for gx in (cx - reach)..=(cx + reach) {
                for &id in self.in_cell((gx, gy)) {
                    if let Some(item) = self.get(id) {
                        if item.shape.distance_to(center) <= radius {
                            result.push(id);
                        }
                    }
                }
            }
        }
        result.sort_unstable();
        result.dedup();
        result
    }

    pub fn get(&self, id: u32) -> Option<&GridItem> {
        self.id_to_index.get(&id).map(|&idx| &self.items[idx])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.id_to_index.clear();
        self.cells.clear();
        self.max_radius = 0.0;
    }
}

impl std::fmt::Debug for GridIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridIndex")
            .field("items", &self.items.len())
            .field("cells", &self.cells.len())
            .field("cell_size", &self.cell_size)
            .finish()
    }
}

/// Per-client memo of the candidates registered in the client's last cell.
///
/// Recomputed only when the cell changes or the entry is marked dirty, so a
/// freshly inserted object may be missed until then.
#[derive(Debug, Clone, Default)]
pub struct NearbyCache {
    cell: Option<CellKey>,
    dirty: bool,
    ids: Vec<u32>,
}

impl NearbyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates for `point`, refreshed from `grid` only when needed.
    pub fn candidates(&mut self, grid: &GridIndex, point: Vec2) -> &[u32] {
        let key = grid.cell_of(point);
        if self.dirty || self.cell != Some(key) {
            self.ids.clear();
            self.ids.extend_from_slice(grid.in_cell(key));
            self.cell = Some(key);
            self.dirty = false;
        }
        &self.ids
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_keys_floor_negative() {
        let grid = GridIndex::new(5.0);
        assert_eq!(grid.cell_of(Vec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(grid.cell_of(Vec2::new(4.99, 5.0)), (0, 1));
        assert_eq!(grid.cell_of(Vec2::new(-0.1, -5.1)), (-1, -2));
    }

    #[test]
    fn test_grid_insert_find() {
        let mut grid = GridIndex::new(5.0);
        grid.insert_circle(1, Vec2::new(0.0, 0.0), 0.5);
        grid.insert_circle(2, Vec2::new(20.0, 20.0), 0.5);
        grid.insert_circle(3, Vec2::new(-20.0, -20.0), 0.5);

        assert_eq!(grid.len(), 3);

        let found = grid.find_in_radius(Vec2::new(1.0, 0.0), 1.0);
        assert_eq!(found, vec![1]);

        let found = grid.find_in_radius(Vec2::new(20.0, 23.0), 2.0);
        assert!(found.is_empty());
        let found = grid.find_in_radius(Vec2::new(20.0, 22.0), 2.0);
        assert_eq!(found, vec![2]);
    }

    #[test]
    fn test_query_crosses_cells() {
        let mut grid = GridIndex::new(5.0);
        grid.insert_circle(1, Vec2::new(9.9, 0.0), 0.0);
        // query center is one cell over, radius reaches across the boundary
        assert_eq!(grid.find_in_radius(Vec2::new(10.5, 0.0), 1.0), vec![1]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut grid = GridIndex::new(5.0);
        grid.insert_circle(1, Vec2::ZERO, 0.5);
        grid.insert_circle(2, Vec2::ONE, 0.5);
        assert!(grid.remove(1));
        assert!(!grid.remove(1));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.find_in_radius(Vec2::ZERO, 3.0), vec![2]);
    }

    #[test]
    fn test_rect_spans_cells() {
        let mut grid = GridIndex::new(5.0);
        grid.insert_rect(9, Vec2::new(-6.0, -1.0), Vec2::new(6.0, 1.0));
        assert_eq!(grid.in_cell((-2, -1)), &[9]);
        assert_eq!(grid.in_cell((1, 0)), &[9]);
        assert_eq!(grid.find_in_radius(Vec2::new(0.0, 3.0), 2.5), vec![9]);
        assert!(grid.find_in_radius(Vec2::new(0.0, 3.0), 1.5).is_empty());
    }

    #[test]
    fn test_nearby_cache_refresh() {
        let mut grid = GridIndex::new(5.0);
        grid.insert_rect(1, Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0));
        let mut cache = NearbyCache::new();
        assert_eq!(cache.candidates(&grid, Vec2::new(1.0, 1.0)), &[1]);

        // same cell, new object: stale until marked dirty
        grid.insert_rect(2, Vec2::new(2.0, 2.0), Vec2::new(3.0, 3.0));
        assert_eq!(cache.candidates(&grid, Vec2::new(2.0, 1.0)), &[1]);
        cache.mark_dirty();
        assert_eq!(cache.candidates(&grid, Vec2::new(2.0, 1.0)), &[1, 2]);

        // moving to another cell refreshes
        assert!(cache.candidates(&grid, Vec2::new(7.0, 1.0)).is_empty());
    }
}
