//! Spatial hash broadphase
//!
//! A uniform grid keyed by integer cell coordinates. Each cell lists the
//! colliders whose registered bounds touch it. The hash only stores handles;
//! anything that needs a collider's bounds, layer or shape is supplied by the
//! caller through a closure, so the hash never borrows the collider arena.

use ahash::{AHashMap, AHashSet};
use brisk_core::math::IVec2;
use brisk_core::{RectangleF, Vec2};

use crate::collider::ColliderId;
use crate::results::RaycastHit;

/// How a linecast walk collects hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinecastMode {
    /// Stop as soon as no later cell can produce a closer hit
    Closest,
    /// Walk the whole segment and keep every hit
    All,
}

#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    inverse_cell_size: f32,
    cells: AHashMap<IVec2, Vec<ColliderId>>,
    /// Scratch set reused by queries to visit each collider once
    checked: AHashSet<ColliderId>,
    /// Scratch hits reused by linecasts
    found: Vec<(RaycastHit, i32, ColliderId)>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 100.0 };
        Self {
            cell_size,
            inverse_cell_size: 1.0 / cell_size,
            cells: AHashMap::new(),
            checked: AHashSet::new(),
            found: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing a world-space point
    pub fn cell_coords(&self, x: f32, y: f32) -> IVec2 {
        IVec2::new(
            (x * self.inverse_cell_size).floor() as i32,
            (y * self.inverse_cell_size).floor() as i32,
        )
    }

    /// Inclusive range of cells covered by `bounds`
    fn cell_range(&self, bounds: &RectangleF) -> (IVec2, IVec2) {
        (
            self.cell_coords(bounds.x, bounds.y),
            self.cell_coords(bounds.right(), bounds.bottom()),
        )
    }

    pub fn cell_at(&self, coords: IVec2) -> Option<&[ColliderId]> {
        self.cells.get(&coords).map(Vec::as_slice)
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterate every non-empty cell and its colliders
    pub fn cells(&self) -> impl Iterator<Item = (IVec2, &[ColliderId])> {
        self.cells.iter().map(|(coords, ids)| (*coords, ids.as_slice()))
    }

    /// Add a collider to every cell its bounds cover. The caller keeps
    /// `bounds` so the exact same cells can be found again on removal.
    pub fn register(&mut self, id: ColliderId, bounds: &RectangleF) {
        let (min, max) = self.cell_range(bounds);
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                self.cells.entry(IVec2::new(x, y)).or_default().push(id);
            }
        }
    }

    /// Remove a collider from the cells of its registered bounds. Cells left
    /// empty are dropped.
    pub fn remove(&mut self, id: ColliderId, registered_bounds: &RectangleF) {
        let (min, max) = self.cell_range(registered_bounds);
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                let coords = IVec2::new(x, y);
                if let Some(cell) = self.cells.get_mut(&coords) {
                    cell.retain(|other| *other != id);
                    if cell.is_empty() {
                        self.cells.remove(&coords);
                    }
                }
            }
        }
    }

    /// Remove a collider from every cell, for when its registered bounds are
    /// unknown
    pub fn remove_with_brute_force(&mut self, id: ColliderId) {
        self.cells.retain(|_, cell| {
            cell.retain(|other| *other != id);
            !cell.is_empty()
        });
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.checked.clear();
    }

    /// Collect colliders in the cells covered by `bounds`, each at most once,
    /// in discovery order. `accept` performs the bounds and layer filtering.
    pub fn aabb_broadphase(
        &mut self,
        bounds: &RectangleF,
        exclude: Option<ColliderId>,
        results: &mut Vec<ColliderId>,
        mut accept: impl FnMut(ColliderId) -> bool,
    ) {
        self.checked.clear();
        let (min, max) = self.cell_range(bounds);

        for x in min.x..=max.x {
            for y in min.y..=max.y {
                let Some(cell) = self.cells.get(&IVec2::new(x, y)) else {
                    continue;
                };

                for &id in cell {
                    if Some(id) == exclude || !self.checked.insert(id) {
                        continue;
                    }
                    if accept(id) {
                        results.push(id);
                    }
                }
            }
        }
    }

    /// Walk the grid along `start -> end` one cell at a time and run `test`
    /// against each collider found, once per collider. `test` returns the hit
    /// and the collider's cast sort order.
    ///
    /// Hits are pushed to `hits` ordered by fraction, then sort order, then
    /// handle. Returns whether the walk gave up after `max_steps` cells.
    pub fn linecast(
        &mut self,
        start: Vec2,
        end: Vec2,
        max_steps: u32,
        mode: LinecastMode,
        hits: &mut Vec<RaycastHit>,
        mut test: impl FnMut(ColliderId) -> Option<(RaycastHit, i32)>,
    ) -> bool {
        self.checked.clear();
        let mut found = std::mem::take(&mut self.found);
        found.clear();

        let direction = end - start;
        let mut current = self.cell_coords(start.x, start.y);
        let last = self.cell_coords(end.x, end.y);

        let mut step_x = direction.x.signum() as i32;
        let mut step_y = direction.y.signum() as i32;
        if current.x == last.x {
            step_x = 0;
        }
        if current.y == last.y {
            step_y = 0;
        }

        // Fractions of `direction` at which the walk crosses the next boundary
        let boundary_x = (current.x + i32::from(step_x > 0)) as f32 * self.cell_size;
        let boundary_y = (current.y + i32::from(step_y > 0)) as f32 * self.cell_size;
        let mut t_max_x = if step_x != 0 {
            (boundary_x - start.x) / direction.x
        } else {
            f32::MAX
        };
        let mut t_max_y = if step_y != 0 {
            (boundary_y - start.y) / direction.y
        } else {
            f32::MAX
        };
        let t_delta_x = if step_x != 0 {
            self.cell_size / direction.x.abs()
        } else {
            f32::MAX
        };
        let t_delta_y = if step_y != 0 {
            self.cell_size / direction.y.abs()
        } else {
            f32::MAX
        };

        let mut steps = 0;
        let mut hit_step_cap = false;
        loop {
            if let Some(cell) = self.cells.get(&current) {
                for &id in cell {
                    if !self.checked.insert(id) {
                        continue;
                    }
                    if let Some((hit, order)) = test(id) {
                        found.push((hit, order, id));
                    }
                }
            }

            if current == last {
                break;
            }

            // Nothing undiscovered can be hit before this cell's exit
            let exit = t_max_x.min(t_max_y);
            if mode == LinecastMode::Closest && found.iter().any(|(hit, _, _)| hit.fraction < exit) {
                break;
            }

            steps += 1;
            if steps >= max_steps {
                hit_step_cap = true;
                break;
            }

            // Never step past the final row or column on float noise
            let along_x = if current.x == last.x {
                false
            } else if current.y == last.y {
                true
            } else {
                t_max_x < t_max_y
            };

            if along_x {
                current.x += step_x;
                t_max_x += t_delta_x;
            } else {
                current.y += step_y;
                t_max_y += t_delta_y;
            }
        }

        found.sort_by(|a, b| {
            a.0.fraction
                .total_cmp(&b.0.fraction)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        match mode {
            LinecastMode::Closest => hits.extend(found.first().map(|(hit, _, _)| *hit)),
            LinecastMode::All => hits.extend(found.iter().map(|(hit, _, _)| *hit)),
        }
        self.found = found;

        hit_step_cap
    }
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(100.0)
    }
}
