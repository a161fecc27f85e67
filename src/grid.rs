use glam::Vec2;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::api::{BroadPhaseApi, NarrowphaseApi};
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Uniform-grid broad phase.
///
/// Cells live in an ordered map and keep ids in insertion order, so pair
/// enumeration is deterministic for a given sequence of inserts.
pub struct GridIndex {
    cell_size: f32,
    // Cell coord -> ids whose stored box touches the cell
    cells: BTreeMap<(i32, i32), Vec<EntityId>>,
    rects: HashMap<EntityId, Aabb>,
}

impl GridIndex {
    fn world_to_cell(&self, p: Vec2) -> (i32, i32) {
        ((p.x / self.cell_size).floor() as i32, (p.y / self.cell_size).floor() as i32)
    }

    fn cell_range(&self, rect: &Aabb) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (ix0, iy0) = self.world_to_cell(rect.min);
        let (ix1, iy1) = self.world_to_cell(rect.max);
        (iy0..=iy1).flat_map(move |iy| (ix0..=ix1).map(move |ix| (ix, iy)))
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl BroadPhaseApi for GridIndex {
    fn new(cfg: &CollisionConfig) -> Self {
        Self {
            cell_size: cfg.cell_size.max(1e-5),
            cells: BTreeMap::new(),
            rects: HashMap::new(),
        }
    }

    fn add_rect(&mut self, rect: Aabb, id: EntityId) {
        if self.rects.contains_key(&id) {
            self.remove_object(id);
        }
        for cell in self.cell_range(&rect) {
            self.cells.entry(cell).or_default().push(id);
        }
        self.rects.insert(id, rect);
    }

    fn remove_object(&mut self, id: EntityId) -> bool {
        let Some(rect) = self.rects.remove(&id) else {
            return false;
        };
        for cell in self.cell_range(&rect) {
            if let Some(list) = self.cells.get_mut(&cell) {
                list.retain(|&other| other != id);
                if list.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
        true
    }

    fn object_rect(&self, id: EntityId) -> Option<Aabb> {
        self.rects.get(&id).copied()
    }

    fn find_close_pairs_within(&self) -> Vec<(EntityId, EntityId)> {
        let mut seen: HashSet<(EntityId, EntityId)> = HashSet::new();
        let mut out = Vec::new();
        for ids in self.cells.values() {
            for i0 in 0..ids.len() {
                for i1 in (i0 + 1)..ids.len() {
                    let (a, b) = (ids[i0], ids[i1]);
                    if !seen.insert(a.pair_key(b)) {
                        continue;
                    }
                    if self.rects[&a].intersects(&self.rects[&b]) {
                        out.push((a, b));
                    }
                }
            }
        }
        out
    }

    fn find_close_pairs_with(&self, other: &Self) -> Vec<(EntityId, EntityId)> {
        let mut seen: HashSet<(EntityId, EntityId)> = HashSet::new();
        let mut out = Vec::new();
        for (cell, ids) in &self.cells {
            let Some(others) = other.cells.get(cell) else {
                continue;
            };
            for &a in ids {
                for &b in others {
                    if a == b || !seen.insert((a, b)) {
                        continue;
                    }
                    if self.rects[&a].intersects(&other.rects[&b]) {
                        out.push((a, b));
                    }
                }
            }
        }
        out
    }

    fn find_intersecting_leaves(&self, rect: Aabb) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for cell in self.cell_range(&rect) {
            if let Some(list) = self.cells.get(&cell) {
                for &id in list {
                    if seen.insert(id) && self.rects[&id].intersects(&rect) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    fn ray_cast(&self, origin: Vec2, dir: Vec2, max_len: f32) -> Vec<EntityId> {
        let mut out = Vec::new();
        if dir.length_squared() == 0.0 {
            return out;
        }
        let cs = self.cell_size;
        let mut tested: HashSet<EntityId> = HashSet::new();

        // DDA setup
        let mut cell = self.world_to_cell(origin);
        let step_x = if dir.x > 0.0 { 1 } else if dir.x < 0.0 { -1 } else { 0 };
        let step_y = if dir.y > 0.0 { 1 } else if dir.y < 0.0 { -1 } else { 0 };
        let next_boundary = |c: i32, step: i32| -> f32 {
            if step > 0 { (c as f32 + 1.0) * cs } else { c as f32 * cs }
        };
        let mut t_max_x = if step_x != 0 {
            (next_boundary(cell.0, step_x) - origin.x) / dir.x
        } else {
            f32::INFINITY
        };
        let mut t_max_y = if step_y != 0 {
            (next_boundary(cell.1, step_y) - origin.y) / dir.y
        } else {
            f32::INFINITY
        };
        let t_delta_x = if step_x != 0 { cs / dir.x.abs() } else { f32::INFINITY };
        let t_delta_y = if step_y != 0 { cs / dir.y.abs() } else { f32::INFINITY };

        let mut t_curr = 0.0f32;
        // A ray of length max_len crosses at most this many cell boundaries per axis
        let max_steps = ((max_len / cs).ceil().max(0.0) as usize).saturating_add(1).saturating_mul(2);
        for _ in 0..=max_steps {
            if t_curr > max_len {
                break;
            }
            if let Some(list) = self.cells.get(&cell) {
                for &id in list {
                    if !tested.insert(id) {
                        continue;
                    }
                    let rect = self.rects[&id];
                    if let Some(h) = Narrowphase::ray_aabb(origin, dir, rect.min, rect.max) {
                        if h.toi <= max_len {
                            out.push(id);
                        }
                    }
                }
            }

            // Step to next cell
            if t_max_x < t_max_y {
                cell.0 += step_x;
                t_curr = t_max_x;
                t_max_x += t_delta_x;
            } else {
                cell.1 += step_y;
                t_curr = t_max_y;
                t_max_y += t_delta_y;
            }
        }
        out
    }

    fn len(&self) -> usize {
        self.rects.len()
    }
}
