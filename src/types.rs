use glam::Vec2;

use std::fmt::Debug;
use std::hash::Hash;

/// Tolerance shared by every geometric test (degenerate edges, grazing overlaps, parallel segments).
pub const EPSILON: f32 = 1e-4;

/// `minimum_translation` value meaning "no collision".
pub const NO_COLLISION: f32 = -1.0;

/// Stable entity handle; survives swap-removes in the packed stores.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Unordered pair key, smaller id first.
    pub fn pair_key(self, other: EntityId) -> (EntityId, EntityId) {
        if self < other { (self, other) } else { (other, self) }
    }
}

/// Object-type tag used to pick a broad-phase index and to key resolvers.
///
/// Blanket-implemented for any small copyable enum.
pub trait ObjectKind: Copy + Eq + Hash + Ord + Debug + 'static {}

impl<T> ObjectKind for T where T: Copy + Eq + Hash + Ord + Debug + 'static {}

/// Axis-aligned box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self { min: center - half_extents, max: center + half_extents }
    }

    /// Tight box around `points`. Callers pass at least one point.
    pub fn from_points(points: &[Vec2]) -> Self {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for &p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Grow by `margin` on every side.
    pub fn inflate(&self, margin: f32) -> Aabb {
        Aabb { min: self.min - Vec2::splat(margin), max: self.max + Vec2::splat(margin) }
    }

    /// True when `other` lies fully inside `self` (boundaries inclusive).
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Polygon edge: start point, unit tangent and length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: Vec2,
    pub tangent: Vec2,
    pub length: f32,
}

impl Edge {
    /// Edge running from `from` to `to`. A degenerate edge gets a zero tangent.
    pub fn between(from: Vec2, to: Vec2) -> Self {
        let d = to - from;
        let length = d.length();
        let tangent = if length > EPSILON { d / length } else { Vec2::ZERO };
        Self { from, tangent, length }
    }

    pub fn to(&self) -> Vec2 {
        self.from + self.tangent * self.length
    }

    /// Normal with the fixed convention `perp(t) = (t.y, -t.x)`.
    /// Outward for counter-clockwise winding.
    pub fn normal(&self) -> Vec2 {
        Vec2::new(self.tangent.y, -self.tangent.x)
    }
}

/// Support vertex along an axis plus its adjacent edge most perpendicular to that axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionFeature {
    pub best_vertex: Vec2,
    pub edge: Edge,
}

/// Narrow-phase result for one pair of convex shapes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionData {
    /// Unit axis of minimum penetration, pointing from A toward B once oriented.
    pub separation_axis: Vec2,
    /// Penetration depth along `separation_axis`; negative means no collision.
    pub minimum_translation: f32,
    /// Whether the separation axis came from one of A's edges.
    pub belongs_to_a: bool,
    /// Single averaged contact point.
    pub contact_point: Vec2,
}

impl CollisionData {
    pub const NONE: CollisionData = CollisionData {
        separation_axis: Vec2::ZERO,
        minimum_translation: NO_COLLISION,
        belongs_to_a: false,
        contact_point: Vec2::ZERO,
    };

    pub fn collides(&self) -> bool {
        self.minimum_translation >= 0.0
    }

    /// Same contact seen from B's side: axis negated, ownership swapped.
    pub fn flipped(&self) -> CollisionData {
        CollisionData {
            separation_axis: -self.separation_axis,
            belongs_to_a: !self.belongs_to_a,
            ..*self
        }
    }
}

impl Default for CollisionData {
    fn default() -> Self {
        Self::NONE
    }
}

/// Ray / segment intersection against a primitive.
#[derive(Copy, Clone, Debug)]
pub struct SegmentHit {
    /// Parameter along the query direction (segment fraction, or ray length for unit rays).
    pub toi: f32,
    pub normal: Vec2,
    pub contact: Vec2,
}

/// Result of a world raycast. On a miss `point` is clamped to the maximum search length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    pub distance: f32,
    pub entity: Option<EntityId>,
}

impl RayHit {
    pub fn is_hit(&self) -> bool {
        self.entity.is_some()
    }
}

/// Collision event published during the resolver sweep.
#[derive(Copy, Clone, Debug)]
pub struct CollisionEvent {
    pub a: EntityId,
    pub b: EntityId,
    pub data: CollisionData,
}

/// World-level configuration.
#[derive(Clone, Debug)]
pub struct CollisionConfig {
    /// Broad-phase grid cell size in world units.
    pub cell_size: f32,
    /// Margin added around a shape's tight box when it is (re)inserted into the broad phase.
    pub box_margin: f32,
    /// Maximum number of events buffered per tick; extra are dropped.
    pub max_events: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { cell_size: 8.0, box_margin: 1.5, max_events: 1024 }
    }
}

/// Counters for the last completed tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionStats {
    pub components: usize,
    /// First-time broad-phase insertions.
    pub broadphase_inserts: usize,
    /// Remove + reinsert caused by a shape leaving its inflated box.
    pub broadphase_reinserts: usize,
    pub candidate_pairs: usize,
    /// Sub-shape pairs handed to the narrow phase.
    pub narrow_tests: usize,
    pub collisions: usize,
    pub events_dropped: usize,
}
