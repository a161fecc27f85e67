use arrayvec::ArrayVec;
use glam::Vec2;

use crate::commands::Commands;
use crate::geometry::ConvexPolygon;
use crate::types::*;

/// Broad-phase index contract, one instance per object kind.
pub trait BroadPhaseApi {
    /// Construct an empty index with the given configuration.
    fn new(cfg: &CollisionConfig) -> Self
    where
        Self: Sized;

    /// Insert `id` with the (already inflated) box `rect`.
    fn add_rect(&mut self, rect: Aabb, id: EntityId);

    /// Remove `id`; returns false when it was not present.
    fn remove_object(&mut self, id: EntityId) -> bool;

    /// Box currently stored for `id`.
    fn object_rect(&self, id: EntityId) -> Option<Aabb>;

    /// Pairs of ids inside this index whose boxes intersect. Each pair appears once.
    fn find_close_pairs_within(&self) -> Vec<(EntityId, EntityId)>;

    /// Cross pairs `(self_id, other_id)` whose boxes intersect.
    fn find_close_pairs_with(&self, other: &Self) -> Vec<(EntityId, EntityId)>
    where
        Self: Sized;

    /// Ids whose stored boxes intersect `rect`.
    fn find_intersecting_leaves(&self, rect: Aabb) -> Vec<EntityId>;

    /// Ids whose stored boxes are crossed by the ray within `max_len` (`dir` is unit length).
    fn ray_cast(&self, origin: Vec2, dir: Vec2, max_len: f32) -> Vec<EntityId>;

    /// Number of stored ids.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entity accessor consumed by the collision pipeline.
pub trait GameObject: Sized + 'static {
    type Kind: ObjectKind;

    fn kind(&self) -> Self::Kind;
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    /// Rotation in radians.
    fn angle(&self) -> f32;
    /// Full width/height; collision polygons are scaled by half of it.
    fn size(&self) -> Vec2;
    fn velocity(&self) -> Vec2;
    fn set_velocity(&mut self, velocity: Vec2);

    /// Per-entity collision handler used by the default resolver.
    ///
    /// `data.separation_axis` points from `self` toward `other`.
    fn on_collision_with(
        &mut self,
        other: &mut Self,
        data: &CollisionData,
        commands: &mut Commands<Self>,
    ) {
        let _ = (other, data, commands);
    }
}

/// Narrowphase primitive tests.
pub trait NarrowphaseApi {
    // SAT -------------------------------------------------------------------

    /// Minimum-translation search over the edge normals of both point sets.
    fn calc_collision_data(a: &[Vec2], b: &[Vec2]) -> CollisionData;

    /// SAT against a circle (treated as shape A) and a polygon.
    fn calc_circle_polygon_data(center: Vec2, radius: f32, polygon: &[Vec2]) -> CollisionData;

    /// Full test: SAT, axis orientation A→B, feature clipping, averaged contact point.
    fn get_collision_data(a: &ConvexPolygon, b: &ConvexPolygon) -> CollisionData;

    /// SAT-only overlap test, no manifold construction.
    fn overlaps(a: &ConvexPolygon, b: &ConvexPolygon) -> bool;

    /// Exact circle vs shape test used by radius queries.
    fn circle_overlaps(center: Vec2, radius: f32, shape: &ConvexPolygon) -> bool;

    // Manifold --------------------------------------------------------------

    fn obtain_features(points: &[Vec2], axis: Vec2) -> CollisionFeature;
    fn clip_edges(a: &CollisionFeature, b: &CollisionFeature, axis: Vec2) -> ArrayVec<Vec2, 2>;

    // Rays / segments -------------------------------------------------------

    fn ray_aabb(origin: Vec2, dir: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<SegmentHit>;
    fn line_segment_segment(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Option<SegmentHit>;
    fn line_segment_circle(a: Vec2, b: Vec2, center: Vec2, r: f32) -> Option<SegmentHit>;
}
