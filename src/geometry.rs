use glam::Vec2;

use crate::error::CollisionError;
use crate::types::Aabb;

/// Convex polygon in local space plus its transform.
///
/// Fewer than three local points marks a circle centred at `position` with
/// radius `max(scale.x, scale.y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexPolygon {
    points: Vec<Vec2>,
    pub position: Vec2,
    /// Radians.
    pub rotation: f32,
    pub scale: Vec2,
}

impl ConvexPolygon {
    /// Polygon from consistently wound local points (counter-clockwise gives outward normals).
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points, position: Vec2::ZERO, rotation: 0.0, scale: Vec2::ONE }
    }

    /// Circle marker; the radius comes from `scale`.
    pub fn circle() -> Self {
        Self::new(Vec::new())
    }

    /// Square spanning [-1, 1]², so a scale of half the entity size covers the entity.
    pub fn unit_square() -> Self {
        Self::new(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ])
    }

    /// Convenience: placed box with the given half extents.
    pub fn rect(center: Vec2, half_extents: Vec2) -> Self {
        Self::unit_square().with_transform(center, 0.0, half_extents)
    }

    pub fn with_transform(mut self, position: Vec2, rotation: f32, scale: Vec2) -> Self {
        self.position = position;
        self.rotation = rotation;
        self.scale = scale;
        self
    }

    pub fn local_points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn is_circle(&self) -> bool {
        self.points.len() < 3
    }

    pub fn radius(&self) -> f32 {
        self.scale.x.max(self.scale.y)
    }

    /// World-space vertices: scale, then rotation, then translation. Recomputed on every call.
    pub fn points_in_world(&self) -> Vec<Vec2> {
        let rot = Vec2::from_angle(self.rotation);
        self.points
            .iter()
            .map(|&p| rot.rotate(p * self.scale) + self.position)
            .collect()
    }

    /// Vertex average for polygons, `position` for circles.
    pub fn center(&self) -> Vec2 {
        if self.is_circle() {
            return self.position;
        }
        let pts = self.points_in_world();
        pts.iter().copied().sum::<Vec2>() / pts.len() as f32
    }

    pub fn bounding_box(&self) -> Aabb {
        if self.is_circle() {
            Aabb::from_center(self.position, Vec2::splat(self.radius()))
        } else {
            Aabb::from_points(&self.points_in_world())
        }
    }
}

/// Non-empty set of convex sub-polygons moving together.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionShape {
    polygons: Vec<ConvexPolygon>,
}

impl CollisionShape {
    pub fn new(polygons: Vec<ConvexPolygon>) -> Result<Self, CollisionError> {
        if polygons.is_empty() {
            return Err(CollisionError::EmptyShape);
        }
        Ok(Self { polygons })
    }

    pub fn single(polygon: ConvexPolygon) -> Self {
        Self { polygons: vec![polygon] }
    }

    pub fn polygons(&self) -> &[ConvexPolygon] {
        &self.polygons
    }

    /// Place every sub-polygon at the owner's transform, scaled by half its size.
    pub fn sync_transform(&mut self, position: Vec2, angle: f32, size: Vec2) {
        for poly in &mut self.polygons {
            poly.position = position;
            poly.rotation = angle;
            poly.scale = size * 0.5;
        }
    }

    /// Union of the sub-polygon boxes.
    pub fn bounding_box(&self) -> Aabb {
        let (first, rest) = self
            .polygons
            .split_first()
            .expect("collision shape is never empty");
        rest.iter()
            .fold(first.bounding_box(), |acc, p| acc.union(&p.bounding_box()))
    }
}
