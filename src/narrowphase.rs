use arrayvec::ArrayVec;
use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::geometry::ConvexPolygon;
use crate::types::*;

/// Narrowphase: separating-axis detection and single-point manifold clipping.
pub struct Narrowphase;

/// Running minimum-overlap search across candidate axes.
struct AxisSearch {
    best: CollisionData,
    found: bool,
    grazing: bool,
}

impl AxisSearch {
    fn new() -> Self {
        Self {
            best: CollisionData { minimum_translation: f32::INFINITY, ..CollisionData::NONE },
            found: false,
            grazing: false,
        }
    }

    /// Feed one axis. Returns false when the axis separates the shapes.
    fn check(&mut self, axis: Vec2, a: (f32, f32), b: (f32, f32), belongs_to_a: bool) -> bool {
        let overlap = a.1.min(b.1) - a.0.max(b.0);
        if overlap < 0.0 {
            return false;
        }
        if overlap <= EPSILON {
            // Touching along this axis: never a candidate for the minimum.
            self.grazing = true;
            return true;
        }
        if overlap < self.best.minimum_translation {
            self.best.minimum_translation = overlap;
            self.best.separation_axis = axis;
            self.best.belongs_to_a = belongs_to_a;
            self.found = true;
        }
        true
    }

    fn finish(self) -> CollisionData {
        if self.found && !self.grazing {
            self.best
        } else {
            CollisionData::NONE
        }
    }
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

fn edges(points: &[Vec2]) -> impl Iterator<Item = Edge> + '_ {
    let n = points.len();
    (0..n).map(move |i| Edge::between(points[i], points[(i + 1) % n]))
}

fn centroid(points: &[Vec2]) -> Vec2 {
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

/// Flip `data.separation_axis` so it points from `center_a` toward `center_b`.
fn orient(data: &mut CollisionData, center_a: Vec2, center_b: Vec2) {
    if data.separation_axis.dot(center_b - center_a) < 0.0 {
        data.separation_axis = -data.separation_axis;
    }
}

/// Keep the part of segment `v1..v2` where `n·p >= o`. Fails unless two points remain.
fn clip(v1: Vec2, v2: Vec2, n: Vec2, o: f32) -> Option<[Vec2; 2]> {
    let d1 = n.dot(v1) - o;
    let d2 = n.dot(v2) - o;
    let mut kept: ArrayVec<Vec2, 2> = ArrayVec::new();
    if d1 >= 0.0 {
        kept.push(v1);
    }
    if d2 >= 0.0 {
        kept.push(v2);
    }
    if d1 * d2 < 0.0 {
        let u = d1 / (d1 - d2);
        kept.push(v1 + (v2 - v1) * u);
    }
    kept.into_inner().ok()
}

fn circle_circle(c0: Vec2, r0: f32, c1: Vec2, r1: f32) -> CollisionData {
    let delta = c1 - c0;
    let dist = delta.length();
    let overlap = r0 + r1 - dist;
    if overlap <= EPSILON {
        return CollisionData::NONE;
    }
    // Coincident centres have no preferred direction.
    let axis = if dist > EPSILON { delta / dist } else { Vec2::X };
    CollisionData {
        separation_axis: axis,
        minimum_translation: overlap,
        belongs_to_a: true,
        contact_point: c0 + axis * r0,
    }
}

fn polygon_polygon(a: &ConvexPolygon, b: &ConvexPolygon) -> CollisionData {
    let pa = a.points_in_world();
    let pb = b.points_in_world();
    let mut data = Narrowphase::calc_collision_data(&pa, &pb);
    if !data.collides() {
        return data;
    }
    orient(&mut data, centroid(&pa), centroid(&pb));

    let axis = data.separation_axis;
    let fa = Narrowphase::obtain_features(&pa, axis);
    let fb = Narrowphase::obtain_features(&pb, -axis);
    let contacts = Narrowphase::clip_edges(&fa, &fb, axis);
    if contacts.is_empty() {
        tracing::trace!(?axis, depth = data.minimum_translation, "manifold clipping left no contact");
        return CollisionData::NONE;
    }
    data.contact_point = contacts.iter().copied().sum::<Vec2>() / contacts.len() as f32;
    data
}

impl NarrowphaseApi for Narrowphase {
    fn calc_collision_data(a: &[Vec2], b: &[Vec2]) -> CollisionData {
        let mut search = AxisSearch::new();
        for (points, belongs_to_a) in [(a, true), (b, false)] {
            for edge in edges(points) {
                let n = edge.normal();
                if n.length_squared() < EPSILON * EPSILON {
                    continue;
                }
                if !search.check(n, project(a, n), project(b, n), belongs_to_a) {
                    return CollisionData::NONE;
                }
            }
        }
        search.finish()
    }

    fn calc_circle_polygon_data(center: Vec2, radius: f32, polygon: &[Vec2]) -> CollisionData {
        let circle = |n: Vec2| {
            let c = center.dot(n);
            (c - radius, c + radius)
        };
        let mut search = AxisSearch::new();
        for edge in edges(polygon) {
            let n = edge.normal();
            if n.length_squared() < EPSILON * EPSILON {
                continue;
            }
            if !search.check(n, circle(n), project(polygon, n), false) {
                return CollisionData::NONE;
            }
        }

        let closest = polygon
            .iter()
            .copied()
            .min_by(|p, q| p.distance_squared(center).total_cmp(&q.distance_squared(center)));
        if let Some(v) = closest {
            let d = center - v;
            if d.length_squared() > EPSILON * EPSILON {
                let n = d.normalize();
                if !search.check(n, circle(n), project(polygon, n), true) {
                    return CollisionData::NONE;
                }
            }
        }
        search.finish()
    }

    fn get_collision_data(a: &ConvexPolygon, b: &ConvexPolygon) -> CollisionData {
        match (a.is_circle(), b.is_circle()) {
            (true, true) => circle_circle(a.position, a.radius(), b.position, b.radius()),
            (true, false) => {
                let pb = b.points_in_world();
                let mut data = Self::calc_circle_polygon_data(a.position, a.radius(), &pb);
                if !data.collides() {
                    return data;
                }
                orient(&mut data, a.position, centroid(&pb));
                data.contact_point = a.position + data.separation_axis * a.radius();
                data
            }
            (false, true) => {
                let pa = a.points_in_world();
                let mut data = Self::calc_circle_polygon_data(b.position, b.radius(), &pa);
                if !data.collides() {
                    return data;
                }
                // The circle played A in the search above.
                data.belongs_to_a = !data.belongs_to_a;
                orient(&mut data, centroid(&pa), b.position);
                data.contact_point = b.position - data.separation_axis * b.radius();
                data
            }
            (false, false) => polygon_polygon(a, b),
        }
    }

    fn overlaps(a: &ConvexPolygon, b: &ConvexPolygon) -> bool {
        match (a.is_circle(), b.is_circle()) {
            (true, true) => circle_circle(a.position, a.radius(), b.position, b.radius()).collides(),
            (true, false) => Self::calc_circle_polygon_data(a.position, a.radius(), &b.points_in_world()).collides(),
            (false, true) => Self::calc_circle_polygon_data(b.position, b.radius(), &a.points_in_world()).collides(),
            (false, false) => Self::calc_collision_data(&a.points_in_world(), &b.points_in_world()).collides(),
        }
    }

    fn circle_overlaps(center: Vec2, radius: f32, shape: &ConvexPolygon) -> bool {
        if shape.is_circle() {
            circle_circle(center, radius, shape.position, shape.radius()).collides()
        } else {
            Self::calc_circle_polygon_data(center, radius, &shape.points_in_world()).collides()
        }
    }

    fn obtain_features(points: &[Vec2], axis: Vec2) -> CollisionFeature {
        let n = points.len();
        let mut best = 0;
        let mut best_proj = f32::NEG_INFINITY;
        for (i, p) in points.iter().enumerate() {
            let d = p.dot(axis);
            if d > best_proj {
                best_proj = d;
                best = i;
            }
        }
        let v = points[best];
        let prev = Edge::between(points[(best + n - 1) % n], v);
        let next = Edge::between(v, points[(best + 1) % n]);
        let edge = if prev.tangent.dot(axis).abs() <= next.tangent.dot(axis).abs() { prev } else { next };
        CollisionFeature { best_vertex: v, edge }
    }

    fn clip_edges(a: &CollisionFeature, b: &CollisionFeature, axis: Vec2) -> ArrayVec<Vec2, 2> {
        let mut out = ArrayVec::new();
        // Reference = the edge more nearly perpendicular to the axis; its face looks along `facing`.
        let (reference, incident, facing) =
            if a.edge.tangent.dot(axis).abs() <= b.edge.tangent.dot(axis).abs() {
                (a, b, axis)
            } else {
                (b, a, -axis)
            };

        let t = reference.edge.tangent;
        let o1 = t.dot(reference.edge.from);
        let Some(cp) = clip(incident.edge.from, incident.edge.to(), t, o1) else {
            return out;
        };
        let o2 = t.dot(reference.edge.to());
        let Some(cp) = clip(cp[0], cp[1], -t, -o2) else {
            return out;
        };

        let mut normal = reference.edge.normal();
        if normal.dot(facing) < 0.0 {
            normal = -normal;
        }
        let face = normal.dot(reference.best_vertex);
        for p in cp {
            if face - normal.dot(p) >= 0.0 {
                out.push(p);
            }
        }
        out
    }

    fn ray_aabb(origin: Vec2, dir: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<SegmentHit> {
        // Slab method with normal tracking; returns earliest t >= 0
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        let mut n_enter = Vec2::ZERO;

        for axis in 0..2 {
            let (o, d, lo, hi) = (origin[axis], dir[axis], aabb_min[axis], aabb_max[axis]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            let mut sign = -1.0;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
                sign = 1.0;
            }
            if t1 > tmin {
                tmin = t1;
                n_enter = Vec2::ZERO;
                n_enter[axis] = sign;
            }
            if t2 < tmax {
                tmax = t2;
            }
            if tmin > tmax {
                return None;
            }
        }
        if tmax < 0.0 {
            return None;
        }

        // If origin inside, tmin < 0; treat as immediate hit
        let toi = if tmin < 0.0 { 0.0 } else { tmin };
        let normal = if tmin < 0.0 { Vec2::ZERO } else { n_enter };
        Some(SegmentHit { toi, normal, contact: origin + dir * toi })
    }

    fn line_segment_segment(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Option<SegmentHit> {
        let r = b - a;
        let s = d - c;
        let denom = r.perp_dot(s);
        if denom.abs() < EPSILON * EPSILON {
            return None; // parallel or degenerate
        }
        let qp = c - a;
        let t = qp.perp_dot(s) / denom;
        let u = qp.perp_dot(r) / denom;
        if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
            return None;
        }
        let mut normal = Vec2::new(s.y, -s.x).normalize_or_zero();
        if normal.dot(r) > 0.0 {
            normal = -normal;
        }
        Some(SegmentHit { toi: t, normal, contact: a + r * t })
    }

    fn line_segment_circle(a: Vec2, b: Vec2, center: Vec2, r: f32) -> Option<SegmentHit> {
        // Solve |a + t d - c|^2 = r^2, t in [0,1]
        let d = b - a;
        let m = a - center;
        let acoef = d.length_squared();
        if acoef == 0.0 {
            return None;
        }
        let bcoef = 2.0 * m.dot(d);
        let ccoef = m.length_squared() - r * r;
        if ccoef <= 0.0 {
            // Segment starts inside the circle.
            return Some(SegmentHit { toi: 0.0, normal: Vec2::ZERO, contact: a });
        }
        let disc = bcoef * bcoef - 4.0 * acoef * ccoef;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let t0 = (-bcoef - sqrt_disc) / (2.0 * acoef);
        let t1 = (-bcoef + sqrt_disc) / (2.0 * acoef);
        let mut t = f32::INFINITY;
        for cand in [t0, t1] {
            if (0.0..=1.0).contains(&cand) {
                t = t.min(cand);
            }
        }
        if !t.is_finite() {
            return None;
        }
        let contact = a + d * t;
        let normal = (contact - center).normalize_or_zero();
        Some(SegmentHit { toi: t, normal, contact })
    }
}
