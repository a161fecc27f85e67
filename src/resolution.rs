//! Impulse response for a single averaged contact.

use crate::api::GameObject;
use crate::types::CollisionData;

const INV_MASS_A: f32 = 1.0;
const INV_MASS_B: f32 = 1.0;
/// Perfectly elastic.
const RESTITUTION: f32 = 1.0;
/// No rotational coupling: the angular terms stay in the impulse denominator but vanish.
const INV_INERTIA: f32 = 0.0;

/// Push `a` and `b` apart along `data.separation_axis` and exchange a normal impulse.
///
/// The axis must point from `a` toward `b`.
pub fn bounce<O: GameObject>(a: &mut O, b: &mut O, data: &CollisionData) {
    let n = data.separation_axis;
    let inv_sum = INV_MASS_A + INV_MASS_B;

    let correction = n * data.minimum_translation;
    a.set_position(a.position() - correction * (INV_MASS_A / inv_sum));
    b.set_position(b.position() + correction * (INV_MASS_B / inv_sum));

    let rel = b.velocity() - a.velocity();
    let vn = rel.dot(n);
    if vn > 0.0 {
        return; // already separating
    }

    let ra = data.contact_point - a.position();
    let rb = data.contact_point - b.position();
    let ra_cross_n = ra.perp_dot(n);
    let rb_cross_n = rb.perp_dot(n);
    let denom = inv_sum + ra_cross_n * ra_cross_n * INV_INERTIA + rb_cross_n * rb_cross_n * INV_INERTIA;

    let j = -(1.0 + RESTITUTION) * vn / denom;
    a.set_velocity(a.velocity() - n * (j * INV_MASS_A));
    b.set_velocity(b.velocity() + n * (j * INV_MASS_B));
}
