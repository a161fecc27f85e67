use glam::Vec2;
use polycollide::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Kind {
    Crate,
    Barrel,
}

struct Prop {
    kind: Kind,
    pos: Vec2,
    angle: f32,
    size: Vec2,
}

impl GameObject for Prop {
    type Kind = Kind;
    fn kind(&self) -> Kind {
        self.kind
    }
    fn position(&self) -> Vec2 {
        self.pos
    }
    fn set_position(&mut self, position: Vec2) {
        self.pos = position;
    }
    fn angle(&self) -> f32 {
        self.angle
    }
    fn size(&self) -> Vec2 {
        self.size
    }
    fn velocity(&self) -> Vec2 {
        Vec2::ZERO
    }
    fn set_velocity(&mut self, _velocity: Vec2) {}
}

fn main() {
    let mut world: CollisionWorld<Prop> = CollisionWorld::new(CollisionConfig::default());
    world.spawn_with_shape(
        Prop { kind: Kind::Crate, pos: Vec2::new(6.0, 0.5), angle: 0.4, size: Vec2::splat(2.0) },
        CollisionShape::single(ConvexPolygon::unit_square()),
    );
    world.spawn_with_shape(
        Prop { kind: Kind::Barrel, pos: Vec2::new(12.0, 0.0), angle: 0.0, size: Vec2::splat(3.0) },
        CollisionShape::single(ConvexPolygon::circle()),
    );
    world.step();

    for (dir, kinds) in [
        (Vec2::X, &[Kind::Crate, Kind::Barrel][..]),
        (Vec2::X, &[Kind::Barrel][..]),
        (Vec2::Y, &[Kind::Crate, Kind::Barrel][..]),
    ] {
        let hit = world.raycast(Vec2::ZERO, dir, 100.0, kinds);
        match hit.entity {
            Some(id) => println!("Ray {dir:?} hit id={id:?} d={:.3} at ({:.2},{:.2})", hit.distance, hit.point.x, hit.point.y),
            None => println!("Ray {dir:?} no hit, clamped to ({:.2},{:.2})", hit.point.x, hit.point.y),
        }
    }

    let near = world.nearest_in_radius(Vec2::new(9.0, 0.0), 3.0, &[Kind::Crate, Kind::Barrel]);
    println!("Within 3 of (9,0): {near:?}");
}
