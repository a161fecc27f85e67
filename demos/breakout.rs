use glam::Vec2;
use polycollide::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Kind {
    Wall,
    Brick,
    Ball,
}

struct Thing {
    kind: Kind,
    pos: Vec2,
    size: Vec2,
    vel: Vec2,
    hp: u32,
}

impl GameObject for Thing {
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
        0.0
    }
    fn size(&self) -> Vec2 {
        self.size
    }
    fn velocity(&self) -> Vec2 {
        self.vel
    }
    fn set_velocity(&mut self, velocity: Vec2) {
        self.vel = velocity;
    }

    fn on_collision_with(&mut self, other: &mut Self, data: &CollisionData, _commands: &mut Commands<Self>) {
        if self.kind == Kind::Ball {
            // Reflect off whatever was hit; the axis points toward `other`.
            let n = data.separation_axis;
            self.pos -= n * data.minimum_translation;
            if self.vel.dot(n) > 0.0 {
                self.vel -= 2.0 * self.vel.dot(n) * n;
            }
        } else if other.kind == Kind::Ball {
            self.hp = self.hp.saturating_sub(1);
        }
    }
}

fn block(kind: Kind, pos: Vec2, size: Vec2) -> Thing {
    Thing { kind, pos, size, vel: Vec2::ZERO, hp: 1 }
}

fn main() {
    let mut world: CollisionWorld<Thing> = CollisionWorld::new(CollisionConfig::default());
    world.register_pair(Kind::Wall, Kind::Ball);
    world.register_pair(Kind::Brick, Kind::Ball);
    world.register_resolver(Kind::Ball, Kind::Ball, |a, b, data, _| bounce(a, b, data));

    let square = CollisionShape::single(ConvexPolygon::unit_square());
    world.spawn_with_shape(block(Kind::Wall, Vec2::new(-11.0, 0.0), Vec2::new(2.0, 24.0)), square.clone());
    world.spawn_with_shape(block(Kind::Wall, Vec2::new(11.0, 0.0), Vec2::new(2.0, 24.0)), square.clone());
    world.spawn_with_shape(block(Kind::Wall, Vec2::new(0.0, 11.0), Vec2::new(24.0, 2.0)), square.clone());
    let bricks: Vec<EntityId> = (0..5)
        .map(|i| {
            let x = -8.0 + i as f32 * 4.0;
            world.spawn_with_shape(block(Kind::Brick, Vec2::new(x, 7.0), Vec2::new(3.0, 1.0)), square.clone())
        })
        .collect();
    for (x, vx) in [(-2.0, 3.0), (2.0, -4.0)] {
        let ball = Thing { kind: Kind::Ball, pos: Vec2::new(x, -6.0), size: Vec2::splat(1.0), vel: Vec2::new(vx, 12.0), hp: 1 };
        world.spawn_with_shape(ball, CollisionShape::single(ConvexPolygon::circle()));
    }

    let dt = 1.0 / 60.0;
    for frame in 0..240 {
        for (_, thing) in world.objects_mut() {
            thing.pos += thing.vel * dt;
        }
        world.step();

        for ev in world.drain_events() {
            println!(
                "frame {frame}: {:?} vs {:?} depth={:.3} n=({:.2},{:.2}) at ({:.2},{:.2})",
                ev.a,
                ev.b,
                ev.data.minimum_translation,
                ev.data.separation_axis.x,
                ev.data.separation_axis.y,
                ev.data.contact_point.x,
                ev.data.contact_point.y
            );
        }
        for &id in &bricks {
            if world.object(id).is_some_and(|b| b.hp == 0) {
                world.despawn(id);
            }
        }
    }

    let s = world.stats();
    println!(
        "last tick: components={} inserts={} reinserts={} candidates={} narrow={} collisions={}",
        s.components, s.broadphase_inserts, s.broadphase_reinserts, s.candidate_pairs, s.narrow_tests, s.collisions
    );
}
