use glam::Vec2;

use std::collections::{HashMap, HashSet};

use crate::api::{BroadPhaseApi, GameObject, NarrowphaseApi};
use crate::commands::{Command, Commands};
use crate::error::CollisionError;
use crate::geometry::{CollisionShape, ConvexPolygon};
use crate::grid::GridIndex;
use crate::narrowphase::Narrowphase;
use crate::store::PackedArray;
use crate::types::*;

/// Collision callback for an ordered kind pair: `(a, b, data, commands)`.
pub type Resolver<O> = Box<dyn FnMut(&mut O, &mut O, &CollisionData, &mut Commands<O>)>;

/// Collision data owned by one collidable entity.
#[derive(Clone, Debug)]
pub struct CollisionComponent<K> {
    pub shape: CollisionShape,
    pub kind: K,
}

struct ResolverEntry<O: GameObject> {
    pair: (O::Kind, O::Kind),
    callback: Resolver<O>,
}

/// Collision pipeline: shape sync, lazy broad phase, resolver sweep, queries.
///
/// Everything runs on the caller's thread inside [`CollisionWorld::step`].
pub struct CollisionWorld<O: GameObject, B: BroadPhaseApi = GridIndex> {
    pub cfg: CollisionConfig,
    pub tick: u64,

    objects: PackedArray<O>,
    components: PackedArray<CollisionComponent<O::Kind>>,
    // One broad-phase index per object kind
    trees: HashMap<O::Kind, B>,

    // Sweep order follows registration order
    resolvers: Vec<ResolverEntry<O>>,
    processed: HashSet<(EntityId, EntityId)>,

    commands: Commands<O>,
    events: Vec<CollisionEvent>,
    stats: CollisionStats,
}

impl<O: GameObject, B: BroadPhaseApi> CollisionWorld<O, B> {
    pub fn new(cfg: CollisionConfig) -> Self {
        Self {
            cfg,
            tick: 0,
            objects: PackedArray::new(),
            components: PackedArray::new(),
            trees: HashMap::new(),
            resolvers: Vec::new(),
            processed: HashSet::new(),
            commands: Commands::default(),
            events: Vec::new(),
            stats: CollisionStats::default(),
        }
    }

    // --- Resolver registry -------------------------------------------------

    /// Register `callback` for the ordered pair `(a, b)`.
    ///
    /// Objects of kind `a` are passed first. Re-registering a pair replaces its
    /// callback but keeps its position in the sweep.
    pub fn register_resolver<F>(&mut self, a: O::Kind, b: O::Kind, callback: F)
    where
        F: FnMut(&mut O, &mut O, &CollisionData, &mut Commands<O>) + 'static,
    {
        let callback: Resolver<O> = Box::new(callback);
        if let Some(entry) = self.resolvers.iter_mut().find(|e| e.pair == (a, b)) {
            tracing::debug!(?a, ?b, "replacing collision resolver");
            entry.callback = callback;
        } else {
            tracing::debug!(?a, ?b, "registering collision resolver");
            self.resolvers.push(ResolverEntry { pair: (a, b), callback });
        }
    }

    /// Register `(a, b)` with the default double dispatch through
    /// [`GameObject::on_collision_with`] on both objects.
    pub fn register_pair(&mut self, a: O::Kind, b: O::Kind) {
        self.register_resolver(a, b, move |oa: &mut O, ob: &mut O, data, commands| {
            assert_eq!(oa.kind(), a, "resolver for {:?} got object of kind {:?}", (a, b), oa.kind());
            assert_eq!(ob.kind(), b, "resolver for {:?} got object of kind {:?}", (a, b), ob.kind());
            oa.on_collision_with(ob, data, commands);
            ob.on_collision_with(oa, &data.flipped(), commands);
        });
    }

    pub fn has_resolver(&self, a: O::Kind, b: O::Kind) -> bool {
        self.resolvers.iter().any(|e| e.pair == (a, b))
    }

    // --- Entity lifecycle (deferred) ---------------------------------------

    pub fn spawn(&mut self, object: O) -> EntityId {
        self.commands.spawn(object)
    }

    pub fn spawn_with_shape(&mut self, object: O, shape: CollisionShape) -> EntityId {
        self.commands.spawn_with_shape(object, shape)
    }

    pub fn attach_collider(&mut self, id: EntityId, shape: CollisionShape) {
        self.commands.attach_collider(id, shape);
    }

    pub fn remove_collider(&mut self, id: EntityId) {
        self.commands.remove_collider(id);
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.commands.despawn(id);
    }

    /// Apply queued spawns and removals. Called at the start of every [`step`](Self::step).
    pub fn apply_pending(&mut self) {
        for command in self.commands.take() {
            match command {
                Command::Spawn { id, object, shape } => {
                    let kind = object.kind();
                    self.objects.insert(id, object);
                    if let Some(shape) = shape {
                        self.components.insert(id, CollisionComponent { shape, kind });
                    }
                    tracing::debug!(?id, ?kind, "spawned");
                }
                Command::AttachCollider { id, shape } => {
                    let Some(object) = self.objects.get(id) else {
                        tracing::warn!(?id, "attach_collider on unknown entity");
                        continue;
                    };
                    let kind = object.kind();
                    self.drop_from_tree(id);
                    self.components.insert(id, CollisionComponent { shape, kind });
                }
                Command::RemoveCollider { id } => {
                    self.drop_from_tree(id);
                    self.components.erase(id);
                }
                Command::Despawn { id } => {
                    self.drop_from_tree(id);
                    self.components.erase(id);
                    if self.objects.erase(id).is_none() {
                        tracing::warn!(?id, "despawn of unknown entity");
                    } else {
                        tracing::debug!(?id, "despawned");
                    }
                }
            }
        }
    }

    fn drop_from_tree(&mut self, id: EntityId) {
        if let Some(comp) = self.components.get(id) {
            if let Some(tree) = self.trees.get_mut(&comp.kind) {
                tree.remove_object(id);
            }
        }
    }

    // --- Tick ----------------------------------------------------------------

    /// Run one tick: pending commands, event reset, shape sync, broad-phase upkeep, resolver sweep.
    pub fn step(&mut self) {
        self.apply_pending();
        self.events.clear();
        self.tick = self.tick.wrapping_add(1);
        self.stats = CollisionStats { components: self.components.len(), ..Default::default() };

        self.sync_shapes();
        self.update_broadphase();
        self.resolve_collisions();
    }

    /// Copy each owner's transform into its collision shape.
    fn sync_shapes(&mut self) {
        for (id, comp) in self.components.iter_mut() {
            if let Some(object) = self.objects.get(id) {
                comp.shape.sync_transform(object.position(), object.angle(), object.size());
            }
        }
    }

    /// Reinsert only the shapes that escaped their inflated broad-phase box.
    fn update_broadphase(&mut self) {
        for (id, comp) in self.components.iter() {
            let tight = comp.shape.bounding_box();
            let tree = self.trees.entry(comp.kind).or_insert_with(|| B::new(&self.cfg));
            match tree.object_rect(id) {
                Some(stored) if stored.contains(&tight) => {}
                Some(_) => {
                    tree.remove_object(id);
                    tree.add_rect(tight.inflate(self.cfg.box_margin), id);
                    self.stats.broadphase_reinserts += 1;
                    tracing::trace!(?id, "broad-phase reinsert");
                }
                None => {
                    tree.add_rect(tight.inflate(self.cfg.box_margin), id);
                    self.stats.broadphase_inserts += 1;
                }
            }
        }
    }

    fn resolve_collisions(&mut self) {
        for r in 0..self.resolvers.len() {
            let (kind_a, kind_b) = self.resolvers[r].pair;
            let candidates = match (self.trees.get(&kind_a), self.trees.get(&kind_b)) {
                (Some(ta), _) if kind_a == kind_b => ta.find_close_pairs_within(),
                (Some(ta), Some(tb)) => ta.find_close_pairs_with(tb),
                _ => continue,
            };
            self.stats.candidate_pairs += candidates.len();
            for (a, b) in candidates {
                self.narrow_phase(r, a, b);
            }
        }
        self.processed.clear();
    }

    fn narrow_phase(&mut self, resolver: usize, a: EntityId, b: EntityId) {
        let key = a.pair_key(b);
        if self.processed.contains(&key) {
            return;
        }
        assert_ne!(a, b, "entity {a:?} paired with itself");
        let fresh = self.processed.insert(key);
        assert!(fresh, "pair {key:?} processed twice");

        let (Some(ca), Some(cb)) = (self.components.get(a), self.components.get(b)) else {
            return;
        };
        let mut hit = None;
        'pairs: for pa in ca.shape.polygons() {
            for pb in cb.shape.polygons() {
                self.stats.narrow_tests += 1;
                let data = Narrowphase::get_collision_data(pa, pb);
                if data.collides() {
                    hit = Some(data);
                    break 'pairs;
                }
            }
        }
        let Some(data) = hit else {
            return;
        };
        self.stats.collisions += 1;

        if self.events.len() < self.cfg.max_events {
            self.events.push(CollisionEvent { a, b, data });
        } else {
            if self.stats.events_dropped == 0 {
                tracing::warn!(max = self.cfg.max_events, "collision event buffer full, dropping events");
            }
            self.stats.events_dropped += 1;
        }

        if let Some((oa, ob)) = self.objects.get_pair_mut(a, b) {
            (self.resolvers[resolver].callback)(oa, ob, &data, &mut self.commands);
        }
    }

    /// Hand out the events published by the last [`step`](Self::step).
    /// Undrained events are discarded when the next tick starts.
    pub fn drain_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Queries -------------------------------------------------------------

    /// Entities of the given kinds touching the circle, nearest first.
    pub fn nearest_in_radius(&self, center: Vec2, radius: f32, kinds: &[O::Kind]) -> Vec<EntityId> {
        let query = Aabb::from_center(center, Vec2::splat(radius));
        let mut found: Vec<(EntityId, f32)> = Vec::new();
        for kind in kinds {
            let Some(tree) = self.trees.get(kind) else {
                continue;
            };
            for id in tree.find_intersecting_leaves(query) {
                let Some(comp) = self.components.get(id) else {
                    continue;
                };
                let hit = comp
                    .shape
                    .polygons()
                    .iter()
                    .any(|p| Narrowphase::circle_overlaps(center, radius, p));
                if hit {
                    let pos = self.objects.get(id).map_or(comp.shape.bounding_box().center(), |o| o.position());
                    found.push((id, pos.distance_squared(center)));
                }
            }
        }
        found.sort_by(|x, y| x.1.total_cmp(&y.1));
        found.into_iter().map(|(id, _)| id).collect()
    }

    /// Entities of the given kinds overlapping `polygon` (placed by its own transform).
    pub fn intersecting(&self, polygon: &ConvexPolygon, kinds: &[O::Kind]) -> Vec<EntityId> {
        let query = polygon.bounding_box();
        let mut out = Vec::new();
        for kind in kinds {
            let Some(tree) = self.trees.get(kind) else {
                continue;
            };
            for id in tree.find_intersecting_leaves(query) {
                let Some(comp) = self.components.get(id) else {
                    continue;
                };
                if comp.shape.polygons().iter().any(|p| Narrowphase::overlaps(polygon, p)) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Closest hit along the ray within `max_len`; a miss reports the clamped end point.
    pub fn raycast(&self, origin: Vec2, dir: Vec2, max_len: f32, kinds: &[O::Kind]) -> RayHit {
        let Some(dir) = dir.try_normalize() else {
            return RayHit { point: origin, distance: 0.0, entity: None };
        };
        let end = origin + dir * max_len;
        let mut best = RayHit { point: end, distance: max_len, entity: None };

        for kind in kinds {
            let Some(tree) = self.trees.get(kind) else {
                continue;
            };
            for id in tree.ray_cast(origin, dir, max_len) {
                let Some(comp) = self.components.get(id) else {
                    continue;
                };
                for poly in comp.shape.polygons() {
                    if poly.is_circle() {
                        if let Some(h) = Narrowphase::line_segment_circle(origin, end, poly.position, poly.radius()) {
                            let distance = h.toi * max_len;
                            if distance < best.distance || (best.entity.is_none() && distance <= best.distance) {
                                best = RayHit { point: h.contact, distance, entity: Some(id) };
                            }
                        }
                        continue;
                    }
                    let pts = poly.points_in_world();
                    for i in 0..pts.len() {
                        let (p, q) = (pts[i], pts[(i + 1) % pts.len()]);
                        if let Some(h) = Narrowphase::line_segment_segment(origin, end, p, q) {
                            let distance = h.toi * max_len;
                            if distance < best.distance || (best.entity.is_none() && distance <= best.distance) {
                                best = RayHit { point: h.contact, distance, entity: Some(id) };
                            }
                        }
                    }
                }
            }
        }
        best
    }

    // --- Pairwise ------------------------------------------------------------

    /// First colliding sub-shape pair between two entities; no events, no resolvers.
    pub fn collision_between(&self, a: EntityId, b: EntityId) -> Result<CollisionData, CollisionError> {
        let ca = self.collider(a)?;
        let cb = self.collider(b)?;
        for pa in ca.shape.polygons() {
            for pb in cb.shape.polygons() {
                let data = Narrowphase::get_collision_data(pa, pb);
                if data.collides() {
                    return Ok(data);
                }
            }
        }
        Ok(CollisionData::NONE)
    }

    fn collider(&self, id: EntityId) -> Result<&CollisionComponent<O::Kind>, CollisionError> {
        if !self.objects.contains(id) {
            return Err(CollisionError::UnknownEntity(id));
        }
        self.components.get(id).ok_or(CollisionError::MissingCollider(id))
    }

    // --- Accessors -----------------------------------------------------------

    pub fn object(&self, id: EntityId) -> Option<&O> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: EntityId) -> Option<&mut O> {
        self.objects.get_mut(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (EntityId, &O)> {
        self.objects.iter()
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut O)> {
        self.objects.iter_mut()
    }

    pub fn component(&self, id: EntityId) -> Option<&CollisionComponent<O::Kind>> {
        self.components.get(id)
    }

    /// Broad-phase index for `kind`, if any entity of that kind has been inserted.
    pub fn broadphase(&self, kind: O::Kind) -> Option<&B> {
        self.trees.get(&kind)
    }

    pub fn commands(&mut self) -> &mut Commands<O> {
        &mut self.commands
    }

    /// Counters for the last completed tick.
    pub fn stats(&self) -> CollisionStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::bounce;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Kind {
        Wall,
        Player,
        Ball,
    }

    struct Body {
        kind: Kind,
        pos: Vec2,
        angle: f32,
        size: Vec2,
        vel: Vec2,
        hits: Vec<(Kind, Vec2)>,
    }

    impl Body {
        fn new(kind: Kind, x: f32, y: f32) -> Self {
            Self { kind, pos: Vec2::new(x, y), angle: 0.0, size: Vec2::splat(2.0), vel: Vec2::ZERO, hits: Vec::new() }
        }
    }

    impl GameObject for Body {
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
            self.vel
        }
        fn set_velocity(&mut self, velocity: Vec2) {
            self.vel = velocity;
        }

        fn on_collision_with(&mut self, other: &mut Self, data: &CollisionData, _commands: &mut Commands<Self>) {
            self.hits.push((other.kind, data.separation_axis));
        }
    }

    fn cfg() -> CollisionConfig {
        CollisionConfig { cell_size: 4.0, box_margin: 1.5, max_events: 16 }
    }

    fn square() -> CollisionShape {
        CollisionShape::single(ConvexPolygon::unit_square())
    }

    fn world() -> CollisionWorld<Body> {
        CollisionWorld::new(cfg())
    }

    #[test]
    fn test_spawn_is_deferred_until_step() {
        let mut w = world();
        let id = w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 0.0), square());
        assert!(w.object(id).is_none());
        assert_eq!(w.commands().pending(), 1);
        w.step();
        assert!(w.object(id).is_some());
        assert!(w.component(id).is_some());
        assert_eq!(w.broadphase(Kind::Ball).map(|t| t.len()), Some(1));
        assert_eq!(w.stats().broadphase_inserts, 1);
    }

    #[test]
    fn test_resolver_receives_registered_order() {
        let mut w = world();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        w.register_resolver(Kind::Wall, Kind::Player, move |a, b, data, _| {
            log.borrow_mut().push((a.kind, b.kind, data.separation_axis));
        });
        // Player spawned first so it is not accidentally "A" by insertion order.
        w.spawn_with_shape(Body::new(Kind::Player, 1.5, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        w.step();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!((seen[0].0, seen[0].1), (Kind::Wall, Kind::Player));
        // Axis points from the wall (A) toward the player (B).
        assert!((seen[0].2 - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_pair_dedup_across_registrations() {
        let mut w = world();
        let count = Rc::new(RefCell::new(0));
        let c1 = count.clone();
        let c2 = count.clone();
        w.register_resolver(Kind::Wall, Kind::Player, move |_, _, _, _| *c1.borrow_mut() += 1);
        w.register_resolver(Kind::Player, Kind::Wall, move |_, _, _, _| *c2.borrow_mut() += 1);
        w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Player, 1.5, 0.0), square());

        w.step();
        assert_eq!(*count.borrow(), 1);
        assert_eq!(w.drain_events().len(), 1);

        // Processed set is reset between ticks.
        w.step();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_multi_polygon_shape_yields_one_callback() {
        let mut w = world();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        w.register_resolver(Kind::Ball, Kind::Ball, move |_, _, _, _| *c.borrow_mut() += 1);
        let doubled = CollisionShape::new(vec![ConvexPolygon::unit_square(), ConvexPolygon::unit_square()]).unwrap();
        w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 0.0), doubled.clone());
        w.spawn_with_shape(Body::new(Kind::Ball, 1.0, 0.0), doubled);
        w.step();
        assert_eq!(*count.borrow(), 1);
        assert_eq!(w.stats().narrow_tests, 1);
    }

    #[test]
    fn test_default_resolver_double_dispatch() {
        let mut w = world();
        w.register_pair(Kind::Wall, Kind::Ball);
        let wall = w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        let ball = w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 1.5), square());
        w.step();

        let wall_hits = &w.object(wall).unwrap().hits;
        let ball_hits = &w.object(ball).unwrap().hits;
        assert_eq!(wall_hits.len(), 1);
        assert_eq!(ball_hits.len(), 1);
        assert_eq!(wall_hits[0].0, Kind::Ball);
        assert_eq!(ball_hits[0].0, Kind::Wall);
        // Each handler sees the axis pointing toward the other object.
        assert!((wall_hits[0].1 - Vec2::Y).length() < 1e-5);
        assert!((ball_hits[0].1 + Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn test_explicit_resolver_overrides_default() {
        let mut w = world();
        w.register_pair(Kind::Wall, Kind::Ball);
        w.register_resolver(Kind::Wall, Kind::Ball, |_, b, _, _| b.vel = Vec2::new(9.0, 9.0));
        let wall = w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        let ball = w.spawn_with_shape(Body::new(Kind::Ball, 1.0, 0.0), square());
        w.step();
        assert!(w.object(wall).unwrap().hits.is_empty());
        assert_eq!(w.object(ball).unwrap().vel, Vec2::new(9.0, 9.0));
    }

    #[test]
    fn test_unregistered_pair_is_ignored() {
        let mut w = world();
        w.register_pair(Kind::Wall, Kind::Ball);
        w.spawn_with_shape(Body::new(Kind::Player, 0.0, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Player, 1.0, 0.0), square());
        w.step();
        assert!(w.drain_events().is_empty());
        assert_eq!(w.stats().candidate_pairs, 0);
    }

    #[test]
    fn test_lazy_broadphase_reinsert() {
        let mut w = world();
        let id = w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 0.0), square());
        w.step();
        let stored = w.broadphase(Kind::Ball).and_then(|t| t.object_rect(id)).unwrap();

        w.object_mut(id).unwrap().pos = Vec2::new(1.0, 0.5);
        w.step();
        assert_eq!(w.stats().broadphase_reinserts, 0);
        assert_eq!(w.broadphase(Kind::Ball).and_then(|t| t.object_rect(id)), Some(stored));

        w.object_mut(id).unwrap().pos = Vec2::new(5.0, 0.0);
        w.step();
        assert_eq!(w.stats().broadphase_reinserts, 1);
        let moved = w.broadphase(Kind::Ball).and_then(|t| t.object_rect(id)).unwrap();
        assert!((moved.center() - Vec2::new(5.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_despawn_removes_from_broadphase() {
        let mut w = world();
        let id = w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 0.0), square());
        w.step();
        w.despawn(id);
        w.step();
        assert!(w.object(id).is_none());
        assert_eq!(w.broadphase(Kind::Ball).map(|t| t.len()), Some(0));
    }

    #[test]
    fn test_spawn_from_resolver_waits_for_next_tick() {
        let mut w = world();
        let spawned = Rc::new(RefCell::new(None));
        let slot = spawned.clone();
        w.register_resolver(Kind::Wall, Kind::Ball, move |_, _, _, commands| {
            if slot.borrow().is_none() {
                let id = commands.spawn_with_shape(Body::new(Kind::Player, 20.0, 0.0), square());
                *slot.borrow_mut() = Some(id);
            }
        });
        w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Ball, 1.0, 0.0), square());
        w.step();
        let id = spawned.borrow().unwrap();
        assert!(w.object(id).is_none());
        w.step();
        assert!(w.object(id).is_some());
    }

    #[test]
    fn test_bounce_from_handler_separates() {
        let mut w = world();
        w.register_resolver(Kind::Ball, Kind::Ball, |a, b, data, _| bounce(a, b, data));
        let a = w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 0.0), square());
        let b = w.spawn_with_shape(Body::new(Kind::Ball, 1.5, 0.0), square());
        w.apply_pending();
        w.object_mut(a).unwrap().vel = Vec2::X;
        w.step();
        let (pa, pb) = (w.object(a).unwrap(), w.object(b).unwrap());
        assert!((pb.pos.x - pa.pos.x - 2.0).abs() < 1e-4);
        assert!((pa.vel).length() < 1e-5);
        assert!((pb.vel - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_event_cap() {
        let mut w: CollisionWorld<Body> = CollisionWorld::new(CollisionConfig { max_events: 1, ..cfg() });
        w.register_resolver(Kind::Ball, Kind::Ball, |_, _, _, _| {});
        for i in 0..3 {
            w.spawn_with_shape(Body::new(Kind::Ball, i as f32 * 0.5, 0.0), square());
        }
        w.step();
        assert_eq!(w.stats().collisions, 3);
        assert_eq!(w.drain_events().len(), 1);
        assert_eq!(w.stats().events_dropped, 2);
        assert!(w.drain_events().is_empty());
    }

    #[test]
    fn test_undrained_events_do_not_eat_next_tick_quota() {
        let mut w: CollisionWorld<Body> = CollisionWorld::new(CollisionConfig { max_events: 1, ..cfg() });
        w.register_resolver(Kind::Ball, Kind::Ball, |_, _, _, _| {});
        let a = w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Ball, 1.5, 0.0), square());
        w.step();
        w.object_mut(a).unwrap().pos = Vec2::new(0.5, 0.0);
        w.step();

        assert_eq!(w.stats().collisions, 1);
        assert_eq!(w.stats().events_dropped, 0);
        let events = w.drain_events();
        assert_eq!(events.len(), 1);
        // Only this tick's contact: depth 1.0 after the move, not 0.5 from the first tick.
        assert!((events[0].data.minimum_translation - 1.0).abs() < 1e-5);
    }

    /// SAT reports an overlap, but the triangle's chosen incident edge lies below the
    /// square's reference face, so clipping fails and the pair counts as no contact.
    #[test]
    fn test_clip_failure_fires_nothing() {
        let mut w = world();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        w.register_resolver(Kind::Wall, Kind::Player, move |_, _, _, _| *c.borrow_mut() += 1);
        let triangle = ConvexPolygon::new(vec![Vec2::new(0.0, -1.0), Vec2::new(1.0, -2.5), Vec2::new(0.5, 0.5)]);
        let wall = w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        let player = w.spawn_with_shape(Body::new(Kind::Player, 0.0, 0.0), CollisionShape::single(triangle));
        w.step();

        assert_eq!(w.stats().narrow_tests, 1);
        assert_eq!(w.stats().collisions, 0);
        assert_eq!(*count.borrow(), 0);
        assert!(w.drain_events().is_empty());
        assert_eq!(w.collision_between(wall, player), Ok(CollisionData::NONE));
    }

    #[test]
    fn test_nearest_in_radius_sorted() {
        let mut w = world();
        let far = w.spawn_with_shape(Body::new(Kind::Ball, 4.0, 0.0), square());
        let near = w.spawn_with_shape(Body::new(Kind::Wall, 2.5, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Ball, 20.0, 0.0), square());
        w.step();
        assert_eq!(w.nearest_in_radius(Vec2::ZERO, 3.5, &[Kind::Ball, Kind::Wall]), vec![near, far]);
        assert_eq!(w.nearest_in_radius(Vec2::ZERO, 3.5, &[Kind::Ball]), vec![far]);
        assert!(w.nearest_in_radius(Vec2::ZERO, 1.0, &[Kind::Ball, Kind::Wall]).is_empty());
    }

    #[test]
    fn test_intersecting_query() {
        let mut w = world();
        let a = w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Wall, 6.0, 0.0), square());
        w.step();
        let probe = ConvexPolygon::rect(Vec2::new(1.5, 1.5), Vec2::splat(1.0));
        assert_eq!(w.intersecting(&probe, &[Kind::Wall]), vec![a]);
        // Box-level overlap but no polygon overlap: a diamond poking at a corner gap.
        let diamond = ConvexPolygon::unit_square().with_transform(Vec2::new(2.3, 2.3), std::f32::consts::FRAC_PI_4, Vec2::ONE);
        assert!(w.intersecting(&diamond, &[Kind::Wall]).is_empty());
    }

    #[test]
    fn test_raycast_closest_and_miss() {
        let mut w = world();
        let near = w.spawn_with_shape(Body::new(Kind::Wall, 5.0, 0.0), square());
        w.spawn_with_shape(Body::new(Kind::Wall, 10.0, 0.0), square());
        w.step();

        let hit = w.raycast(Vec2::ZERO, Vec2::new(2.0, 0.0), 50.0, &[Kind::Wall]);
        assert_eq!(hit.entity, Some(near));
        assert!((hit.distance - 4.0).abs() < 1e-4);
        assert!((hit.point - Vec2::new(4.0, 0.0)).length() < 1e-4);

        let miss = w.raycast(Vec2::ZERO, -Vec2::X, 7.0, &[Kind::Wall]);
        assert!(!miss.is_hit());
        assert!((miss.point - Vec2::new(-7.0, 0.0)).length() < 1e-5);
        assert_eq!(miss.distance, 7.0);

        let short = w.raycast(Vec2::ZERO, Vec2::X, 3.0, &[Kind::Wall]);
        assert!(!short.is_hit());
    }

    #[test]
    fn test_raycast_circle() {
        let mut w = world();
        let ball = w.spawn_with_shape(Body::new(Kind::Ball, 0.0, 5.0), CollisionShape::single(ConvexPolygon::circle()));
        w.step();
        let hit = w.raycast(Vec2::ZERO, Vec2::Y, 10.0, &[Kind::Ball]);
        assert_eq!(hit.entity, Some(ball));
        assert!((hit.distance - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_collision_between_errors() {
        let mut w = world();
        let a = w.spawn_with_shape(Body::new(Kind::Wall, 0.0, 0.0), square());
        let b = w.spawn(Body::new(Kind::Ball, 1.0, 0.0));
        w.step();
        assert_eq!(w.collision_between(a, b), Err(CollisionError::MissingCollider(b)));
        assert_eq!(w.collision_between(a, EntityId(99)), Err(CollisionError::UnknownEntity(EntityId(99))));

        w.attach_collider(b, square());
        w.step();
        let data = w.collision_between(a, b).unwrap();
        assert!((data.minimum_translation - 1.0).abs() < 1e-5);

        w.remove_collider(b);
        w.step();
        assert!(w.component(b).is_none());
        assert_eq!(w.broadphase(Kind::Ball).map(|t| t.len()), Some(0));
    }

    #[test]
    fn test_rotation_is_synced() {
        let mut w = world();
        let mut body = Body::new(Kind::Wall, 0.0, 0.0);
        body.size = Vec2::new(4.0, 2.0);
        body.angle = std::f32::consts::FRAC_PI_2;
        let id = w.spawn_with_shape(body, square());
        w.step();
        let bb = w.component(id).unwrap().shape.bounding_box();
        assert!((bb.max - Vec2::new(1.0, 2.0)).length() < 1e-5);
    }
}
