use crate::geometry::CollisionShape;
use crate::types::EntityId;

pub(crate) enum Command<O> {
    Spawn { id: EntityId, object: O, shape: Option<CollisionShape> },
    AttachCollider { id: EntityId, shape: CollisionShape },
    RemoveCollider { id: EntityId },
    Despawn { id: EntityId },
}

/// Deferred entity lifecycle changes.
///
/// Ids are handed out immediately, but nothing becomes visible to the
/// broad phase or to queries until the world applies the queue between ticks.
pub struct Commands<O> {
    next_id: u64,
    queue: Vec<Command<O>>,
}

impl<O> Default for Commands<O> {
    fn default() -> Self {
        Self { next_id: 0, queue: Vec::new() }
    }
}

impl<O> Commands<O> {
    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Queue an object without a collider.
    pub fn spawn(&mut self, object: O) -> EntityId {
        let id = self.allocate();
        self.queue.push(Command::Spawn { id, object, shape: None });
        id
    }

    /// Queue an object together with its collision shape.
    pub fn spawn_with_shape(&mut self, object: O, shape: CollisionShape) -> EntityId {
        let id = self.allocate();
        self.queue.push(Command::Spawn { id, object, shape: Some(shape) });
        id
    }

    pub fn attach_collider(&mut self, id: EntityId, shape: CollisionShape) {
        self.queue.push(Command::AttachCollider { id, shape });
    }

    pub fn remove_collider(&mut self, id: EntityId) {
        self.queue.push(Command::RemoveCollider { id });
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.queue.push(Command::Despawn { id });
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn take(&mut self) -> Vec<Command<O>> {
        std::mem::take(&mut self.queue)
    }
}
