use thiserror::Error;

use crate::types::EntityId;

/// Errors surfaced by constructors and pairwise queries.
///
/// Detection itself never fails: a miss is `CollisionData::NONE`.
#[derive(Debug, Error, PartialEq)]
pub enum CollisionError {
    #[error("collision shape needs at least one convex polygon")]
    EmptyShape,
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error("entity {0:?} has no collision component")]
    MissingCollider(EntityId),
}
