//! polycollide: 2D convex-polygon collision for entity-component game worlds
//! (per-kind broad phase, SAT narrow phase, resolver dispatch, impulse bounce)

pub mod types;
pub mod error;
pub mod api;
pub mod geometry;
pub mod narrowphase;
pub mod grid;
pub mod store;
pub mod commands;
pub mod resolution;
pub mod world;

pub use crate::types::*;
pub use crate::error::CollisionError;
pub use crate::api::*;
pub use crate::geometry::{CollisionShape, ConvexPolygon};
pub use crate::narrowphase::Narrowphase;
pub use crate::grid::GridIndex;
pub use crate::store::PackedArray;
pub use crate::commands::Commands;
pub use crate::resolution::bounce;
pub use crate::world::{CollisionComponent, CollisionWorld, Resolver};
