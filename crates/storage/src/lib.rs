//! Entity storage for skybook
//!
//! This crate implements the identity-keyed entity cache:
//! - Entity: Trait tying a value to its identity
//! - EntityCache: FxHashMap-backed cache with an identity index
//! - CacheDelta: Per-operation report of inserted/updated/removed entries
//!
//! The cache is a plain owned structure. Locking and change notification are
//! the engine's concern; every mutation here reports whether anything actually
//! changed so the engine can skip invalidation for no-op writes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod entity;

pub use cache::{CacheDelta, EntityCache};
pub use entity::Entity;
