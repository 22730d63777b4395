//! Lock-free copy-on-write map with atomic snapshot publication.
//!
//! * [`CowMap`]: concurrent key/value map for read-heavy, write-rare registries.
//! * [`Snapshot`]: pinned immutable view of one published map state.
//! * [`Attributes`]: typed attribute store layered on [`CowMap`].

#![warn(missing_docs)]

pub mod attributes;
pub mod map;

pub use attributes::{AttributeKey, Attributes};
pub use map::{CowMap, Snapshot};
