//! # Property Graph Model
//!
//! Plain DTOs exchanged with the storage backend. These types cross
//! every boundary: storage ↔ domain mapping ↔ analyses.
//!
//! This module is pure data. No I/O, no async.

pub mod node;
pub mod relationship;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId, Direction};
pub use value::Value;
pub use property_map::{PropertyMap, props};
