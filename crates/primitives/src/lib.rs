//! Leaf vocabulary for the trellis graph object mapper.
//!
//! Nothing in this crate knows about traits, types or storage. It only names the values
//! stored on graph entities, the permissions checked against them, and the shape of the
//! relationships between them.

pub mod permission;
pub mod relation;
pub mod value;

pub use permission::{Permission, PermissionSet, UnknownPermission};
pub use relation::{
	Cardinality, CascadeFlags, Direction, PermissionPropagation, PropagationDirection,
	PropagationMode,
};
pub use uuid::Uuid;
pub use value::Value;
