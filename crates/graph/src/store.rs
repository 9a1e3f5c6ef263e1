use std::fmt;

use trellis_primitives::{Direction, Uuid, Value};

use crate::error::GraphError;

/// Whether an entity is a node or a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
	Node,
	Relationship,
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Node => f.write_str("node"),
			Self::Relationship => f.write_str("relationship"),
		}
	}
}

/// Identity of a stored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
	pub id: Uuid,
	pub kind: EntityKind,
	/// Name of the registered type the entity was created as.
	pub type_name: String,
}

/// A stored relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRecord {
	pub id: Uuid,
	/// Registered relationship type name, e.g. `"PrincipalOwnsNode"`.
	pub type_name: String,
	/// Storage-level relationship label, e.g. `"OWNS"`.
	pub rel_type: String,
	pub source: Uuid,
	pub target: Uuid,
}

impl RelationshipRecord {
	/// Returns the endpoint opposite to `node`.
	pub fn other_node(&self, node: Uuid) -> Uuid {
		if self.source == node { self.target } else { self.source }
	}

	/// Returns the direction in which `node` sees this relationship.
	pub fn direction_from(&self, node: Uuid) -> Direction {
		match (self.source == node, self.target == node) {
			(true, true) => Direction::Both,
			(true, false) => Direction::Outgoing,
			_ => Direction::Incoming,
		}
	}
}

/// Number of relationships of one type attached to a node in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDegree {
	/// Registered relationship type name.
	pub type_name: String,
	pub direction: Direction,
	pub count: usize,
}

/// Synchronous access to the backing graph.
///
/// Implementations must be safe to share between request threads. Results are never
/// cached by the engine beyond a single permission resolution.
pub trait GraphStore: Send + Sync {
	/// Returns the identity of the entity with the given id.
	fn entity(&self, id: Uuid) -> Option<EntityInfo>;

	/// Reads a raw property.
	fn get_property(&self, id: Uuid, key: &str) -> Option<Value>;

	/// Writes (or with `None`, removes) a raw property and returns the previous value.
	fn set_property(&self, id: Uuid, key: &str, value: Option<Value>) -> Result<Option<Value>, GraphError>;

	/// Returns the names of all properties stored on the entity.
	fn property_names(&self, id: Uuid) -> Vec<String>;

	/// Returns the relationship with the given id.
	fn relationship(&self, id: Uuid) -> Option<RelationshipRecord>;

	/// Returns relationships attached to `node`, optionally restricted to one registered type.
	///
	/// `Direction::Both` returns a self-relationship once.
	fn relationships(
		&self,
		node: Uuid,
		direction: Direction,
		type_name: Option<&str>,
	) -> Vec<RelationshipRecord>;

	/// Returns the relationship-type degree map of `node`.
	fn degree(&self, node: Uuid) -> Vec<RelationshipDegree>;
}
