use serde::{Deserialize, Serialize};

use crate::permission::{Permission, PermissionSet};

/// Direction of a relationship as seen from one of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
	/// The node is the source of the relationship.
	Outgoing,
	/// The node is the target of the relationship.
	Incoming,
	/// Either endpoint.
	Both,
}

impl Direction {
	/// Returns the opposite direction. `Both` is its own reverse.
	pub const fn reverse(self) -> Self {
		match self {
			Self::Outgoing => Self::Incoming,
			Self::Incoming => Self::Outgoing,
			Self::Both => Self::Both,
		}
	}
}

/// Multiplicity of one side of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
	/// At most one relationship on this side.
	One,
	/// Any number of relationships on this side.
	#[default]
	Many,
}

bitflags::bitflags! {
	/// Cascading behavior of a relation on create or delete.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct CascadeFlags: u8 {
		/// Cascade from the source node to the target node.
		const SOURCE_TO_TARGET = 1 << 0;
		/// Cascade from the target node to the source node.
		const TARGET_TO_SOURCE = 1 << 1;
		/// Cascade in both directions.
		const ALWAYS = Self::SOURCE_TO_TARGET.bits() | Self::TARGET_TO_SOURCE.bits();
		/// Cascade only when the remaining node would violate a constraint.
		const CONSTRAINT_BASED = 1 << 2;
	}
}

/// Direction in which a relationship propagates permissions.
///
/// `Out` means permissions flow from the source node to the target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PropagationDirection {
	/// The relationship does not propagate permissions.
	#[default]
	None,
	/// Source to target.
	Out,
	/// Target to source.
	In,
	/// Both ways.
	Both,
}

impl PropagationDirection {
	/// Returns true if permissions held on the other endpoint flow to a node that sees the
	/// relationship in `direction`.
	pub const fn flows_into(self, direction: Direction) -> bool {
		match (self, direction) {
			(Self::None, _) => false,
			(Self::Both, _) => true,
			(Self::Out, Direction::Incoming) => true,
			(Self::In, Direction::Outgoing) => true,
			_ => false,
		}
	}
}

/// Per-permission effect of a propagation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PropagationMode {
	/// Grants the permission from here on.
	Add,
	/// Passes the permission through unchanged.
	#[default]
	Keep,
	/// Strips the permission from here on.
	Remove,
}

/// Permission propagation settings of a relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PermissionPropagation {
	pub direction: PropagationDirection,
	pub read: PropagationMode,
	pub write: PropagationMode,
	pub delete: PropagationMode,
	pub access_control: PropagationMode,
}

impl PermissionPropagation {
	/// Propagation in `direction` that keeps every permission.
	pub const fn keep_all(direction: PropagationDirection) -> Self {
		Self {
			direction,
			read: PropagationMode::Keep,
			write: PropagationMode::Keep,
			delete: PropagationMode::Keep,
			access_control: PropagationMode::Keep,
		}
	}

	/// Returns true if the relationship propagates anything at all.
	pub const fn is_propagating(&self) -> bool {
		!matches!(self.direction, PropagationDirection::None)
	}

	/// Returns the mode configured for `permission`.
	pub const fn mode(&self, permission: Permission) -> PropagationMode {
		match permission {
			Permission::Read => self.read,
			Permission::Write => self.write,
			Permission::Delete => self.delete,
			Permission::AccessControl => self.access_control,
		}
	}

	/// Applies this step to the permission mask carried along a propagation path.
	pub fn apply(&self, mask: PermissionSet) -> PermissionSet {
		let mut next = mask;
		for permission in Permission::ALL {
			match self.mode(permission) {
				PropagationMode::Add => next.insert(permission.as_set()),
				PropagationMode::Keep => {}
				PropagationMode::Remove => next.remove(permission.as_set()),
			}
		}
		next
	}
}
