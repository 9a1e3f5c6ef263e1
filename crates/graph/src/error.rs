use trellis_primitives::Uuid;

use crate::store::EntityKind;

/// Errors raised by a graph store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
	/// No entity with this id exists.
	#[error("entity not found: {id}")]
	NotFound { id: Uuid },

	/// The entity exists but is not of the expected kind.
	#[error("entity {id} is not a {expected}")]
	WrongKind { id: Uuid, expected: EntityKind },

	/// The store refused the operation.
	#[error("operation rejected: {reason}")]
	Rejected { reason: String },
}
