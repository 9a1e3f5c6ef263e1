use trellis_primitives::{Cardinality, CascadeFlags, Direction, PermissionPropagation};

/// Shape of a relationship type: endpoints, cardinalities, cascading and propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
	relationship_type: Box<str>,
	source_type: Box<str>,
	target_type: Box<str>,
	source_cardinality: Cardinality,
	target_cardinality: Cardinality,
	cascading_delete: CascadeFlags,
	autocreate: CascadeFlags,
	propagation: PermissionPropagation,
}

impl Relation {
	/// Many-to-many relation that neither cascades nor propagates.
	pub fn new(
		relationship_type: impl Into<Box<str>>,
		source_type: impl Into<Box<str>>,
		target_type: impl Into<Box<str>>,
	) -> Self {
		Self {
			relationship_type: relationship_type.into(),
			source_type: source_type.into(),
			target_type: target_type.into(),
			source_cardinality: Cardinality::Many,
			target_cardinality: Cardinality::Many,
			cascading_delete: CascadeFlags::empty(),
			autocreate: CascadeFlags::empty(),
			propagation: PermissionPropagation::default(),
		}
	}

	pub fn with_cardinality(mut self, source: Cardinality, target: Cardinality) -> Self {
		self.source_cardinality = source;
		self.target_cardinality = target;
		self
	}

	pub fn with_cascading_delete(mut self, flags: CascadeFlags) -> Self {
		self.cascading_delete = flags;
		self
	}

	pub fn with_autocreate(mut self, flags: CascadeFlags) -> Self {
		self.autocreate = flags;
		self
	}

	pub fn with_propagation(mut self, propagation: PermissionPropagation) -> Self {
		self.propagation = propagation;
		self
	}

	/// Storage label, e.g. `"OWNS"`.
	pub fn relationship_type(&self) -> &str {
		&self.relationship_type
	}

	pub fn source_type(&self) -> &str {
		&self.source_type
	}

	pub fn target_type(&self) -> &str {
		&self.target_type
	}

	pub fn source_cardinality(&self) -> Cardinality {
		self.source_cardinality
	}

	pub fn target_cardinality(&self) -> Cardinality {
		self.target_cardinality
	}

	pub fn cascading_delete(&self) -> CascadeFlags {
		self.cascading_delete
	}

	pub fn autocreate(&self) -> CascadeFlags {
		self.autocreate
	}

	pub fn propagation(&self) -> &PermissionPropagation {
		&self.propagation
	}

	/// Direction in which a node of `type_name` sees this relationship.
	pub fn direction_for(&self, type_name: &str) -> Option<Direction> {
		match (&*self.source_type == type_name, &*self.target_type == type_name) {
			(true, true) => Some(Direction::Both),
			(true, false) => Some(Direction::Outgoing),
			(false, true) => Some(Direction::Incoming),
			(false, false) => None,
		}
	}
}
