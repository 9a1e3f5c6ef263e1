use trellis_primitives::{Uuid, Value};

use crate::error::GraphError;
use crate::store::{EntityInfo, GraphStore};

/// Generic key-value view of a node or relationship.
pub trait PropertyContainer {
	/// Returns the entity id.
	fn uuid(&self) -> Uuid;

	/// Reads a raw property.
	fn get(&self, key: &str) -> Option<Value>;

	/// Writes a raw property. `None` removes it.
	fn set(&self, key: &str, value: Option<Value>) -> Result<(), GraphError>;

	/// Returns true if the property is present.
	fn has(&self, key: &str) -> bool {
		self.get(key).is_some()
	}
}

/// A [`PropertyContainer`] backed by a [`GraphStore`].
#[derive(Clone, Copy)]
pub struct Entity<'g> {
	store: &'g dyn GraphStore,
	id: Uuid,
}

impl<'g> Entity<'g> {
	/// Creates a handle for an entity without checking it exists.
	pub fn new(store: &'g dyn GraphStore, id: Uuid) -> Self {
		Self { store, id }
	}

	/// Creates a handle for an existing entity.
	pub fn load(store: &'g dyn GraphStore, id: Uuid) -> Result<Self, GraphError> {
		match store.entity(id) {
			Some(_) => Ok(Self { store, id }),
			None => Err(GraphError::NotFound { id }),
		}
	}

	/// Returns the backing store.
	pub fn store(&self) -> &'g dyn GraphStore {
		self.store
	}

	/// Returns the stored identity of this entity.
	pub fn info(&self) -> Result<EntityInfo, GraphError> {
		self.store.entity(self.id).ok_or(GraphError::NotFound { id: self.id })
	}
}

impl std::fmt::Debug for Entity<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Entity").field(&self.id).finish()
	}
}

impl PropertyContainer for Entity<'_> {
	fn uuid(&self) -> Uuid {
		self.id
	}

	fn get(&self, key: &str) -> Option<Value> {
		self.store.get_property(self.id, key)
	}

	fn set(&self, key: &str, value: Option<Value>) -> Result<(), GraphError> {
		self.store.set_property(self.id, key, value).map(|_| ())
	}
}
