//! Graph objects: a stored entity seen through its type's traits.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashSet;
use trellis_graph::{
	Entity, GraphError, GraphStore, PropertyChange, PropertyContainer, RelationshipRecord, SecurityContext,
	TransactionContext,
};
use trellis_primitives::{Direction, Permission, Uuid, Value};

use crate::composition::Traits;
use crate::error::{ErrorBuffer, FrameworkError, RegistryError};
use crate::key::PropertyKey;
use crate::method::{
	AllowedBySchema, GetProperty, GetRelationships, IndexPassiveProperties, IsValid, LifecycleKind, SetProperty,
	Super,
};

static READ_ONLY_SECURITY: LazyLock<SecurityContext> = LazyLock::new(SecurityContext::anonymous);

/// Context of objects opened outside a transaction.
struct ReadOnlyContext;

impl TransactionContext for ReadOnlyContext {
	fn security(&self) -> &SecurityContext {
		&READ_ONLY_SECURITY
	}

	fn record_change(&self, _change: PropertyChange) {}
}

static READ_ONLY: ReadOnlyContext = ReadOnlyContext;

/// A node or relationship bound to its resolved type and the current transaction.
///
/// Property access, validation and lifecycle callbacks all dispatch through the type's
/// [`Traits`]. Objects are cheap and short-lived; create one per entity per operation.
pub struct GraphObject<'a> {
	traits: Arc<Traits>,
	entity: Entity<'a>,
	tx: &'a dyn TransactionContext,
	read_only: bool,
	system_unlocked: Cell<bool>,
	read_only_unlocked: Cell<bool>,
}

impl<'a> GraphObject<'a> {
	pub fn new(traits: Arc<Traits>, entity: Entity<'a>, tx: &'a dyn TransactionContext) -> Self {
		Self {
			traits,
			entity,
			tx,
			read_only: false,
			system_unlocked: Cell::new(false),
			read_only_unlocked: Cell::new(false),
		}
	}

	/// Opens an object for reading only. Writes are rejected.
	pub fn read_only(traits: Arc<Traits>, entity: Entity<'a>) -> Self {
		Self {
			read_only: true,
			..Self::new(traits, entity, &READ_ONLY)
		}
	}

	pub fn uuid(&self) -> Uuid {
		self.entity.uuid()
	}

	pub fn type_name(&self) -> &str {
		self.traits.type_name()
	}

	pub fn traits(&self) -> &Arc<Traits> {
		&self.traits
	}

	pub fn entity(&self) -> Entity<'a> {
		self.entity
	}

	pub fn store(&self) -> &'a dyn GraphStore {
		self.entity.store()
	}

	pub fn tx(&self) -> &'a dyn TransactionContext {
		self.tx
	}

	pub fn security(&self) -> &'a SecurityContext {
		self.tx.security()
	}

	pub fn key(&self, name: &str) -> Result<PropertyKey, RegistryError> {
		self.traits.key(name)
	}

	pub fn get_property(&self, key: &PropertyKey) -> Option<Value> {
		let chain = self.traits.method::<GetProperty>();
		Super::of(chain.as_deref()).get_property(self, key)
	}

	/// Reads a property by name.
	pub fn get(&self, name: &str) -> Result<Option<Value>, RegistryError> {
		Ok(self.get_property(&self.key(name)?))
	}

	pub fn set_property(&self, key: &PropertyKey, value: Option<Value>) -> Result<(), FrameworkError> {
		self.set_property_with(key, value, false)
	}

	/// Writes a property; `is_creation` forces the write even if the value is unchanged.
	pub fn set_property_with(
		&self,
		key: &PropertyKey,
		value: Option<Value>,
		is_creation: bool,
	) -> Result<(), FrameworkError> {
		if self.read_only {
			return Err(GraphError::Rejected {
				reason: format!("{} {} was opened read-only", self.type_name(), self.uuid()),
			}
			.into());
		}
		let chain = self.traits.method::<SetProperty>();
		Super::of(chain.as_deref()).set_property(self, key, value, is_creation)
	}

	/// Writes a property by name.
	pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), FrameworkError> {
		let key = self.key(name)?;
		self.set_property(&key, Some(value.into()))
	}

	pub fn is_valid(&self, errors: &mut ErrorBuffer) -> bool {
		let chain = self.traits.method::<IsValid>();
		Super::of(chain.as_deref()).is_valid(self, errors)
	}

	pub fn index_passive_properties(&self) -> Vec<(PropertyKey, Option<Value>)> {
		let chain = self.traits.method::<IndexPassiveProperties>();
		Super::of(chain.as_deref()).index_passive_properties(self)
	}

	pub fn relationships(&self, direction: Direction, type_name: Option<&str>) -> Vec<RelationshipRecord> {
		let chain = self.traits.method::<GetRelationships>();
		Super::of(chain.as_deref()).relationships(self, direction, type_name)
	}

	pub fn allowed_by_schema(&self, principal_ids: &FxHashSet<Uuid>, permission: Permission) -> bool {
		let chain = self.traits.method::<AllowedBySchema>();
		Super::of(chain.as_deref()).allowed_by_schema(self, principal_ids, permission)
	}

	pub fn invoke_lifecycle(&self, kind: LifecycleKind, errors: &mut ErrorBuffer) -> Result<(), FrameworkError> {
		self.traits.invoke_lifecycle(kind, self, errors)
	}

	/// Calls a schema method by name.
	pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Option<Value>, FrameworkError> {
		match self.traits.dynamic_method(name) {
			Some(method) => method.invoke(self, args),
			None => Err(FrameworkError::handler(format!(
				"type {} has no method {name}",
				self.type_name()
			))),
		}
	}

	/// Wraps this object into facade `F`.
	pub fn facade<F: Any>(&self) -> Result<F, RegistryError> {
		self.traits.facade::<F>(self)
	}

	/// Allows the next write to a system property.
	pub fn unlock_system_properties_once(&self) {
		self.system_unlocked.set(true);
	}

	/// Allows the next write to a read-only property.
	pub fn unlock_read_only_properties_once(&self) {
		self.read_only_unlocked.set(true);
	}

	/// Consumes the system property unlock.
	pub fn take_system_unlock(&self) -> bool {
		self.system_unlocked.replace(false)
	}

	/// Consumes the read-only property unlock.
	pub fn take_read_only_unlock(&self) -> bool {
		self.read_only_unlocked.replace(false)
	}

	/// Stored value of `key`, or its default.
	pub fn raw_get(&self, key: &PropertyKey) -> Option<Value> {
		self.entity
			.get(key.db_name())
			.or_else(|| key.default_value().cloned())
	}

	/// Writes the stored value of `key` and records the change.
	pub fn raw_set(&self, key: &PropertyKey, value: Option<Value>) -> Result<(), FrameworkError> {
		let previous = self.store().set_property(self.uuid(), key.db_name(), value.clone())?;
		self.tx.record_change(PropertyChange {
			entity: self.uuid(),
			key: key.name().to_string(),
			previous,
			current: value,
		});
		Ok(())
	}

	/// Stored relationships attached to this object.
	pub fn raw_relationships(&self, direction: Direction, type_name: Option<&str>) -> Vec<RelationshipRecord> {
		self.store().relationships(self.uuid(), direction, type_name)
	}
}

impl fmt::Debug for GraphObject<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GraphObject")
			.field("type", &self.type_name())
			.field("id", &self.uuid())
			.finish_non_exhaustive()
	}
}
