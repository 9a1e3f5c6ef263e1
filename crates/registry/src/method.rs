//! Lifecycle, framework and dynamic methods.
//!
//! Lifecycle methods fan out: every trait of a type contributes its handler and all of them
//! run. Framework methods have a single winner per type (the last trait in resolution order
//! that provides one), and each one receives a [`Super`] handle to the implementation it
//! overrides.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use trellis_graph::RelationshipRecord;
use trellis_primitives::{Direction, Permission, Uuid, Value};

use crate::error::{ErrorBuffer, FrameworkError};
use crate::key::PropertyKey;
use crate::object::GraphObject;

/// Callbacks fired around persistence events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
	OnCreation,
	OnModification,
	OnDeletion,
	AfterCreation,
	AfterModification,
	AfterDeletion,
	OwnerModified,
	SecurityModified,
	LocationModified,
	PropagatedModification,
}

impl LifecycleKind {
	pub const ALL: [LifecycleKind; 10] = [
		Self::OnCreation,
		Self::OnModification,
		Self::OnDeletion,
		Self::AfterCreation,
		Self::AfterModification,
		Self::AfterDeletion,
		Self::OwnerModified,
		Self::SecurityModified,
		Self::LocationModified,
		Self::PropagatedModification,
	];

	/// Maps a schema method name to the lifecycle event it hooks, if any.
	///
	/// `onCreate*`, `onSave*`, `onDelete*`, `afterCreate*`, `afterSave*` and `afterDelete*`
	/// are lifecycle handlers; everything else is a plain dynamic method.
	pub fn from_schema_method_name(name: &str) -> Option<Self> {
		const PREFIXES: [(&str, LifecycleKind); 6] = [
			("onCreate", LifecycleKind::OnCreation),
			("onSave", LifecycleKind::OnModification),
			("onDelete", LifecycleKind::OnDeletion),
			("afterCreate", LifecycleKind::AfterCreation),
			("afterSave", LifecycleKind::AfterModification),
			("afterDelete", LifecycleKind::AfterDeletion),
		];
		PREFIXES
			.iter()
			.find(|(prefix, _)| name.starts_with(prefix))
			.map(|(_, kind)| *kind)
	}
}

/// Signature of a lifecycle handler.
pub type LifecycleHandler =
	dyn Fn(&GraphObject<'_>, &mut ErrorBuffer) -> Result<(), FrameworkError> + Send + Sync;

/// One trait's handler for a lifecycle event.
#[derive(Clone)]
pub struct LifecycleMethod {
	name: Box<str>,
	declaring_trait: Option<Box<str>>,
	handler: Arc<LifecycleHandler>,
}

impl LifecycleMethod {
	pub fn new<F>(name: impl Into<Box<str>>, handler: F) -> Self
	where
		F: Fn(&GraphObject<'_>, &mut ErrorBuffer) -> Result<(), FrameworkError> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			declaring_trait: None,
			handler: Arc::new(handler),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn declaring_trait(&self) -> Option<&str> {
		self.declaring_trait.as_deref()
	}

	pub(crate) fn declared_by(mut self, trait_name: &str) -> Self {
		self.declaring_trait = Some(trait_name.into());
		self
	}

	pub fn invoke(&self, object: &GraphObject<'_>, errors: &mut ErrorBuffer) -> Result<(), FrameworkError> {
		(self.handler)(object, errors)
	}
}

impl fmt::Debug for LifecycleMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LifecycleMethod")
			.field("name", &self.name)
			.field("declaring_trait", &self.declaring_trait)
			.finish_non_exhaustive()
	}
}

/// Signature of a schema-defined method.
pub type DynamicHandler =
	dyn Fn(&GraphObject<'_>, &[Value]) -> Result<Option<Value>, FrameworkError> + Send + Sync;

/// A named method added at runtime by the schema.
#[derive(Clone)]
pub struct DynamicMethod {
	name: Box<str>,
	declaring_trait: Option<Box<str>>,
	handler: Arc<DynamicHandler>,
}

impl DynamicMethod {
	pub fn new<F>(name: impl Into<Box<str>>, handler: F) -> Self
	where
		F: Fn(&GraphObject<'_>, &[Value]) -> Result<Option<Value>, FrameworkError> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			declaring_trait: None,
			handler: Arc::new(handler),
		}
	}

	pub(crate) fn from_handler(name: &str, handler: Arc<DynamicHandler>) -> Self {
		Self {
			name: name.into(),
			declaring_trait: None,
			handler,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn declaring_trait(&self) -> Option<&str> {
		self.declaring_trait.as_deref()
	}

	pub(crate) fn declared_by(mut self, trait_name: &str) -> Self {
		self.declaring_trait = Some(trait_name.into());
		self
	}

	pub(crate) fn handler(&self) -> Arc<DynamicHandler> {
		Arc::clone(&self.handler)
	}

	pub fn invoke(&self, object: &GraphObject<'_>, args: &[Value]) -> Result<Option<Value>, FrameworkError> {
		(self.handler)(object, args)
	}
}

impl fmt::Debug for DynamicMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DynamicMethod")
			.field("name", &self.name)
			.field("declaring_trait", &self.declaring_trait)
			.finish_non_exhaustive()
	}
}

/// Overridable behaviors with a single winner per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkKind {
	IsValid,
	GetProperty,
	SetProperty,
	IndexPassiveProperties,
	AllowedBySchema,
	GetRelationships,
}

/// A framework method implementation linked to the one it overrides.
///
/// Chains are built bottom-up during type resolution, so the head is the implementation of
/// the last trait that provides one.
pub struct MethodChain<M> {
	declaring_trait: Box<str>,
	method: M,
	parent: Option<Arc<MethodChain<M>>>,
}

impl<M> MethodChain<M> {
	pub(crate) fn push(parent: Option<Arc<Self>>, declaring_trait: &str, method: M) -> Arc<Self> {
		Arc::new(Self {
			declaring_trait: declaring_trait.into(),
			method,
			parent,
		})
	}

	pub fn declaring_trait(&self) -> &str {
		&self.declaring_trait
	}

	pub fn method(&self) -> &M {
		&self.method
	}

	pub fn parent(&self) -> Option<&MethodChain<M>> {
		self.parent.as_deref()
	}

	/// Entry point that dispatches to this implementation.
	pub fn head(&self) -> Super<'_, M> {
		Super(Some(self))
	}

	/// Handle to the implementation this one overrides.
	pub fn sup(&self) -> Super<'_, M> {
		Super(self.parent.as_deref())
	}

	/// Returns the declaring traits from the winner down to the base implementation.
	pub fn declaring_traits(&self) -> Vec<&str> {
		let mut out = Vec::new();
		let mut current = Some(self);
		while let Some(link) = current {
			out.push(link.declaring_trait());
			current = link.parent();
		}
		out
	}
}

impl<M> fmt::Debug for MethodChain<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.declaring_traits()).finish()
	}
}

/// Handle to the next implementation down a framework method chain.
///
/// Calling through an empty handle falls back to the storage-level behavior.
pub struct Super<'a, M>(Option<&'a MethodChain<M>>);

impl<M> Clone for Super<'_, M> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<M> Copy for Super<'_, M> {}

impl<'a, M> Super<'a, M> {
	pub fn empty() -> Self {
		Super(None)
	}

	pub(crate) fn of(chain: Option<&'a MethodChain<M>>) -> Self {
		Super(chain)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_none()
	}

	pub fn chain(&self) -> Option<&'a MethodChain<M>> {
		self.0
	}

	pub fn declaring_trait(&self) -> Option<&'a str> {
		self.0.map(MethodChain::declaring_trait)
	}
}

/// Ties a framework method type to its [`FrameworkKind`] slot.
pub trait FrameworkMethodKind: Clone + Send + Sync + 'static {
	const KIND: FrameworkKind;

	fn from_method(method: &FrameworkMethod) -> Option<&Self>;
}

macro_rules! framework_methods {
	($(
		$(#[$meta:meta])*
		$name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;
	)*) => {
		$(
			$(#[$meta])*
			#[derive(Clone)]
			pub struct $name(Arc<dyn Fn(Super<'_, $name>, &GraphObject<'_> $(, $ty)*) -> $ret + Send + Sync>);

			impl $name {
				pub fn new<F>(f: F) -> Self
				where
					F: Fn(Super<'_, $name>, &GraphObject<'_> $(, $ty)*) -> $ret + Send + Sync + 'static,
				{
					Self(Arc::new(f))
				}

				pub fn call(&self, sup: Super<'_, $name>, object: &GraphObject<'_> $(, $arg: $ty)*) -> $ret {
					(self.0)(sup, object $(, $arg)*)
				}
			}

			impl FrameworkMethodKind for $name {
				const KIND: FrameworkKind = FrameworkKind::$name;

				fn from_method(method: &FrameworkMethod) -> Option<&Self> {
					match method {
						FrameworkMethod::$name(m) => Some(m),
						_ => None,
					}
				}
			}

			impl From<$name> for FrameworkMethod {
				fn from(method: $name) -> Self {
					FrameworkMethod::$name(method)
				}
			}
		)*

		/// One trait's implementation of a framework method.
		#[derive(Clone)]
		pub enum FrameworkMethod {
			$($name($name),)*
		}

		impl FrameworkMethod {
			pub fn kind(&self) -> FrameworkKind {
				match self {
					$(FrameworkMethod::$name(_) => FrameworkKind::$name,)*
				}
			}
		}
	};
}

framework_methods! {
	/// Validates an object, adding tokens to the buffer. Returns false if invalid.
	IsValid(errors: &mut ErrorBuffer) -> bool;
	/// Reads a property value.
	GetProperty(key: &PropertyKey) -> Option<Value>;
	/// Writes a property value; the flag is true while the object is being created.
	SetProperty(key: &PropertyKey, value: Option<Value>, is_creation: bool) -> Result<(), FrameworkError>;
	/// Computes values for passively indexed properties.
	IndexPassiveProperties() -> Vec<(PropertyKey, Option<Value>)>;
	/// Schema-based permission check against the principal's own and ancestor ids.
	AllowedBySchema(principal_ids: &FxHashSet<Uuid>, permission: Permission) -> bool;
	/// Lists attached relationships.
	GetRelationships(direction: Direction, type_name: Option<&str>) -> Vec<RelationshipRecord>;
}

impl fmt::Debug for FrameworkMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "FrameworkMethod::{:?}", self.kind())
	}
}

impl Super<'_, IsValid> {
	pub fn is_valid(self, object: &GraphObject<'_>, errors: &mut ErrorBuffer) -> bool {
		match self.0 {
			Some(link) => link.method.call(link.sup(), object, errors),
			None => true,
		}
	}
}

impl Super<'_, GetProperty> {
	pub fn get_property(self, object: &GraphObject<'_>, key: &PropertyKey) -> Option<Value> {
		match self.0 {
			Some(link) => link.method.call(link.sup(), object, key),
			None => object.raw_get(key),
		}
	}
}

impl Super<'_, SetProperty> {
	pub fn set_property(
		self,
		object: &GraphObject<'_>,
		key: &PropertyKey,
		value: Option<Value>,
		is_creation: bool,
	) -> Result<(), FrameworkError> {
		match self.0 {
			Some(link) => link.method.call(link.sup(), object, key, value, is_creation),
			None => object.raw_set(key, value),
		}
	}
}

impl Super<'_, IndexPassiveProperties> {
	pub fn index_passive_properties(self, object: &GraphObject<'_>) -> Vec<(PropertyKey, Option<Value>)> {
		match self.0 {
			Some(link) => link.method.call(link.sup(), object),
			None => Vec::new(),
		}
	}
}

impl Super<'_, AllowedBySchema> {
	pub fn allowed_by_schema(
		self,
		object: &GraphObject<'_>,
		principal_ids: &FxHashSet<Uuid>,
		permission: Permission,
	) -> bool {
		match self.0 {
			Some(link) => link.method.call(link.sup(), object, principal_ids, permission),
			None => false,
		}
	}
}

impl Super<'_, GetRelationships> {
	pub fn relationships(
		self,
		object: &GraphObject<'_>,
		direction: Direction,
		type_name: Option<&str>,
	) -> Vec<RelationshipRecord> {
		match self.0 {
			Some(link) => link.method.call(link.sup(), object, direction, type_name),
			None => object.raw_relationships(direction, type_name),
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("onCreateNotify", Some(LifecycleKind::OnCreation))]
	#[case("onSave", Some(LifecycleKind::OnModification))]
	#[case("onDeleteCleanup", Some(LifecycleKind::OnDeletion))]
	#[case("afterCreate", Some(LifecycleKind::AfterCreation))]
	#[case("afterSaveAudit", Some(LifecycleKind::AfterModification))]
	#[case("afterDelete", Some(LifecycleKind::AfterDeletion))]
	#[case("doSomething", None)]
	#[case("saveOn", None)]
	fn schema_method_names_map_to_lifecycle_events(
		#[case] name: &str,
		#[case] expected: Option<LifecycleKind>,
	) {
		assert_eq!(LifecycleKind::from_schema_method_name(name), expected);
	}

	#[test]
	fn chain_lists_declaring_traits_from_winner_down() {
		let base = MethodChain::push(None, "PropertyContainer", IsValid::new(|_, _, _| true));
		let mid = MethodChain::push(Some(base), "GraphObject", IsValid::new(|_, _, _| true));
		let top = MethodChain::push(Some(mid), "Customer", IsValid::new(|_, _, _| true));
		assert_eq!(top.declaring_traits(), vec!["Customer", "GraphObject", "PropertyContainer"]);
		assert_eq!(top.sup().declaring_trait(), Some("GraphObject"));
		assert!(Super::<IsValid>::empty().is_empty());
	}
}
