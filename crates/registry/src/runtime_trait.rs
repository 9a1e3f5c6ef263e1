//! Resolved runtime traits.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

use crate::definition::TraitDefinition;
use crate::facade::FacadeFactory;
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::method::{
	AllowedBySchema, DynamicMethod, FrameworkKind, FrameworkMethod, FrameworkMethodKind, LifecycleKind,
	LifecycleMethod,
};
use crate::relation::Relation;
use crate::schema::{SchemaGrant, SchemaMethod, SchemaProperty};

/// View holding every property key of a trait.
pub const VIEW_ALL: &str = "all";
/// View holding dynamic keys plus `id`, `type` and `name`.
pub const VIEW_CUSTOM: &str = "custom";
pub const VIEW_PUBLIC: &str = "public";
pub const VIEW_UI: &str = "ui";

const CUSTOM_VIEW_BUILTINS: [&str; 3] = ["id", "type", "name"];

/// A trait materialized in one registry snapshot.
///
/// Built once from its definition and extended in place while the owning snapshot is still
/// being assembled. Published snapshots never mutate their traits; extending a published
/// schema works on a copy.
#[derive(Clone)]
pub struct Trait {
	name: Box<str>,
	label: Box<str>,
	registry: Box<str>,
	property_keys: IndexMap<Box<str>, PropertyKey>,
	lifecycle_methods: FxHashMap<LifecycleKind, Vec<LifecycleMethod>>,
	framework_methods: FxHashMap<FrameworkKind, FrameworkMethod>,
	dynamic_methods: IndexMap<Box<str>, DynamicMethod>,
	views: FxHashMap<Box<str>, IndexSet<Box<str>>>,
	node_facades: FxHashMap<TypeId, FacadeFactory>,
	relationship_facades: FxHashMap<TypeId, FacadeFactory>,
	relation: Option<Relation>,
}

impl Trait {
	pub fn new(definition: Arc<dyn TraitDefinition>, registry: &TraitsInstance) -> Self {
		let mut t = Self {
			name: definition.name().into(),
			label: definition.label().into(),
			registry: registry.name().into(),
			property_keys: IndexMap::new(),
			lifecycle_methods: FxHashMap::default(),
			framework_methods: FxHashMap::default(),
			dynamic_methods: IndexMap::new(),
			views: FxHashMap::default(),
			node_facades: FxHashMap::default(),
			relationship_facades: FxHashMap::default(),
			relation: None,
		};
		t.initialize_from(definition, registry);
		t
	}

	/// Merges everything `definition` contributes into this trait.
	///
	/// Keys, framework methods, dynamic methods, facades and the relation are last writer
	/// wins. Lifecycle handlers and view members accumulate.
	pub fn initialize_from(&mut self, definition: Arc<dyn TraitDefinition>, registry: &TraitsInstance) {
		for key in definition.create_property_keys(registry) {
			self.register_property_key(key);
		}

		for (kind, method) in definition.lifecycle_methods() {
			let method = method.declared_by(&self.name);
			self.lifecycle_methods.entry(kind).or_default().push(method);
		}

		self.framework_methods.extend(definition.framework_methods());

		for method in definition.dynamic_methods() {
			let method = method.declared_by(&self.name);
			self.dynamic_methods.insert(method.name().into(), method);
		}

		for (view, names) in definition.views() {
			self.views.entry(view).or_default().extend(names);
		}

		for factory in definition.node_facades() {
			self.node_facades.insert(factory.type_id(), factory);
		}
		for factory in definition.relationship_facades() {
			self.relationship_facades.insert(factory.type_id(), factory);
		}

		if let Some(relation) = definition.relation() {
			self.relation = Some(relation);
		}
	}

	/// Adds or replaces a key and files it under the implicit views.
	pub fn register_property_key(&mut self, key: PropertyKey) -> PropertyKey {
		let key = key.declared_by(&self.name);
		let name: Box<str> = key.name().into();

		self.views.entry(VIEW_ALL.into()).or_default().insert(name.clone());
		if key.is_dynamic() || CUSTOM_VIEW_BUILTINS.contains(&key.name()) {
			self.views.entry(VIEW_CUSTOM.into()).or_default().insert(name.clone());
		}

		self.property_keys.insert(name, key.clone());
		key
	}

	/// Adds a schema method, as a lifecycle handler if its name marks it as one.
	pub fn register_dynamic_method(&mut self, method: &SchemaMethod) {
		match method.lifecycle_kind() {
			Some(kind) => {
				let handler = method.to_lifecycle_method().declared_by(&self.name);
				self.lifecycle_methods.entry(kind).or_default().push(handler);
			}
			None => {
				let handler = method.to_dynamic_method().declared_by(&self.name);
				self.dynamic_methods.insert(method.name().into(), handler);
			}
		}
	}

	/// Adds a schema property. Returns `None` if its key cannot be built yet.
	pub fn register_dynamic_property(
		&mut self,
		property: &SchemaProperty,
		registry: &TraitsInstance,
	) -> Option<PropertyKey> {
		let Some(key) = property.create_key(registry) else {
			tracing::warn!(
				domain = "schema",
				trait_name = %self.name,
				property = property.name(),
				"schema property has no resolvable key yet"
			);
			return None;
		};

		let key = self.register_property_key(key);
		for view in property.views() {
			self.views.entry(view.clone()).or_default().insert(key.name().into());
		}
		Some(key)
	}

	/// Installs a schema grant as the trait's schema permission check.
	///
	/// The new check allows what the grant allows and otherwise defers to whatever this
	/// trait already had, or to the overridden implementation.
	pub fn register_schema_grant(&mut self, grant: SchemaGrant) {
		let previous = self
			.framework_methods
			.get(&FrameworkKind::AllowedBySchema)
			.and_then(AllowedBySchema::from_method)
			.cloned();

		let method = AllowedBySchema::new(move |sup, object, principal_ids, permission| {
			if grant.allows(principal_ids, permission) {
				return true;
			}
			match &previous {
				Some(previous) => previous.call(sup, object, principal_ids, permission),
				None => sup.allowed_by_schema(object, principal_ids, permission),
			}
		});
		self.framework_methods.insert(FrameworkKind::AllowedBySchema, method.into());
	}

	/// Copies this trait into another snapshot.
	pub fn create_copy(&self, registry_name: &str) -> Self {
		let mut copy = self.clone();
		copy.registry = registry_name.into();
		copy
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	/// Name of the snapshot this trait belongs to.
	pub fn registry_name(&self) -> &str {
		&self.registry
	}

	pub fn property_keys(&self) -> impl Iterator<Item = &PropertyKey> {
		self.property_keys.values()
	}

	pub fn key(&self, name: &str) -> Option<&PropertyKey> {
		self.property_keys.get(name)
	}

	pub fn lifecycle_methods(&self, kind: LifecycleKind) -> &[LifecycleMethod] {
		self.lifecycle_methods.get(&kind).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn framework_method<M: FrameworkMethodKind>(&self) -> Option<&M> {
		self.framework_methods.get(&M::KIND).and_then(M::from_method)
	}

	pub fn has_framework_method(&self, kind: FrameworkKind) -> bool {
		self.framework_methods.contains_key(&kind)
	}

	pub fn dynamic_method(&self, name: &str) -> Option<&DynamicMethod> {
		self.dynamic_methods.get(name)
	}

	pub fn view(&self, name: &str) -> Option<&IndexSet<Box<str>>> {
		self.views.get(name)
	}

	pub fn view_names(&self) -> impl Iterator<Item = &str> {
		self.views.keys().map(|v| &**v)
	}

	pub fn relation(&self) -> Option<&Relation> {
		self.relation.as_ref()
	}

	pub fn node_facade(&self, type_id: TypeId) -> Option<&FacadeFactory> {
		self.node_facades.get(&type_id)
	}

	pub fn relationship_facade(&self, type_id: TypeId) -> Option<&FacadeFactory> {
		self.relationship_facades.get(&type_id)
	}
}

impl fmt::Debug for Trait {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Trait")
			.field("name", &self.name)
			.field("registry", &self.registry)
			.field("keys", &self.property_keys.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}
