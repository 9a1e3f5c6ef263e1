//! Declarative trait descriptors.

use rustc_hash::FxHashMap;

use crate::facade::FacadeFactory;
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::method::{DynamicMethod, FrameworkKind, FrameworkMethod, LifecycleKind, LifecycleMethod};
use crate::relation::Relation;

/// Lifecycle handlers contributed by one definition.
pub type LifecycleMethods = FxHashMap<LifecycleKind, LifecycleMethod>;

/// Framework methods contributed by one definition.
pub type FrameworkMethods = FxHashMap<FrameworkKind, FrameworkMethod>;

/// View name to property names.
pub type Views = FxHashMap<Box<str>, Vec<Box<str>>>;

/// Collects framework methods keyed by their kind.
pub fn framework_methods(methods: impl IntoIterator<Item = FrameworkMethod>) -> FrameworkMethods {
	methods.into_iter().map(|m| (m.kind(), m)).collect()
}

/// Builds a view map from string literals.
pub fn views<'a>(entries: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>) -> Views {
	entries
		.into_iter()
		.map(|(view, names)| (view.into(), names.into_iter().map(Box::<str>::from).collect()))
		.collect()
}

/// Stateless factory describing what a trait contributes to the types that include it.
///
/// One definition serves every type and every snapshot; anything that depends on the
/// snapshot receives it as a parameter.
pub trait TraitDefinition: Send + Sync {
	/// Registered trait name.
	fn name(&self) -> &str;

	/// Type label the trait contributes to. Defaults to the name.
	fn label(&self) -> &str {
		self.name()
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		Vec::new()
	}

	fn lifecycle_methods(&self) -> LifecycleMethods {
		LifecycleMethods::default()
	}

	fn framework_methods(&self) -> FrameworkMethods {
		FrameworkMethods::default()
	}

	fn dynamic_methods(&self) -> Vec<DynamicMethod> {
		Vec::new()
	}

	fn relation(&self) -> Option<Relation> {
		None
	}

	fn views(&self) -> Views {
		Views::default()
	}

	fn node_facades(&self) -> Vec<FacadeFactory> {
		Vec::new()
	}

	fn relationship_facades(&self) -> Vec<FacadeFactory> {
		Vec::new()
	}
}

/// Data-driven [`TraitDefinition`] for traits assembled at runtime.
#[derive(Clone, Default)]
pub struct BasicTraitDefinition {
	name: Box<str>,
	label: Option<Box<str>>,
	keys: Vec<PropertyKey>,
	lifecycle: LifecycleMethods,
	framework: FrameworkMethods,
	dynamic: Vec<DynamicMethod>,
	relation: Option<Relation>,
	views: Views,
	node_facades: Vec<FacadeFactory>,
	relationship_facades: Vec<FacadeFactory>,
}

impl BasicTraitDefinition {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn with_label(mut self, label: impl Into<Box<str>>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_key(mut self, key: PropertyKey) -> Self {
		self.keys.push(key);
		self
	}

	pub fn with_lifecycle(mut self, kind: LifecycleKind, method: LifecycleMethod) -> Self {
		self.lifecycle.insert(kind, method);
		self
	}

	pub fn with_framework_method(mut self, method: impl Into<FrameworkMethod>) -> Self {
		let method = method.into();
		self.framework.insert(method.kind(), method);
		self
	}

	pub fn with_dynamic_method(mut self, method: DynamicMethod) -> Self {
		self.dynamic.push(method);
		self
	}

	pub fn with_relation(mut self, relation: Relation) -> Self {
		self.relation = Some(relation);
		self
	}

	pub fn with_view(mut self, view: &str, names: &[&str]) -> Self {
		self.views
			.entry(view.into())
			.or_default()
			.extend(names.iter().map(|n| Box::<str>::from(*n)));
		self
	}

	pub fn with_node_facade(mut self, factory: FacadeFactory) -> Self {
		self.node_facades.push(factory);
		self
	}

	pub fn with_relationship_facade(mut self, factory: FacadeFactory) -> Self {
		self.relationship_facades.push(factory);
		self
	}
}

impl TraitDefinition for BasicTraitDefinition {
	fn name(&self) -> &str {
		&self.name
	}

	fn label(&self) -> &str {
		self.label.as_deref().unwrap_or(&*self.name)
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		self.keys.clone()
	}

	fn lifecycle_methods(&self) -> LifecycleMethods {
		self.lifecycle.clone()
	}

	fn framework_methods(&self) -> FrameworkMethods {
		self.framework.clone()
	}

	fn dynamic_methods(&self) -> Vec<DynamicMethod> {
		self.dynamic.clone()
	}

	fn relation(&self) -> Option<Relation> {
		self.relation.clone()
	}

	fn views(&self) -> Views {
		self.views.clone()
	}

	fn node_facades(&self) -> Vec<FacadeFactory> {
		self.node_facades.clone()
	}

	fn relationship_facades(&self) -> Vec<FacadeFactory> {
		self.relationship_facades.clone()
	}
}
