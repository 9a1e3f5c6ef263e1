//! Type composition: the resolved, cached view of a type's traits.
//!
//! A [`Traits`] value is built by [`TraitsInstance::traits_of`](crate::TraitsInstance::traits_of)
//! from a [`TypeDeclaration`] and is immutable apart from its lookup caches. Caches are filled
//! on first use and never invalidated; schema changes produce a new composition instead.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{ErrorBuffer, FrameworkError, RegistryError};
use crate::facade::FacadeFactory;
use crate::key::PropertyKey;
use crate::method::{DynamicMethod, FrameworkKind, FrameworkMethodKind, LifecycleKind, LifecycleMethod, MethodChain};
use crate::object::GraphObject;
use crate::relation::Relation;
use crate::runtime_trait::Trait;

bitflags::bitflags! {
	/// Kind and origin of a registered type.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct TypeFlags: u8 {
		const NODE = 1 << 0;
		const RELATIONSHIP = 1 << 1;
		/// Compiled into the root snapshot.
		const BUILTIN = 1 << 2;
		/// Defined by the runtime schema.
		const DYNAMIC = 1 << 3;
		/// Changes to objects of this type are written to a changelog.
		const CHANGELOG = 1 << 4;
	}
}

/// A registered type: its name and the traits it is declared to consist of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
	type_name: Box<str>,
	trait_names: IndexSet<Box<str>>,
	flags: TypeFlags,
}

impl TypeDeclaration {
	pub fn new<I, S>(type_name: impl Into<Box<str>>, trait_names: I, flags: TypeFlags) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Box<str>>,
	{
		Self {
			type_name: type_name.into(),
			trait_names: trait_names.into_iter().map(Into::into).collect(),
			flags,
		}
	}

	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	/// Declared trait names in declaration order.
	pub fn trait_names(&self) -> impl Iterator<Item = &str> {
		self.trait_names.iter().map(|n| &**n)
	}

	pub fn flags(&self) -> TypeFlags {
		self.flags
	}
}

#[derive(Default)]
struct Caches {
	keys: RwLock<FxHashMap<Box<str>, Option<PropertyKey>>>,
	all_keys: OnceLock<Vec<PropertyKey>>,
	views: RwLock<FxHashMap<Box<str>, Arc<[PropertyKey]>>>,
	framework: RwLock<FxHashMap<FrameworkKind, Option<Arc<dyn Any + Send + Sync>>>>,
	lifecycle: RwLock<FxHashMap<LifecycleKind, Arc<[LifecycleMethod]>>>,
	facades: RwLock<FxHashMap<TypeId, Option<usize>>>,
	dynamic: RwLock<FxHashMap<Box<str>, Option<DynamicMethod>>>,
	relation: OnceLock<Option<Relation>>,
}

/// A type resolved into its ordered traits.
///
/// Traits are in resolution order: every trait appears after the traits it depends on, and
/// for overrides the last one wins.
pub struct Traits {
	declaration: TypeDeclaration,
	traits: Vec<Arc<Trait>>,
	caches: Caches,
}

impl Traits {
	pub(crate) fn new(declaration: TypeDeclaration, traits: Vec<Arc<Trait>>) -> Self {
		Self {
			declaration,
			traits,
			caches: Caches::default(),
		}
	}

	pub fn type_name(&self) -> &str {
		self.declaration.type_name()
	}

	pub fn declaration(&self) -> &TypeDeclaration {
		&self.declaration
	}

	/// Traits the type is declared with, before resolution.
	pub fn trait_names(&self) -> impl Iterator<Item = &str> {
		self.declaration.trait_names()
	}

	/// Names of all traits in resolution order.
	pub fn resolved_trait_names(&self) -> Vec<&str> {
		self.traits.iter().map(|t| t.name()).collect()
	}

	pub fn traits(&self) -> &[Arc<Trait>] {
		&self.traits
	}

	/// Returns true if the type includes a trait with this name or label.
	pub fn contains(&self, trait_name: &str) -> bool {
		self.traits
			.iter()
			.any(|t| t.name() == trait_name || t.label() == trait_name)
	}

	pub fn flags(&self) -> TypeFlags {
		self.declaration.flags
	}

	pub fn is_node_type(&self) -> bool {
		self.flags().contains(TypeFlags::NODE)
	}

	pub fn is_relationship_type(&self) -> bool {
		self.flags().contains(TypeFlags::RELATIONSHIP)
	}

	pub fn is_builtin(&self) -> bool {
		self.flags().contains(TypeFlags::BUILTIN)
	}

	pub fn is_dynamic(&self) -> bool {
		self.flags().contains(TypeFlags::DYNAMIC)
	}

	pub fn has_changelog(&self) -> bool {
		self.flags().contains(TypeFlags::CHANGELOG)
	}

	/// Looks up the effective key: the declaration of the last trait that has one.
	pub fn key_opt(&self, name: &str) -> Option<PropertyKey> {
		if let Some(cached) = self.caches.keys.read().get(name) {
			return cached.clone();
		}
		let key = self.traits.iter().rev().find_map(|t| t.key(name)).cloned();
		self.caches.keys.write().insert(name.into(), key.clone());
		key
	}

	/// Like [`Traits::key_opt`], failing for a key the type does not have.
	pub fn key(&self, name: &str) -> Result<PropertyKey, RegistryError> {
		self.key_opt(name).ok_or_else(|| RegistryError::MissingKey {
			type_name: self.type_name().to_string(),
			key: name.to_string(),
		})
	}

	pub fn has_key(&self, name: &str) -> bool {
		self.key_opt(name).is_some()
	}

	/// Every key of the type, one per name.
	///
	/// A redeclared key replaces the earlier one and moves to the redeclaring trait's position.
	pub fn all_property_keys(&self) -> &[PropertyKey] {
		self.caches.all_keys.get_or_init(|| {
			let mut keys: IndexMap<&str, PropertyKey> = IndexMap::new();
			for t in &self.traits {
				for key in t.property_keys() {
					keys.shift_remove(key.name());
					keys.insert(key.name(), key.clone());
				}
			}
			keys.into_values().collect()
		})
	}

	/// Effective keys of a view, united over all traits. Unknown views are empty.
	pub fn property_keys_for_view(&self, view: &str) -> Arc<[PropertyKey]> {
		if let Some(cached) = self.caches.views.read().get(view) {
			return Arc::clone(cached);
		}

		let mut keys: IndexMap<&str, PropertyKey> = IndexMap::new();
		for t in &self.traits {
			for name in t.view(view).into_iter().flatten() {
				if keys.contains_key(&**name) {
					continue;
				}
				if let Some(key) = self.key_opt(name) {
					keys.insert(&**name, key);
				}
			}
		}
		let keys: Arc<[PropertyKey]> = keys.into_values().collect();
		self.caches.views.write().insert(view.into(), Arc::clone(&keys));
		keys
	}

	/// Names of all views any trait defines, sorted.
	pub fn view_names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.traits.iter().flat_map(|t| t.view_names()).collect();
		names.sort_unstable();
		names.dedup();
		names
	}

	/// Handlers for `kind` from every trait, in resolution order.
	pub fn lifecycle_methods(&self, kind: LifecycleKind) -> Arc<[LifecycleMethod]> {
		if let Some(cached) = self.caches.lifecycle.read().get(&kind) {
			return Arc::clone(cached);
		}
		let methods: Arc<[LifecycleMethod]> = self
			.traits
			.iter()
			.flat_map(|t| t.lifecycle_methods(kind).iter().cloned())
			.collect();
		self.caches.lifecycle.write().insert(kind, Arc::clone(&methods));
		methods
	}

	/// Runs every handler for `kind`, stopping at the first failure.
	pub fn invoke_lifecycle(
		&self,
		kind: LifecycleKind,
		object: &GraphObject<'_>,
		errors: &mut ErrorBuffer,
	) -> Result<(), FrameworkError> {
		for method in self.lifecycle_methods(kind).iter() {
			method.invoke(object, errors)?;
		}
		Ok(())
	}

	/// The winning implementation of a framework method, chained to the ones it overrides.
	pub fn method<M: FrameworkMethodKind>(&self) -> Option<Arc<MethodChain<M>>> {
		if let Some(cached) = self.caches.framework.read().get(&M::KIND) {
			return cached
				.clone()
				.and_then(|erased| erased.downcast::<MethodChain<M>>().ok());
		}

		let mut chain: Option<Arc<MethodChain<M>>> = None;
		for t in &self.traits {
			if let Some(method) = t.framework_method::<M>() {
				chain = Some(MethodChain::push(chain, t.name(), method.clone()));
			}
		}

		let erased = chain.clone().map(|c| c as Arc<dyn Any + Send + Sync>);
		self.caches.framework.write().insert(M::KIND, erased);
		chain
	}

	/// A schema method by name; the last trait defining it wins.
	pub fn dynamic_method(&self, name: &str) -> Option<DynamicMethod> {
		if let Some(cached) = self.caches.dynamic.read().get(name) {
			return cached.clone();
		}
		let method = self.traits.iter().rev().find_map(|t| t.dynamic_method(name)).cloned();
		self.caches.dynamic.write().insert(name.into(), method.clone());
		method
	}

	fn facade_factory<'t>(&self, t: &'t Trait, type_id: TypeId) -> Option<&'t FacadeFactory> {
		if self.is_relationship_type() {
			t.relationship_facade(type_id)
		} else {
			t.node_facade(type_id)
		}
	}

	/// Wraps `object` into facade `F`, built by the first trait in resolution order that
	/// provides one.
	pub fn facade<F: Any>(&self, object: &GraphObject<'_>) -> Result<F, RegistryError> {
		let type_id = TypeId::of::<F>();
		let cached = self.caches.facades.read().get(&type_id).copied();
		let index = match cached {
			Some(index) => index,
			None => {
				let index = self
					.traits
					.iter()
					.position(|t| self.facade_factory(t, type_id).is_some());
				self.caches.facades.write().insert(type_id, index);
				index
			}
		};

		let factory = index
			.and_then(|i| self.traits.get(i))
			.and_then(|t| self.facade_factory(t, type_id))
			.ok_or_else(|| RegistryError::NoFacade {
				type_name: self.type_name().to_string(),
				facade: std::any::type_name::<F>(),
			})?;
		factory.build::<F>(object)
	}

	/// Relationship shape of a relationship type; the first trait declaring one wins.
	pub fn relation(&self) -> Option<&Relation> {
		self.caches
			.relation
			.get_or_init(|| self.traits.iter().find_map(|t| t.relation()).cloned())
			.as_ref()
	}
}

impl fmt::Debug for Traits {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Traits")
			.field("type_name", &self.type_name())
			.field("traits", &self.resolved_trait_names())
			.finish()
	}
}
