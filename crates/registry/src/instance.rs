//! Registry snapshots.
//!
//! A [`TraitsInstance`] is assembled with `&mut` access and then published behind an `Arc`.
//! Published snapshots are only read; schema changes are applied to a copy which replaces
//! the current snapshot as a whole (see [`Registry`](crate::Registry)).

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};
use trellis_graph::{Entity, TransactionContext};

use crate::composition::{Traits, TypeDeclaration, TypeFlags};
use crate::config::RegistryConfig;
use crate::definition::{BasicTraitDefinition, TraitDefinition};
use crate::error::RegistryError;
use crate::key::PropertyKey;
use crate::object::GraphObject;
use crate::relation::Relation;
use crate::runtime_trait::Trait;
use crate::schema::{SchemaGrant, SchemaMethod, SchemaProperty};

/// Traits every node type is composed of, in this order, before its own.
pub const NODE_BASE_TRAITS: [&str; 4] = [
	"PropertyContainer",
	"GraphObject",
	"NodeInterface",
	"AccessControllable",
];

/// Traits every relationship type is composed of, in this order, before its own.
pub const RELATIONSHIP_BASE_TRAITS: [&str; 3] = [
	"PropertyContainer",
	"GraphObject",
	"RelationshipInterface",
];

/// One complete, self-consistent set of traits and types.
pub struct TraitsInstance {
	name: Box<str>,
	strict_conflicts: bool,
	traits: FxHashMap<Box<str>, Arc<Trait>>,
	labels: FxHashMap<Box<str>, Box<str>>,
	types: IndexMap<Box<str>, TypeDeclaration>,
	resolved: RwLock<FxHashMap<Box<str>, Arc<Traits>>>,
}

impl TraitsInstance {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self::with_config(name, &RegistryConfig::default())
	}

	pub fn with_config(name: impl Into<Box<str>>, config: &RegistryConfig) -> Self {
		Self {
			name: name.into(),
			strict_conflicts: config.strict_property_conflicts,
			traits: FxHashMap::default(),
			labels: FxHashMap::default(),
			types: IndexMap::new(),
			resolved: RwLock::new(FxHashMap::default()),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Registers a trait built from `definition`.
	pub fn register_trait(&mut self, definition: Arc<dyn TraitDefinition>) -> Result<Arc<Trait>, RegistryError> {
		if self.traits.contains_key(definition.name()) {
			return Err(RegistryError::DuplicateTrait {
				name: definition.name().to_string(),
			});
		}
		let t = Arc::new(Trait::new(definition, self));
		self.insert_trait(Arc::clone(&t));
		Ok(t)
	}

	fn insert_trait(&mut self, t: Arc<Trait>) {
		if t.label() != t.name() {
			self.labels.insert(t.label().into(), t.name().into());
		}
		self.traits.insert(t.name().into(), t);
	}

	/// Registers the trait unless one with the same name exists, and returns its name.
	fn ensure_trait(&mut self, definition: Arc<dyn TraitDefinition>) -> Box<str> {
		let name: Box<str> = definition.name().into();
		if !self.traits.contains_key(&name) {
			let t = Arc::new(Trait::new(definition, self));
			self.insert_trait(t);
		}
		name
	}

	/// Registers a type declaration as is.
	pub fn register_type(&mut self, declaration: TypeDeclaration) -> Result<(), RegistryError> {
		if self.types.contains_key(declaration.type_name()) {
			return Err(RegistryError::DuplicateType {
				name: declaration.type_name().to_string(),
			});
		}
		self.types.insert(declaration.type_name().into(), declaration);
		Ok(())
	}

	/// Registers a builtin type consisting of a single trait.
	pub fn register_base_type(&mut self, definition: Arc<dyn TraitDefinition>) -> Result<(), RegistryError> {
		let name = self.ensure_trait(definition);
		self.register_type(TypeDeclaration::new(name.clone(), [name], TypeFlags::BUILTIN))
	}

	/// Registers a builtin node type: the node base traits followed by `definitions`.
	pub fn register_node_type(
		&mut self,
		type_name: &str,
		definitions: impl IntoIterator<Item = Arc<dyn TraitDefinition>>,
	) -> Result<(), RegistryError> {
		let names = self.compose(&NODE_BASE_TRAITS, definitions);
		self.register_type(TypeDeclaration::new(
			type_name,
			names,
			TypeFlags::NODE | TypeFlags::BUILTIN,
		))
	}

	/// Registers a builtin relationship type: the relationship base traits followed by
	/// `definitions`.
	pub fn register_relationship_type(
		&mut self,
		type_name: &str,
		definitions: impl IntoIterator<Item = Arc<dyn TraitDefinition>>,
	) -> Result<(), RegistryError> {
		let names = self.compose(&RELATIONSHIP_BASE_TRAITS, definitions);
		self.register_type(TypeDeclaration::new(
			type_name,
			names,
			TypeFlags::RELATIONSHIP | TypeFlags::BUILTIN,
		))
	}

	fn compose(
		&mut self,
		base: &[&str],
		definitions: impl IntoIterator<Item = Arc<dyn TraitDefinition>>,
	) -> IndexSet<Box<str>> {
		let mut names: IndexSet<Box<str>> = base.iter().map(|n| Box::<str>::from(*n)).collect();
		for definition in definitions {
			names.insert(self.ensure_trait(definition));
		}
		names
	}

	/// Registers a schema-defined node type.
	///
	/// The type gets its own, initially empty trait named after it; `inherited` names the
	/// types or traits it extends.
	pub fn register_dynamic_node_type(
		&mut self,
		type_name: &str,
		inherited: &[&str],
		changelog: bool,
	) -> Result<(), RegistryError> {
		let own: Arc<dyn TraitDefinition> = Arc::new(BasicTraitDefinition::new(type_name));
		self.register_dynamic_type(type_name, &NODE_BASE_TRAITS, inherited, own, TypeFlags::NODE, changelog)
	}

	/// Registers a schema-defined relationship type with the given relation.
	pub fn register_dynamic_relationship_type(
		&mut self,
		type_name: &str,
		relation: Relation,
		changelog: bool,
	) -> Result<(), RegistryError> {
		let own: Arc<dyn TraitDefinition> = Arc::new(BasicTraitDefinition::new(type_name).with_relation(relation));
		self.register_dynamic_type(
			type_name,
			&RELATIONSHIP_BASE_TRAITS,
			&[],
			own,
			TypeFlags::RELATIONSHIP,
			changelog,
		)
	}

	fn register_dynamic_type(
		&mut self,
		type_name: &str,
		base: &[&str],
		inherited: &[&str],
		own: Arc<dyn TraitDefinition>,
		kind: TypeFlags,
		changelog: bool,
	) -> Result<(), RegistryError> {
		let mut names: IndexSet<Box<str>> = base.iter().map(|n| Box::<str>::from(*n)).collect();
		names.extend(inherited.iter().map(|n| Box::<str>::from(*n)));
		names.insert(self.ensure_trait(own));

		let mut flags = kind | TypeFlags::DYNAMIC;
		if changelog {
			flags |= TypeFlags::CHANGELOG;
		}
		self.register_type(TypeDeclaration::new(type_name, names, flags))?;
		debug!(domain = "schema", type_name, "registered dynamic type");
		Ok(())
	}

	/// Adds a schema method to a trait.
	pub fn register_dynamic_method(&mut self, trait_name: &str, method: &SchemaMethod) -> Result<(), RegistryError> {
		self.extend_trait(trait_name, |t, _| t.register_dynamic_method(method))
	}

	/// Adds a schema property to a trait. Returns `Ok(None)` if the key cannot be built yet.
	pub fn register_dynamic_property(
		&mut self,
		trait_name: &str,
		property: &SchemaProperty,
	) -> Result<Option<PropertyKey>, RegistryError> {
		self.extend_trait(trait_name, |t, registry| t.register_dynamic_property(property, registry))
	}

	/// Adds a schema grant to a trait.
	pub fn register_schema_grant(&mut self, trait_name: &str, grant: SchemaGrant) -> Result<(), RegistryError> {
		self.extend_trait(trait_name, move |t, _| t.register_schema_grant(grant))
	}

	/// Mutates one trait and re-resolves the types that include it.
	///
	/// A property conflict in any of those types undoes the change.
	fn extend_trait<R>(
		&mut self,
		trait_name: &str,
		f: impl FnOnce(&mut Trait, &TraitsInstance) -> R,
	) -> Result<R, RegistryError> {
		let name = self.canonical_trait_name(trait_name);
		let Some(mut t) = self.traits.remove(&*name) else {
			return Err(RegistryError::UnknownTrait {
				type_name: trait_name.to_string(),
				trait_name: trait_name.to_string(),
			});
		};
		let previous = Arc::clone(&t);
		let result = f(Arc::make_mut(&mut t), self);
		self.traits.insert(name.clone(), t);

		let mut refreshed = Vec::new();
		for (type_name, declaration) in &self.types {
			if !self.resolve_trait_names(declaration.trait_names()).contains(&name) {
				continue;
			}
			match self.resolve(type_name) {
				Ok(traits) => refreshed.push((type_name.clone(), Arc::new(traits))),
				Err(err @ RegistryError::PropertyConflict { .. }) => {
					self.traits.insert(name, previous);
					return Err(err);
				}
				Err(_) => {}
			}
		}

		let resolved = self.resolved.get_mut();
		resolved.retain(|_, traits| !traits.contains(&name));
		resolved.extend(refreshed);
		debug!(domain = "schema", trait_name = %name, "extended trait");
		Ok(result)
	}

	fn canonical_trait_name(&self, name: &str) -> Box<str> {
		match self.labels.get(name) {
			Some(canonical) if !self.traits.contains_key(name) => canonical.clone(),
			_ => name.into(),
		}
	}

	/// Looks up a trait by name, falling back to its label.
	pub fn get_trait(&self, name: &str) -> Option<&Arc<Trait>> {
		self.traits
			.get(name)
			.or_else(|| self.labels.get(name).and_then(|n| self.traits.get(n)))
	}

	pub fn has_trait(&self, name: &str) -> bool {
		self.get_trait(name).is_some()
	}

	pub fn has_type(&self, type_name: &str) -> bool {
		self.types.contains_key(type_name)
	}

	/// Registered type names in registration order.
	pub fn type_names(&self) -> impl Iterator<Item = &str> {
		self.types.keys().map(|n| &**n)
	}

	pub fn type_declaration(&self, type_name: &str) -> Option<&TypeDeclaration> {
		self.types.get(type_name)
	}

	/// Returns the resolved composition of a type, resolving it on first use.
	pub fn traits_of(&self, type_name: &str) -> Result<Arc<Traits>, RegistryError> {
		if let Some(traits) = self.resolved.read().get(type_name) {
			return Ok(Arc::clone(traits));
		}

		let traits = Arc::new(self.resolve(type_name)?);
		let mut resolved = self.resolved.write();
		Ok(Arc::clone(resolved.entry(type_name.into()).or_insert(traits)))
	}

	/// Shorthand for `traits_of(type_name)?.key(name)`.
	pub fn key(&self, type_name: &str, name: &str) -> Result<PropertyKey, RegistryError> {
		self.traits_of(type_name)?.key(name)
	}

	/// Relation of a relationship type.
	pub fn relation_of(&self, type_name: &str) -> Result<Option<Relation>, RegistryError> {
		Ok(self.traits_of(type_name)?.relation().cloned())
	}

	/// Resolves every registered type, failing on the first broken one.
	pub fn resolve_all(&self) -> Result<(), RegistryError> {
		for type_name in self.types.keys() {
			self.traits_of(type_name)?;
		}
		Ok(())
	}

	/// Wraps a stored entity into a graph object of its registered type.
	pub fn object<'a>(
		&self,
		entity: Entity<'a>,
		tx: &'a dyn TransactionContext,
	) -> Result<GraphObject<'a>, RegistryError> {
		let info = entity.info()?;
		let traits = self.traits_of(&info.type_name)?;
		Ok(GraphObject::new(traits, entity, tx))
	}

	/// Deep copy under a new name. Resolved compositions are not carried over.
	pub fn create_copy(&self, name: impl Into<Box<str>>) -> Self {
		let name = name.into();
		let traits = self
			.traits
			.iter()
			.map(|(trait_name, t)| (trait_name.clone(), Arc::new(t.create_copy(&name))))
			.collect();
		Self {
			name,
			strict_conflicts: self.strict_conflicts,
			traits,
			labels: self.labels.clone(),
			types: self.types.clone(),
			resolved: RwLock::new(FxHashMap::default()),
		}
	}

	/// Flattens declared trait names into resolution order.
	///
	/// Each declared name is walked depth-first, dependencies before dependents, where a
	/// name's dependencies are the trait names of the type registered under it. The walks
	/// are concatenated and only the first occurrence of each name is kept.
	pub fn resolve_trait_names<'n>(&self, declared: impl IntoIterator<Item = &'n str>) -> Vec<Box<str>> {
		let mut order: IndexSet<Box<str>> = IndexSet::new();
		for name in declared {
			let mut seen = FxHashSet::default();
			let mut walk = Vec::new();
			self.walk(name, &mut seen, &mut walk);
			for resolved in walk {
				order.insert(resolved);
			}
		}
		order.into_iter().collect()
	}

	fn walk(&self, name: &str, seen: &mut FxHashSet<Box<str>>, out: &mut Vec<Box<str>>) {
		if !seen.insert(name.into()) {
			return;
		}
		if let Some(declaration) = self.types.get(name) {
			for dependency in declaration.trait_names() {
				self.walk(dependency, seen, out);
			}
		}
		out.push(name.into());
	}

	fn resolve(&self, type_name: &str) -> Result<Traits, RegistryError> {
		let declaration = self.types.get(type_name).ok_or_else(|| RegistryError::UnknownType {
			type_name: type_name.to_string(),
		})?;

		let names = self.resolve_trait_names(declaration.trait_names());
		let mut traits = Vec::with_capacity(names.len());
		for name in &names {
			let t = self.get_trait(name).ok_or_else(|| RegistryError::UnknownTrait {
				type_name: type_name.to_string(),
				trait_name: name.to_string(),
			})?;
			traits.push(Arc::clone(t));
		}

		if let Err(err) = self.check_property_conflicts(type_name, &traits) {
			if self.strict_conflicts {
				return Err(err);
			}
			warn!(domain = "registry", type_name, %err, "property conflict, last declaration wins");
		}

		debug!(domain = "registry", registry = %self.name, type_name, traits = traits.len(), "resolved type");
		Ok(Traits::new(declaration.clone(), traits))
	}

	/// Every concrete declaration of a key must come from a trait that the last concrete
	/// declarer depends on. Abstract declarations, wherever they sit, never conflict.
	fn check_property_conflicts(&self, type_name: &str, traits: &[Arc<Trait>]) -> Result<(), RegistryError> {
		let mut declarations: IndexMap<&str, Vec<(&PropertyKey, &str)>> = IndexMap::new();
		for t in traits {
			for key in t.property_keys() {
				declarations.entry(key.name()).or_default().push((key, t.name()));
			}
		}

		for (name, declared) in &declarations {
			let Some(last_concrete) = declared.iter().rposition(|(key, _)| !key.is_abstract()) else {
				continue;
			};
			let (_, winner_trait) = declared[last_concrete];
			let mut dependencies: Option<Vec<Box<str>>> = None;
			for (key, declarer) in &declared[..last_concrete] {
				if key.is_abstract() {
					continue;
				}
				let dependencies = dependencies.get_or_insert_with(|| self.resolve_trait_names([winner_trait]));
				if dependencies.iter().any(|d| &**d == *declarer) {
					continue;
				}
				return Err(RegistryError::PropertyConflict {
					type_name: type_name.to_string(),
					key: name.to_string(),
					existing: declarer.to_string(),
					incoming: winner_trait.to_string(),
				});
			}
		}
		Ok(())
	}
}

impl std::fmt::Debug for TraitsInstance {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TraitsInstance")
			.field("name", &self.name)
			.field("traits", &self.traits.len())
			.field("types", &self.types.len())
			.finish_non_exhaustive()
	}
}
