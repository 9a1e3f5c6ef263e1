//! Runtime schema extensions: methods, properties and grants added to existing traits.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use trellis_primitives::{Permission, PermissionSet, Uuid, Value};

use crate::error::FrameworkError;
use crate::instance::TraitsInstance;
use crate::key::{KeyFlags, PropertyKey, PropertyType};
use crate::method::{DynamicHandler, DynamicMethod, LifecycleKind, LifecycleMethod};
use crate::object::GraphObject;

/// A schema-defined method. Lifecycle-named methods become lifecycle handlers.
#[derive(Clone)]
pub struct SchemaMethod {
	name: Box<str>,
	handler: Arc<DynamicHandler>,
}

impl SchemaMethod {
	pub fn new<F>(name: impl Into<Box<str>>, handler: F) -> Self
	where
		F: Fn(&GraphObject<'_>, &[Value]) -> Result<Option<Value>, FrameworkError> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			handler: Arc::new(handler),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Lifecycle event this method hooks, derived from its name.
	pub fn lifecycle_kind(&self) -> Option<LifecycleKind> {
		LifecycleKind::from_schema_method_name(&self.name)
	}

	pub(crate) fn to_lifecycle_method(&self) -> LifecycleMethod {
		let handler = Arc::clone(&self.handler);
		LifecycleMethod::new(self.name.clone(), move |object, _errors| {
			handler(object, &[]).map(|_| ())
		})
	}

	pub(crate) fn to_dynamic_method(&self) -> DynamicMethod {
		DynamicMethod::from_handler(&self.name, Arc::clone(&self.handler))
	}
}

impl fmt::Debug for SchemaMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SchemaMethod").field("name", &self.name).finish_non_exhaustive()
	}
}

/// A schema-defined property.
#[derive(Debug, Clone)]
pub struct SchemaProperty {
	name: Box<str>,
	value_type: PropertyType,
	target_type: Option<Box<str>>,
	flags: KeyFlags,
	default: Option<Value>,
	views: Vec<Box<str>>,
}

impl SchemaProperty {
	pub fn new(name: impl Into<Box<str>>, value_type: PropertyType) -> Self {
		Self {
			name: name.into(),
			value_type,
			target_type: None,
			flags: KeyFlags::empty(),
			default: None,
			views: Vec::new(),
		}
	}

	pub fn reference(name: impl Into<Box<str>>, target_type: impl Into<Box<str>>) -> Self {
		let mut property = Self::new(name, PropertyType::Reference);
		property.target_type = Some(target_type.into());
		property
	}

	pub fn with_flags(mut self, flags: KeyFlags) -> Self {
		self.flags |= flags;
		self
	}

	pub fn with_default(mut self, value: impl Into<Value>) -> Self {
		self.default = Some(value.into());
		self
	}

	/// Adds the property to a named view.
	pub fn in_view(mut self, view: impl Into<Box<str>>) -> Self {
		self.views.push(view.into());
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn views(&self) -> &[Box<str>] {
		&self.views
	}

	/// Builds the property key, or `None` if a reference target is not registered yet.
	pub fn create_key(&self, registry: &TraitsInstance) -> Option<PropertyKey> {
		let key = match self.value_type {
			PropertyType::Reference => {
				let target = self.target_type.as_deref()?;
				if !registry.has_type(target) {
					return None;
				}
				PropertyKey::reference(self.name.clone(), target)
			}
			value_type => PropertyKey::new(self.name.clone(), value_type),
		};
		let key = key.with_flags(self.flags | KeyFlags::DYNAMIC);
		Some(match &self.default {
			Some(value) => key.with_default(value.clone()),
			None => key,
		})
	}
}

/// Schema-level grant: principals allowed each permission on every node of a type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaGrant {
	allowed: FxHashMap<Permission, FxHashSet<Uuid>>,
}

impl SchemaGrant {
	pub fn new() -> Self {
		Self::default()
	}

	/// Grant of `permissions` to one principal.
	pub fn for_principal(principal: Uuid, permissions: PermissionSet) -> Self {
		permissions
			.permissions()
			.fold(Self::new(), |grant, permission| grant.allow(permission, principal))
	}

	pub fn allow(mut self, permission: Permission, principal: Uuid) -> Self {
		self.allowed.entry(permission).or_default().insert(principal);
		self
	}

	/// Returns true if any of `principal_ids` is allowed `permission`.
	pub fn allows(&self, principal_ids: &FxHashSet<Uuid>, permission: Permission) -> bool {
		self.allowed
			.get(&permission)
			.is_some_and(|allowed| !allowed.is_disjoint(principal_ids))
	}
}
