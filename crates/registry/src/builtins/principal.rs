use trellis_primitives::{Direction, Uuid, Value};

use super::{GROUP, GROUP_CONTAINS, PRINCIPAL};
use crate::definition::{FrameworkMethods, TraitDefinition, Views, framework_methods, views};
use crate::error::RegistryError;
use crate::facade::FacadeFactory;
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::method::{FrameworkMethod, GetProperty};
use crate::object::GraphObject;
use crate::runtime_trait::{VIEW_PUBLIC, VIEW_UI};

/// Principal facade: the fields permission resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
	pub id: Uuid,
	pub name: Option<String>,
	pub is_admin: bool,
	pub blocked: bool,
	/// Groups that directly contain this principal.
	pub parents: Vec<Uuid>,
}

impl Principal {
	fn from_object(object: &GraphObject<'_>) -> Result<Self, RegistryError> {
		let flag = |name: &str| -> Result<bool, RegistryError> {
			Ok(object.get(name)?.and_then(|v| v.as_bool()).unwrap_or(false))
		};
		Ok(Self {
			id: object.uuid(),
			name: object.get("name")?.and_then(|v| v.as_str().map(str::to_owned)),
			is_admin: flag("isAdmin")?,
			blocked: flag("blocked")?,
			parents: object
				.relationships(Direction::Incoming, Some(GROUP_CONTAINS))
				.iter()
				.map(|rel| rel.source)
				.collect(),
		})
	}
}

/// Users, groups and anything else that can be granted permissions.
pub struct PrincipalTrait;

impl TraitDefinition for PrincipalTrait {
	fn name(&self) -> &str {
		PRINCIPAL
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		vec![
			PropertyKey::boolean("isAdmin").indexed().with_default(false),
			PropertyKey::boolean("blocked").with_default(false),
			PropertyKey::string("eMail").indexed().unique(),
		]
	}

	fn views(&self) -> Views {
		views([
			(VIEW_PUBLIC, vec!["isAdmin"]),
			(VIEW_UI, vec!["isAdmin", "blocked", "eMail"]),
		])
	}

	fn node_facades(&self) -> Vec<FacadeFactory> {
		vec![FacadeFactory::of(Principal::from_object)]
	}
}

/// Principals containing other principals.
pub struct GroupTrait;

impl TraitDefinition for GroupTrait {
	fn name(&self) -> &str {
		GROUP
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		vec![PropertyKey::list("members").read_only()]
	}

	fn framework_methods(&self) -> FrameworkMethods {
		framework_methods([FrameworkMethod::from(GetProperty::new(|sup, object, key| {
			if key.name() != "members" {
				return sup.get_property(object, key);
			}
			let members: Vec<Value> = object
				.relationships(Direction::Outgoing, Some(GROUP_CONTAINS))
				.iter()
				.map(|rel| Value::Id(rel.target))
				.collect();
			Some(Value::List(members))
		}))])
	}

	fn views(&self) -> Views {
		views([(VIEW_UI, vec!["members"])])
	}
}
