use trellis_graph::{GraphError, GraphStore};
use trellis_primitives::{Cardinality, Permission, PermissionSet, Uuid};

use super::{GROUP, GROUP_CONTAINS, NODE_INTERFACE, PRINCIPAL, PRINCIPAL_OWNS_NODE, SECURITY};
use crate::definition::{TraitDefinition, Views, views};
use crate::error::RegistryError;
use crate::facade::FacadeFactory;
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::object::GraphObject;
use crate::relation::Relation;
use crate::runtime_trait::VIEW_UI;

/// `(:Principal)-[:OWNS]->(:NodeInterface)`
pub struct PrincipalOwnsNodeTrait;

impl TraitDefinition for PrincipalOwnsNodeTrait {
	fn name(&self) -> &str {
		PRINCIPAL_OWNS_NODE
	}

	fn relation(&self) -> Option<Relation> {
		Some(Relation::new("OWNS", PRINCIPAL, NODE_INTERFACE).with_cardinality(Cardinality::One, Cardinality::Many))
	}
}

/// Explicit grant of a principal on a node, as carried by a `SECURITY` relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGrant {
	pub principal: Uuid,
	pub node: Uuid,
	pub allowed: PermissionSet,
}

impl SecurityGrant {
	/// Reads a grant straight from the store.
	///
	/// Unknown permission names in `allowed` are ignored.
	pub fn load(store: &dyn GraphStore, relationship: Uuid) -> Result<Self, GraphError> {
		let rel = store
			.relationship(relationship)
			.ok_or(GraphError::NotFound { id: relationship })?;
		let allowed = store
			.get_property(relationship, "allowed")
			.and_then(|v| {
				v.as_list().map(|items| {
					items
						.iter()
						.filter_map(|item| item.as_str()?.parse::<Permission>().ok())
						.collect::<PermissionSet>()
				})
			})
			.unwrap_or_default();
		Ok(Self {
			principal: rel.source,
			node: rel.target,
			allowed,
		})
	}

	fn from_object(object: &GraphObject<'_>) -> Result<Self, RegistryError> {
		Ok(Self::load(object.store(), object.uuid())?)
	}
}

/// `(:Principal)-[:SECURITY {allowed}]->(:NodeInterface)`
pub struct SecurityTrait;

impl TraitDefinition for SecurityTrait {
	fn name(&self) -> &str {
		SECURITY
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		vec![PropertyKey::list("allowed")]
	}

	fn relation(&self) -> Option<Relation> {
		Some(Relation::new("SECURITY", PRINCIPAL, NODE_INTERFACE))
	}

	fn views(&self) -> Views {
		views([(VIEW_UI, vec!["allowed"])])
	}

	fn relationship_facades(&self) -> Vec<FacadeFactory> {
		vec![FacadeFactory::of(SecurityGrant::from_object)]
	}
}

/// `(:Group)-[:CONTAINS]->(:Principal)`
pub struct GroupContainsTrait;

impl TraitDefinition for GroupContainsTrait {
	fn name(&self) -> &str {
		GROUP_CONTAINS
	}

	fn relation(&self) -> Option<Relation> {
		Some(Relation::new("CONTAINS", GROUP, PRINCIPAL))
	}
}
