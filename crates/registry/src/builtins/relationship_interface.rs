use trellis_graph::{GraphError, RelationshipRecord};

use super::RELATIONSHIP_INTERFACE;
use crate::definition::{TraitDefinition, Views, views};
use crate::error::RegistryError;
use crate::facade::FacadeFactory;
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::runtime_trait::{VIEW_PUBLIC, VIEW_UI};

/// Endpoints and label of a stored relationship.
pub struct RelationshipInterfaceTrait;

impl TraitDefinition for RelationshipInterfaceTrait {
	fn name(&self) -> &str {
		RELATIONSHIP_INTERFACE
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		vec![
			PropertyKey::string("relType").system().read_only(),
			PropertyKey::id("sourceId").system().read_only().not_null(),
			PropertyKey::id("targetId").system().read_only().not_null(),
		]
	}

	fn views(&self) -> Views {
		views([
			(VIEW_PUBLIC, vec!["relType", "sourceId", "targetId"]),
			(VIEW_UI, vec!["relType", "sourceId", "targetId"]),
		])
	}

	fn relationship_facades(&self) -> Vec<FacadeFactory> {
		vec![FacadeFactory::of(|object| {
			object
				.store()
				.relationship(object.uuid())
				.ok_or(RegistryError::UnknownEntity(GraphError::NotFound { id: object.uuid() }))
		})]
	}
}
