use super::NODE_INTERFACE;
use crate::definition::{FrameworkMethods, TraitDefinition, Views, framework_methods, views};
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::method::{FrameworkMethod, GetRelationships};
use crate::runtime_trait::{VIEW_PUBLIC, VIEW_UI};

/// Named graph nodes.
pub struct NodeInterfaceTrait;

impl TraitDefinition for NodeInterfaceTrait {
	fn name(&self) -> &str {
		NODE_INTERFACE
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		vec![PropertyKey::string("name").indexed()]
	}

	fn framework_methods(&self) -> FrameworkMethods {
		// Grouped by relationship type, store order within a type.
		framework_methods([FrameworkMethod::from(GetRelationships::new(
			|sup, object, direction, type_name| {
				let mut rels = sup.relationships(object, direction, type_name);
				rels.sort_by(|a, b| a.type_name.cmp(&b.type_name));
				rels
			},
		))])
	}

	fn views(&self) -> Views {
		views([(VIEW_PUBLIC, vec!["name"]), (VIEW_UI, vec!["name"])])
	}
}
