use trellis_primitives::{Direction, Value};

use super::{ACCESS_CONTROLLABLE, PRINCIPAL, PRINCIPAL_OWNS_NODE, SECURITY};
use crate::definition::{FrameworkMethods, TraitDefinition, Views, framework_methods, views};
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::method::{AllowedBySchema, FrameworkMethod, GetProperty, Super};
use crate::object::GraphObject;
use crate::runtime_trait::VIEW_UI;

/// Ownership and explicit grants of a node.
///
/// `owner` and `grantees` are derived from the node's incoming `OWNS` and `SECURITY`
/// relationships rather than stored.
pub struct AccessControllableTrait;

impl TraitDefinition for AccessControllableTrait {
	fn name(&self) -> &str {
		ACCESS_CONTROLLABLE
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		vec![
			PropertyKey::reference("owner", PRINCIPAL).read_only(),
			PropertyKey::list("grantees").read_only(),
		]
	}

	fn framework_methods(&self) -> FrameworkMethods {
		framework_methods([
			FrameworkMethod::from(GetProperty::new(get_property)),
			FrameworkMethod::from(AllowedBySchema::new(|_, _, _, _| false)),
		])
	}

	fn views(&self) -> Views {
		views([(VIEW_UI, vec!["owner", "grantees"])])
	}
}

fn get_property(sup: Super<'_, GetProperty>, object: &GraphObject<'_>, key: &PropertyKey) -> Option<Value> {
	match key.name() {
		"owner" => object
			.relationships(Direction::Incoming, Some(PRINCIPAL_OWNS_NODE))
			.first()
			.map(|rel| Value::Id(rel.source)),
		"grantees" => {
			let grantees: Vec<Value> = object
				.relationships(Direction::Incoming, Some(SECURITY))
				.iter()
				.map(|rel| Value::Id(rel.source))
				.collect();
			Some(Value::List(grantees))
		}
		_ => sup.get_property(object, key),
	}
}
