use chrono::Utc;
use trellis_primitives::Value;

use super::GRAPH_OBJECT;
use crate::definition::{FrameworkMethods, LifecycleMethods, TraitDefinition, Views, framework_methods, views};
use crate::error::{ErrorBuffer, FrameworkError};
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;
use crate::method::{FrameworkMethod, IndexPassiveProperties, IsValid, LifecycleKind, LifecycleMethod, Super};
use crate::object::GraphObject;
use crate::runtime_trait::{VIEW_PUBLIC, VIEW_UI};

/// Identity, bookkeeping and visibility properties of every stored entity.
pub struct GraphObjectTrait;

impl TraitDefinition for GraphObjectTrait {
	fn name(&self) -> &str {
		GRAPH_OBJECT
	}

	fn create_property_keys(&self, _registry: &TraitsInstance) -> Vec<PropertyKey> {
		vec![
			PropertyKey::id("id").system().indexed().not_null(),
			PropertyKey::string("type").system().indexed().not_null(),
			PropertyKey::date("createdDate").system().indexed(),
			PropertyKey::date("lastModifiedDate").system().passively_indexed(),
			PropertyKey::id("createdBy").system().read_only(),
			PropertyKey::boolean("visibleToPublicUsers").indexed().with_default(false),
			PropertyKey::boolean("visibleToAuthenticatedUsers").indexed().with_default(false),
			PropertyKey::boolean("hidden").with_default(false),
		]
	}

	fn lifecycle_methods(&self) -> LifecycleMethods {
		[(
			LifecycleKind::OnCreation,
			LifecycleMethod::new("GraphObject.onCreation", on_creation),
		)]
		.into_iter()
		.collect()
	}

	fn framework_methods(&self) -> FrameworkMethods {
		framework_methods([
			FrameworkMethod::from(IsValid::new(is_valid)),
			FrameworkMethod::from(IndexPassiveProperties::new(index_passive_properties)),
		])
	}

	fn views(&self) -> Views {
		views([
			(VIEW_PUBLIC, vec!["id", "type"]),
			(
				VIEW_UI,
				vec![
					"id",
					"type",
					"createdDate",
					"lastModifiedDate",
					"createdBy",
					"visibleToPublicUsers",
					"visibleToAuthenticatedUsers",
					"hidden",
				],
			),
		])
	}
}

/// Stamps the creation date and, for authenticated callers, the creator.
fn on_creation(object: &GraphObject<'_>, _errors: &mut ErrorBuffer) -> Result<(), FrameworkError> {
	let created_date = object.key("createdDate")?;
	if object.get_property(&created_date).is_none() {
		object.unlock_system_properties_once();
		object.set_property_with(&created_date, Some(Value::Date(Utc::now())), true)?;
	}

	if let Some(user) = object.security().user() {
		let created_by = object.key("createdBy")?;
		object.unlock_system_properties_once();
		object.unlock_read_only_properties_once();
		object.set_property_with(&created_by, Some(Value::Id(user)), true)?;
	}
	Ok(())
}

fn is_valid(sup: Super<'_, IsValid>, object: &GraphObject<'_>, errors: &mut ErrorBuffer) -> bool {
	let mut valid = sup.is_valid(object, errors);
	for key in object.traits().all_property_keys() {
		if !key.is_not_null() {
			continue;
		}
		let present = object.get_property(key).is_some_and(|v| !v.is_blank());
		if !present {
			errors.add_property_error(object.type_name(), key.name(), "must_not_be_empty");
			valid = false;
		}
	}
	valid
}

fn index_passive_properties(
	sup: Super<'_, IndexPassiveProperties>,
	object: &GraphObject<'_>,
) -> Vec<(PropertyKey, Option<Value>)> {
	let mut values = sup.index_passive_properties(object);
	for key in object.traits().all_property_keys() {
		if key.is_passively_indexed() {
			values.push((key.clone(), object.get_property(key)));
		}
	}
	values
}
