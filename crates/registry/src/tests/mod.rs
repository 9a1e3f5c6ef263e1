//! Composition, dispatch and snapshot tests.

mod composition;
mod dispatch;

use std::sync::Arc;

use crate::{
	BasicTraitDefinition, KeyFlags, PropertyType, SchemaProperty, TraitDefinition, TraitsInstance, TypeDeclaration,
	TypeFlags, builtins,
};

/// Registers a trait and a node type of the same name composed of `dependencies` and itself.
fn declare(instance: &mut TraitsInstance, definition: BasicTraitDefinition, dependencies: &[&str]) {
	let definition: Arc<dyn TraitDefinition> = Arc::new(definition);
	let name = definition.name().to_string();
	instance.register_trait(definition).unwrap();
	let names = dependencies.iter().map(|d| d.to_string()).chain([name.clone()]);
	instance
		.register_type(TypeDeclaration::new(name.as_str(), names, TypeFlags::NODE))
		.unwrap();
}

fn with_builtins() -> TraitsInstance {
	let mut instance = TraitsInstance::new("test");
	builtins::install(&mut instance).unwrap();
	instance
}

/// Builtins plus a schema-defined `Customer` with a read-only `code` and a required `title`.
fn customer_instance() -> TraitsInstance {
	let mut instance = with_builtins();
	instance.register_dynamic_node_type("Customer", &[], false).unwrap();
	instance
		.register_dynamic_property(
			"Customer",
			&SchemaProperty::new("code", PropertyType::String).with_flags(KeyFlags::READ_ONLY),
		)
		.unwrap();
	instance
		.register_dynamic_property(
			"Customer",
			&SchemaProperty::new("title", PropertyType::String).with_flags(KeyFlags::NOT_NULL),
		)
		.unwrap();
	instance
}
