use trellis_primitives::Value;

use super::PROPERTY_CONTAINER;
use crate::definition::{FrameworkMethods, TraitDefinition, framework_methods};
use crate::error::{ErrorBuffer, ErrorToken, FrameworkError};
use crate::key::PropertyKey;
use crate::method::{FrameworkMethod, GetProperty, SetProperty, Super};
use crate::object::GraphObject;

/// Storage-level property access shared by nodes and relationships.
pub struct PropertyContainerTrait;

impl TraitDefinition for PropertyContainerTrait {
	fn name(&self) -> &str {
		PROPERTY_CONTAINER
	}

	fn framework_methods(&self) -> FrameworkMethods {
		framework_methods([
			FrameworkMethod::from(GetProperty::new(|_, object, key| object.raw_get(key))),
			FrameworkMethod::from(SetProperty::new(set_property)),
		])
	}
}

fn set_property(
	_sup: Super<'_, SetProperty>,
	object: &GraphObject<'_>,
	key: &PropertyKey,
	value: Option<Value>,
	is_creation: bool,
) -> Result<(), FrameworkError> {
	let previous = object.get_property(key);
	if !is_creation && previous == value {
		return Ok(());
	}

	if let Some(v) = &value {
		if !key.value_type().accepts(v) {
			let mut errors = ErrorBuffer::new();
			errors.add(ErrorToken {
				type_name: object.type_name().to_string(),
				property: Some(key.name().to_string()),
				token: "invalid_property_value",
				detail: Some(format!("expected {:?}, got {}", key.value_type(), v.type_name())),
			});
			return Err(FrameworkError::Validation(errors));
		}
	}

	let read_only_unlocked = object.take_read_only_unlock();
	let system_unlocked = object.take_system_unlock();

	if key.is_read_only() && !read_only_unlocked && !object.security().is_superuser() {
		return Err(FrameworkError::ReadOnlyProperty {
			type_name: object.type_name().to_string(),
			key: key.name().to_string(),
		});
	}
	if key.is_system() && !system_unlocked {
		return Err(FrameworkError::SystemProperty {
			type_name: object.type_name().to_string(),
			key: key.name().to_string(),
		});
	}

	object.raw_set(key, value)
}
