//! Traits and types compiled into every root snapshot.

mod access_controllable;
mod graph_object;
mod node_interface;
mod principal;
mod property_container;
mod relationship_interface;
mod relationships;

use std::sync::Arc;

pub use access_controllable::AccessControllableTrait;
pub use graph_object::GraphObjectTrait;
pub use node_interface::NodeInterfaceTrait;
pub use principal::{GroupTrait, Principal, PrincipalTrait};
pub use property_container::PropertyContainerTrait;
pub use relationship_interface::RelationshipInterfaceTrait;
pub use relationships::{GroupContainsTrait, PrincipalOwnsNodeTrait, SecurityGrant, SecurityTrait};

use crate::composition::{TypeDeclaration, TypeFlags};
use crate::definition::TraitDefinition;
use crate::error::RegistryError;
use crate::instance::TraitsInstance;

pub const PROPERTY_CONTAINER: &str = "PropertyContainer";
pub const GRAPH_OBJECT: &str = "GraphObject";
pub const NODE_INTERFACE: &str = "NodeInterface";
pub const RELATIONSHIP_INTERFACE: &str = "RelationshipInterface";
pub const ACCESS_CONTROLLABLE: &str = "AccessControllable";
pub const PRINCIPAL: &str = "Principal";
pub const GROUP: &str = "Group";

/// Relationship type linking an owner to the nodes it owns.
pub const PRINCIPAL_OWNS_NODE: &str = "PrincipalOwnsNode";
/// Relationship type carrying explicit per-principal grants.
pub const SECURITY: &str = "Security";
/// Relationship type linking a group to its members.
pub const GROUP_CONTAINS: &str = "GroupContains";

/// Registers the builtin traits and types.
pub fn install(instance: &mut TraitsInstance) -> Result<(), RegistryError> {
	instance.register_base_type(Arc::new(PropertyContainerTrait))?;
	instance.register_base_type(Arc::new(AccessControllableTrait))?;
	register_abstract(instance, Arc::new(GraphObjectTrait), &[PROPERTY_CONTAINER])?;
	register_abstract(instance, Arc::new(NodeInterfaceTrait), &[PROPERTY_CONTAINER, GRAPH_OBJECT])?;
	register_abstract(
		instance,
		Arc::new(RelationshipInterfaceTrait),
		&[PROPERTY_CONTAINER, GRAPH_OBJECT],
	)?;

	instance.register_node_type(PRINCIPAL, [Arc::new(PrincipalTrait) as Arc<dyn TraitDefinition>])?;
	instance.register_node_type(
		GROUP,
		[
			Arc::new(PrincipalTrait) as Arc<dyn TraitDefinition>,
			Arc::new(GroupTrait) as Arc<dyn TraitDefinition>,
		],
	)?;

	instance.register_relationship_type(
		PRINCIPAL_OWNS_NODE,
		[Arc::new(PrincipalOwnsNodeTrait) as Arc<dyn TraitDefinition>],
	)?;
	instance.register_relationship_type(SECURITY, [Arc::new(SecurityTrait) as Arc<dyn TraitDefinition>])?;
	instance.register_relationship_type(
		GROUP_CONTAINS,
		[Arc::new(GroupContainsTrait) as Arc<dyn TraitDefinition>],
	)?;
	Ok(())
}

/// Registers a trait together with a builtin type of the same name that only serves as a
/// dependency of other types.
fn register_abstract(
	instance: &mut TraitsInstance,
	definition: Arc<dyn TraitDefinition>,
	dependencies: &[&str],
) -> Result<(), RegistryError> {
	let t = instance.register_trait(definition)?;
	let names = dependencies.iter().copied().chain([t.name()]);
	instance.register_type(TypeDeclaration::new(t.name(), names, TypeFlags::BUILTIN))
}
