#![allow(dead_code)]

use trellis_graph::{GraphStore, MemoryGraph};
use trellis_primitives::{Permission, PermissionPropagation, PropagationDirection, Uuid, Value};
use trellis_registry::builtins::{self, GROUP_CONTAINS, PRINCIPAL_OWNS_NODE, SECURITY};
use trellis_registry::{Relation, TraitsInstance};

pub const FOLDER_CONTAINS_FOLDER: &str = "FolderContainsFolder";
pub const FOLDER_CONTAINS_FILE: &str = "FolderContainsFile";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Builtins plus `Folder` and `File`, where folder contents inherit every permission.
pub fn instance() -> TraitsInstance {
	instance_with(PermissionPropagation::keep_all(PropagationDirection::Out))
}

/// Like [`instance`], with custom propagation from folders to files.
pub fn instance_with(file_propagation: PermissionPropagation) -> TraitsInstance {
	init_tracing();
	let mut instance = TraitsInstance::new("access");
	builtins::install(&mut instance).unwrap();
	instance.register_dynamic_node_type("Folder", &[], false).unwrap();
	instance.register_dynamic_node_type("File", &[], false).unwrap();
	instance
		.register_dynamic_relationship_type(
			FOLDER_CONTAINS_FOLDER,
			Relation::new("CONTAINS", "Folder", "Folder")
				.with_propagation(PermissionPropagation::keep_all(PropagationDirection::Out)),
			false,
		)
		.unwrap();
	instance
		.register_dynamic_relationship_type(
			FOLDER_CONTAINS_FILE,
			Relation::new("CONTAINS", "Folder", "File").with_propagation(file_propagation),
			false,
		)
		.unwrap();
	instance
}

pub fn user(graph: &MemoryGraph) -> Uuid {
	graph.create_node("Principal")
}

pub fn group(graph: &MemoryGraph) -> Uuid {
	graph.create_node("Group")
}

pub fn admin(graph: &MemoryGraph) -> Uuid {
	let id = user(graph);
	graph.set_property(id, "isAdmin", Some(Value::Bool(true))).unwrap();
	id
}

pub fn add_member(graph: &MemoryGraph, group: Uuid, member: Uuid) {
	graph
		.create_relationship(GROUP_CONTAINS, "CONTAINS", group, member)
		.unwrap();
}

pub fn own(graph: &MemoryGraph, owner: Uuid, node: Uuid) {
	graph
		.create_relationship(PRINCIPAL_OWNS_NODE, "OWNS", owner, node)
		.unwrap();
}

/// Creates a `SECURITY` relationship allowing `permissions` and returns its id.
pub fn grant(graph: &MemoryGraph, principal: Uuid, node: Uuid, permissions: &[Permission]) -> Uuid {
	let rel = graph
		.create_relationship(SECURITY, "SECURITY", principal, node)
		.unwrap();
	let allowed: Vec<Value> = permissions.iter().map(|p| Value::from(p.name())).collect();
	graph.set_property(rel, "allowed", Some(Value::List(allowed))).unwrap();
	rel
}

pub fn contain(graph: &MemoryGraph, type_name: &str, parent: Uuid, child: Uuid) -> Uuid {
	graph
		.create_relationship(type_name, "CONTAINS", parent, child)
		.unwrap()
}

/// Folders `f0 -> f1 -> ... -> f{len-1}`, each containing the next.
pub fn folder_chain(graph: &MemoryGraph, len: usize) -> Vec<Uuid> {
	let folders: Vec<Uuid> = (0..len).map(|_| graph.create_node("Folder")).collect();
	for pair in folders.windows(2) {
		contain(graph, FOLDER_CONTAINS_FOLDER, pair[0], pair[1]);
	}
	folders
}
