use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use rustc_hash::FxHashSet;
use trellis_graph::{Entity, MemoryGraph, ModificationQueue, SecurityContext};

use super::{declare, with_builtins};
use crate::{
	BasicTraitDefinition, PropertyKey, PropertyType, RegistryConfig, Relation, RegistryError, SchemaProperty,
	TraitsInstance, TypeDeclaration, TypeFlags, VIEW_ALL, VIEW_CUSTOM, VIEW_PUBLIC,
};

/// A, B(A), C(A), D(B, C) with `b` declared by B and `c` by C.
fn diamond(config: &RegistryConfig, b: PropertyKey, c: PropertyKey) -> TraitsInstance {
	diamond_with(config, b, c, None)
}

/// Like [`diamond`], with D optionally declaring `d`.
fn diamond_with(config: &RegistryConfig, b: PropertyKey, c: PropertyKey, d: Option<PropertyKey>) -> TraitsInstance {
	let mut instance = TraitsInstance::with_config("diamond", config);
	declare(&mut instance, BasicTraitDefinition::new("A").with_key(PropertyKey::string("a")), &[]);
	declare(&mut instance, BasicTraitDefinition::new("B").with_key(b), &["A"]);
	declare(&mut instance, BasicTraitDefinition::new("C").with_key(c), &["A"]);
	let top = match d {
		Some(key) => BasicTraitDefinition::new("D").with_key(key),
		None => BasicTraitDefinition::new("D"),
	};
	declare(&mut instance, top, &["B", "C"]);
	instance
}

#[test]
fn diamond_keeps_the_shared_base_once_and_first() {
	let instance = diamond(
		&RegistryConfig::default(),
		PropertyKey::string("b"),
		PropertyKey::string("c"),
	);
	let d = instance.traits_of("D").unwrap();
	assert_eq!(d.resolved_trait_names(), vec!["A", "B", "C", "D"]);
	assert_eq!(d.key("a").unwrap().declaring_trait(), Some("A"));
	assert_eq!(d.key("c").unwrap().declaring_trait(), Some("C"));
	assert!(d.contains("A"));
}

#[rstest]
#[case::both_concrete(PropertyKey::string("p"), PropertyKey::string("p"), None, true)]
#[case::earlier_abstract(PropertyKey::string("p").abstract_key(), PropertyKey::string("p"), None, false)]
#[case::later_abstract(PropertyKey::string("p"), PropertyKey::string("p").abstract_key(), None, false)]
#[case::abstract_override_of_concrete_siblings(
	PropertyKey::string("p"),
	PropertyKey::integer("p"),
	Some(PropertyKey::string("p").abstract_key()),
	true
)]
#[case::abstract_override_of_abstract_sibling(
	PropertyKey::string("p").abstract_key(),
	PropertyKey::integer("p"),
	Some(PropertyKey::string("p").abstract_key()),
	false
)]
fn sibling_redeclaration_conflicts_unless_abstract(
	#[case] b: PropertyKey,
	#[case] c: PropertyKey,
	#[case] d: Option<PropertyKey>,
	#[case] conflict: bool,
) {
	let instance = diamond_with(&RegistryConfig::default(), b, c, d);
	let result = instance.traits_of("D");
	if conflict {
		assert_eq!(
			result.unwrap_err(),
			RegistryError::PropertyConflict {
				type_name: "D".to_string(),
				key: "p".to_string(),
				existing: "B".to_string(),
				incoming: "C".to_string(),
			}
		);
	} else {
		assert!(result.unwrap().has_key("p"));
	}
}

#[test]
fn conflicting_schema_properties_are_rejected_on_extension() {
	let mut instance = diamond(
		&RegistryConfig::default(),
		PropertyKey::string("b"),
		PropertyKey::string("p"),
	);
	let before = instance.traits_of("D").unwrap();

	let err = instance
		.register_dynamic_property("B", &SchemaProperty::new("p", PropertyType::Integer))
		.unwrap_err();
	assert_eq!(
		err,
		RegistryError::PropertyConflict {
			type_name: "D".to_string(),
			key: "p".to_string(),
			existing: "B".to_string(),
			incoming: "C".to_string(),
		}
	);

	assert!(instance.get_trait("B").unwrap().property_keys().all(|key| key.name() != "p"));
	let after = instance.traits_of("D").unwrap();
	assert!(Arc::ptr_eq(&before, &after));
	assert_eq!(after.key("p").unwrap().declaring_trait(), Some("C"));
}

#[test]
fn first_relation_in_resolution_order_wins() {
	let mut instance = TraitsInstance::new("relations");
	for (name, dependencies, label) in [("R1", &[][..], "FIRST"), ("R2", &["R1"][..], "SECOND")] {
		instance
			.register_trait(Arc::new(
				BasicTraitDefinition::new(name).with_relation(Relation::new(label, "Folder", "File")),
			))
			.unwrap();
		let names = dependencies.iter().copied().chain([name]);
		instance
			.register_type(TypeDeclaration::new(name, names, TypeFlags::RELATIONSHIP))
			.unwrap();
	}
	instance
		.register_type(TypeDeclaration::new("Rel", ["R2"], TypeFlags::RELATIONSHIP))
		.unwrap();

	assert_eq!(instance.traits_of("Rel").unwrap().resolved_trait_names(), vec!["R1", "R2"]);
	let relation = instance.relation_of("Rel").unwrap().unwrap();
	assert_eq!(relation.relationship_type(), "FIRST");
}

#[test]
fn lenient_registry_lets_the_last_declaration_win() {
	let config = RegistryConfig {
		strict_property_conflicts: false,
		..RegistryConfig::default()
	};
	let instance = diamond(&config, PropertyKey::string("p"), PropertyKey::integer("p"));
	let d = instance.traits_of("D").unwrap();
	assert_eq!(d.key("p").unwrap().value_type(), PropertyType::Integer);
	assert_eq!(d.key("p").unwrap().declaring_trait(), Some("C"));
}

#[test]
fn dependent_redeclaration_overrides() {
	let mut instance = TraitsInstance::new("override");
	declare(
		&mut instance,
		BasicTraitDefinition::new("A").with_key(PropertyKey::string("p").abstract_key()),
		&[],
	);
	declare(&mut instance, BasicTraitDefinition::new("B").with_key(PropertyKey::boolean("p")), &["A"]);
	declare(&mut instance, BasicTraitDefinition::new("C").with_key(PropertyKey::integer("p")), &["B"]);

	let b = instance.traits_of("B").unwrap();
	let key = b.key("p").unwrap();
	assert_eq!(key.value_type(), PropertyType::Boolean);
	assert_eq!(key.declaring_trait(), Some("B"));
	assert_eq!(
		instance.traits_of("A").unwrap().key("p").unwrap().value_type(),
		PropertyType::String
	);

	let c = instance.traits_of("C").unwrap();
	assert_eq!(c.key("p").unwrap().value_type(), PropertyType::Integer);
	let names: Vec<&str> = c.all_property_keys().iter().map(PropertyKey::name).collect();
	assert_eq!(names, vec!["p"]);
}

#[test]
fn missing_keys_are_configuration_errors() {
	let instance = with_builtins();
	let principal = instance.traits_of("Principal").unwrap();
	assert_eq!(
		principal.key("salary").unwrap_err(),
		RegistryError::MissingKey {
			type_name: "Principal".to_string(),
			key: "salary".to_string(),
		}
	);
	assert!(principal.key_opt("salary").is_none());
	assert!(principal.has_key("eMail"));
}

#[test]
fn views_are_united_across_traits() {
	let mut instance = TraitsInstance::new("views");
	declare(
		&mut instance,
		BasicTraitDefinition::new("A")
			.with_key(PropertyKey::string("title"))
			.with_view(VIEW_PUBLIC, &["title"]),
		&[],
	);
	declare(
		&mut instance,
		BasicTraitDefinition::new("B")
			.with_key(PropertyKey::string("summary"))
			.with_view(VIEW_PUBLIC, &["title", "summary", "ghost"]),
		&["A"],
	);

	let b = instance.traits_of("B").unwrap();
	let public = b.property_keys_for_view(VIEW_PUBLIC);
	let names: Vec<&str> = public.iter().map(PropertyKey::name).collect();
	assert_eq!(names, vec!["title", "summary"]);
	assert!(b.property_keys_for_view("export").is_empty());
	assert_eq!(b.view_names(), vec![VIEW_ALL, VIEW_PUBLIC]);
}

#[test]
fn customer_composed_of_base_traits() {
	let mut instance = with_builtins();
	instance
		.register_type(TypeDeclaration::new(
			"Customer",
			["GraphObject", "NodeInterface", "AccessControllable"],
			TypeFlags::NODE,
		))
		.unwrap();

	let customer = instance.traits_of("Customer").unwrap();
	assert_eq!(
		customer.resolved_trait_names(),
		vec!["PropertyContainer", "GraphObject", "NodeInterface", "AccessControllable"]
	);

	let graph = MemoryGraph::new();
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let id = graph.create_node("Customer");
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();

	let names: Vec<&str> = object.traits().all_property_keys().iter().map(PropertyKey::name).collect();
	for expected in ["id", "type", "createdDate", "name", "owner"] {
		assert!(names.contains(&expected), "{expected} missing from {names:?}");
	}

	let all = customer.property_keys_for_view(VIEW_ALL);
	let custom = customer.property_keys_for_view(VIEW_CUSTOM);
	let custom_names: Vec<&str> = custom.iter().map(PropertyKey::name).collect();
	assert_eq!(custom_names, vec!["id", "type", "name"]);
	assert!(custom.iter().all(|key| all.iter().any(|k| k.name() == key.name())));
	assert_eq!(all.len(), customer.all_property_keys().len());
}

#[test]
fn builtin_types_carry_their_kind() {
	let instance = with_builtins();
	let group = instance.traits_of("Group").unwrap();
	assert!(group.is_node_type() && group.is_builtin());
	assert_eq!(
		group.resolved_trait_names(),
		vec![
			"PropertyContainer",
			"GraphObject",
			"NodeInterface",
			"AccessControllable",
			"Principal",
			"Group",
		]
	);

	let owns = instance.traits_of("PrincipalOwnsNode").unwrap();
	assert!(owns.is_relationship_type());
	assert!(!owns.contains("NodeInterface"));
	let relation = instance.relation_of("PrincipalOwnsNode").unwrap().unwrap();
	assert_eq!(relation.relationship_type(), "OWNS");
	assert_eq!(relation.source_type(), "Principal");
	assert!(instance.relation_of("Principal").unwrap().is_none());
}

#[test]
fn unknown_names_fail_resolution() {
	let mut instance = with_builtins();
	assert_eq!(
		instance.traits_of("Invoice").unwrap_err(),
		RegistryError::UnknownType {
			type_name: "Invoice".to_string(),
		}
	);

	instance
		.register_type(TypeDeclaration::new("Invoice", ["GraphObject", "Billable"], TypeFlags::NODE))
		.unwrap();
	assert_eq!(
		instance.traits_of("Invoice").unwrap_err(),
		RegistryError::UnknownTrait {
			type_name: "Invoice".to_string(),
			trait_name: "Billable".to_string(),
		}
	);
	assert!(instance.resolve_all().is_err());
}

#[test]
fn duplicates_are_rejected() {
	let mut instance = with_builtins();
	let err = instance
		.register_trait(std::sync::Arc::new(BasicTraitDefinition::new("GraphObject")))
		.unwrap_err();
	assert_eq!(
		err,
		RegistryError::DuplicateTrait {
			name: "GraphObject".to_string(),
		}
	);
	let err = instance.register_dynamic_node_type("Principal", &[], false).unwrap_err();
	assert!(matches!(err, RegistryError::DuplicateTrait { .. } | RegistryError::DuplicateType { .. }));
}

#[test]
fn labels_resolve_to_their_trait() {
	let mut instance = TraitsInstance::new("labels");
	declare(
		&mut instance,
		BasicTraitDefinition::new("FileBase").with_label("File"),
		&[],
	);
	assert_eq!(instance.get_trait("File").unwrap().name(), "FileBase");
	assert!(instance.traits_of("FileBase").unwrap().contains("File"));
}

#[test]
fn copies_resolve_identically() {
	let instance = with_builtins();
	let copy = instance.create_copy("copy");
	assert_eq!(copy.get_trait("GraphObject").unwrap().registry_name(), "copy");

	for type_name in instance.type_names() {
		let original = instance.traits_of(type_name).unwrap();
		let copied = copy.traits_of(type_name).unwrap();
		assert_eq!(original.resolved_trait_names(), copied.resolved_trait_names());

		let declared = |keys: &[PropertyKey]| -> Vec<(String, Option<String>)> {
			keys.iter()
				.map(|k| (k.name().to_string(), k.declaring_trait().map(str::to_owned)))
				.collect()
		};
		assert_eq!(
			declared(original.all_property_keys()),
			declared(copied.all_property_keys())
		);
	}
}

/// Random acyclic dependency lists: trait `i` may depend on any `j < i`.
fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
	(1usize..8).prop_flat_map(|n| {
		prop::collection::vec(prop::collection::vec(any::<bool>(), n), n).prop_map(|rows| {
			rows.iter()
				.enumerate()
				.map(|(i, row)| (0..i).filter(|&j| row[j]).collect())
				.collect()
		})
	})
}

proptest! {
	#[test]
	fn prop_resolution_orders_dependencies_first(dag in arb_dag()) {
		let mut instance = TraitsInstance::new("dag");
		for (i, deps) in dag.iter().enumerate() {
			let names: Vec<String> = deps.iter().map(|j| format!("T{j}")).collect();
			let refs: Vec<&str> = names.iter().map(String::as_str).collect();
			let definition = BasicTraitDefinition::new(format!("T{i}"))
				.with_key(PropertyKey::integer(format!("k{i}")));
			declare(&mut instance, definition, &refs);
		}
		let copy = instance.create_copy("again");

		for i in 0..dag.len() {
			let type_name = format!("T{i}");
			let traits = instance.traits_of(&type_name).unwrap();
			let order = traits.resolved_trait_names();

			let unique: FxHashSet<&str> = order.iter().copied().collect();
			prop_assert_eq!(unique.len(), order.len());
			prop_assert_eq!(order.last().copied(), Some(type_name.as_str()));

			for (position, name) in order.iter().enumerate() {
				let index: usize = name[1..].parse().unwrap();
				for dependency in &dag[index] {
					let dependency = format!("T{dependency}");
					let found = order.iter().position(|n| *n == dependency);
					prop_assert!(found.is_some_and(|p| p < position));
				}
			}

			let again = copy.traits_of(&type_name).unwrap();
			prop_assert_eq!(again.resolved_trait_names(), order.clone());
			prop_assert_eq!(again.all_property_keys().len(), order.len());
		}
	}
}
