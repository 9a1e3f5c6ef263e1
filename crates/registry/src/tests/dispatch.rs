use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use trellis_graph::{Entity, GraphError, GraphStore, MemoryGraph, ModificationQueue, SecurityContext};
use trellis_primitives::{Direction, Permission, PermissionSet, Uuid, Value};

use super::{customer_instance, declare, with_builtins};
use crate::builtins::{Principal, SecurityGrant};
use crate::{
	BasicTraitDefinition, ErrorBuffer, FacadeFactory, FrameworkError, GetProperty, GraphObject, IsValid, LifecycleKind,
	LifecycleMethod, PropertyKey, RegistryError, TraitsInstance,
};

fn recording(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> LifecycleMethod {
	let log = Arc::clone(log);
	LifecycleMethod::new(label, move |_, _| {
		log.lock().push(label);
		Ok(())
	})
}

#[test]
fn overriding_validation_can_defer_to_the_overridden_one() {
	let base_calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&base_calls);

	let mut instance = TraitsInstance::new("validation");
	declare(
		&mut instance,
		BasicTraitDefinition::new("A").with_framework_method(IsValid::new(move |_, _, _| {
			counter.fetch_add(1, Ordering::SeqCst);
			false
		})),
		&[],
	);
	declare(
		&mut instance,
		BasicTraitDefinition::new("B")
			.with_key(PropertyKey::string("title"))
			.with_framework_method(IsValid::new(|sup, object, errors| {
				let base = sup.is_valid(object, errors);
				base || object.get("title").ok().flatten().is_some()
			})),
		&["A"],
	);

	let chain = instance.traits_of("B").unwrap().method::<IsValid>().unwrap();
	assert_eq!(chain.declaring_traits(), vec!["B", "A"]);

	let graph = MemoryGraph::new();
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let id = graph.create_node("B");
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();

	let mut errors = ErrorBuffer::new();
	assert!(!object.is_valid(&mut errors));
	object.set("title", "draft").unwrap();
	assert!(object.is_valid(&mut errors));
	assert_eq!(base_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn lifecycle_handlers_fan_out_in_resolution_order() {
	let log = Arc::new(Mutex::new(Vec::new()));
	let mut instance = TraitsInstance::new("lifecycle");
	declare(
		&mut instance,
		BasicTraitDefinition::new("A").with_lifecycle(LifecycleKind::OnModification, recording(&log, "A.onModification")),
		&[],
	);
	declare(
		&mut instance,
		BasicTraitDefinition::new("B").with_lifecycle(LifecycleKind::OnModification, recording(&log, "B.onModification")),
		&["A"],
	);

	let traits = instance.traits_of("B").unwrap();
	let handlers = traits.lifecycle_methods(LifecycleKind::OnModification);
	let names: Vec<&str> = handlers.iter().map(LifecycleMethod::name).collect();
	assert_eq!(names, vec!["A.onModification", "B.onModification"]);
	assert_eq!(handlers[1].declaring_trait(), Some("B"));
	assert!(traits.lifecycle_methods(LifecycleKind::OnDeletion).is_empty());

	let graph = MemoryGraph::new();
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let id = graph.create_node("B");
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();
	object
		.invoke_lifecycle(LifecycleKind::OnModification, &mut ErrorBuffer::new())
		.unwrap();
	assert_eq!(*log.lock(), vec!["A.onModification", "B.onModification"]);
}

#[test]
fn failing_lifecycle_handler_stops_the_fan_out() {
	let log = Arc::new(Mutex::new(Vec::new()));
	let mut instance = TraitsInstance::new("lifecycle");
	declare(
		&mut instance,
		BasicTraitDefinition::new("A").with_lifecycle(
			LifecycleKind::OnDeletion,
			LifecycleMethod::new("A.onDeletion", |_, _| Err(FrameworkError::handler("still referenced"))),
		),
		&[],
	);
	declare(
		&mut instance,
		BasicTraitDefinition::new("B").with_lifecycle(LifecycleKind::OnDeletion, recording(&log, "B.onDeletion")),
		&["A"],
	);

	let graph = MemoryGraph::new();
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let id = graph.create_node("B");
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();
	let err = object
		.invoke_lifecycle(LifecycleKind::OnDeletion, &mut ErrorBuffer::new())
		.unwrap_err();
	assert_eq!(err, FrameworkError::handler("still referenced"));
	assert!(log.lock().is_empty());
}

#[test]
fn group_properties_resolve_through_the_property_chain() {
	let instance = with_builtins();
	let chain = instance.traits_of("Group").unwrap().method::<GetProperty>().unwrap();
	assert_eq!(
		chain.declaring_traits(),
		vec!["Group", "AccessControllable", "PropertyContainer"]
	);

	let graph = MemoryGraph::new();
	let admins = graph.create_node("Group");
	let alice = graph.create_node("Principal");
	let owner = graph.create_node("Principal");
	graph.create_relationship("GroupContains", "CONTAINS", admins, alice).unwrap();
	graph.create_relationship("PrincipalOwnsNode", "OWNS", owner, admins).unwrap();
	graph.set_property(admins, "name", Some(Value::from("admins"))).unwrap();

	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, admins), &tx).unwrap();
	assert_eq!(object.get("members").unwrap(), Some(Value::List(vec![Value::Id(alice)])));
	assert_eq!(object.get("owner").unwrap(), Some(Value::Id(owner)));
	assert_eq!(object.get("grantees").unwrap(), Some(Value::List(Vec::new())));
	assert_eq!(object.get("name").unwrap(), Some(Value::from("admins")));
	assert_eq!(object.get("isAdmin").unwrap(), Some(Value::Bool(false)));
}

#[test]
fn node_relationships_are_grouped_by_type() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let node = graph.create_node("Customer");
	let user = graph.create_node("Principal");
	graph.create_relationship("Security", "SECURITY", user, node).unwrap();
	graph.create_relationship("PrincipalOwnsNode", "OWNS", user, node).unwrap();

	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, node), &tx).unwrap();
	let types: Vec<String> = object
		.relationships(Direction::Incoming, None)
		.into_iter()
		.map(|rel| rel.type_name)
		.collect();
	assert_eq!(types, vec!["PrincipalOwnsNode", "Security"]);
	assert!(object.relationships(Direction::Outgoing, None).is_empty());
}

#[derive(Debug, PartialEq)]
struct Tag(&'static str);

#[test]
fn first_trait_in_resolution_order_builds_the_facade() {
	let mut instance = TraitsInstance::new("facades");
	declare(
		&mut instance,
		BasicTraitDefinition::new("A").with_node_facade(FacadeFactory::of(|_| Ok(Tag("A")))),
		&[],
	);
	declare(
		&mut instance,
		BasicTraitDefinition::new("B").with_node_facade(FacadeFactory::of(|_| Ok(Tag("B")))),
		&["A"],
	);
	assert_eq!(instance.traits_of("B").unwrap().resolved_trait_names(), vec!["A", "B"]);

	let graph = MemoryGraph::new();
	let id = graph.create_node("B");
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();
	assert_eq!(object.facade::<Tag>().unwrap(), Tag("A"));
	assert_eq!(object.facade::<Tag>().unwrap(), Tag("A"));
}

#[test]
fn facades_wrap_matching_types_only() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let group = graph.create_node("Group");
	let user = graph.create_node("Principal");
	let customer = graph.create_node("Customer");
	graph.create_relationship("GroupContains", "CONTAINS", group, user).unwrap();
	graph.set_property(user, "isAdmin", Some(Value::Bool(true))).unwrap();
	let grant = graph.create_relationship("Security", "SECURITY", user, customer).unwrap();
	graph
		.set_property(
			grant,
			"allowed",
			Some(Value::from(vec!["read", "accessControl", "fly"])),
		)
		.unwrap();

	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let principal: Principal = instance
		.object(Entity::new(&graph, user), &tx)
		.unwrap()
		.facade()
		.unwrap();
	assert_eq!(principal.id, user);
	assert!(principal.is_admin);
	assert_eq!(principal.parents, vec![group]);

	let security: SecurityGrant = instance
		.object(Entity::new(&graph, grant), &tx)
		.unwrap()
		.facade()
		.unwrap();
	assert_eq!(security.principal, user);
	assert_eq!(security.node, customer);
	assert_eq!(security.allowed, PermissionSet::READ | PermissionSet::ACCESS_CONTROL);
	assert!(!security.allowed.allows(Permission::Write));

	let object = instance.object(Entity::new(&graph, customer), &tx).unwrap();
	assert!(matches!(
		object.facade::<Principal>(),
		Err(RegistryError::NoFacade { ref type_name, .. }) if type_name == "Customer"
	));
}

#[test]
fn writes_are_recorded_once_per_change() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let id = graph.create_node("Customer");
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();

	object.set("name", "acme").unwrap();
	object.set("name", "acme").unwrap();
	assert_eq!(tx.changes().len(), 1);

	let name = object.key("name").unwrap();
	object.set_property_with(&name, Some(Value::from("acme")), true).unwrap();
	assert_eq!(tx.changes().len(), 2);
	assert_eq!(tx.changed_keys(id), vec!["name".to_string()]);
	assert_eq!(graph.get_property(id, "name"), Some(Value::from("acme")));

	object.set_property(&name, None).unwrap();
	assert_eq!(object.get("name").unwrap(), None);
	assert_eq!(tx.changes().last().unwrap().previous, Some(Value::from("acme")));
}

#[test]
fn mistyped_values_are_rejected() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let id = graph.create_node("Customer");
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();

	match object.set("name", 42i64) {
		Err(FrameworkError::Validation(errors)) => {
			assert!(errors.contains("name", "invalid_property_value"));
		}
		other => panic!("expected a validation error, got {other:?}"),
	}
	assert!(tx.changes().is_empty());
}

#[test]
fn system_properties_need_a_fresh_unlock_per_write() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let id = graph.create_node("Customer");
	let tx = ModificationQueue::new(SecurityContext::superuser());
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();

	let key = object.key("createdDate").unwrap();
	let first = Value::Date(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
	let second = Value::Date(DateTime::from_timestamp(1_700_000_060, 0).unwrap());

	assert!(matches!(
		object.set_property(&key, Some(first.clone())),
		Err(FrameworkError::SystemProperty { .. })
	));
	object.unlock_system_properties_once();
	object.set_property(&key, Some(first.clone())).unwrap();
	assert!(matches!(
		object.set_property(&key, Some(second)),
		Err(FrameworkError::SystemProperty { .. })
	));
	assert_eq!(object.get("createdDate").unwrap(), Some(first));
}

#[test]
fn read_only_properties_yield_to_unlock_or_superuser() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let id = graph.create_node("Customer");

	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();
	assert!(matches!(
		object.set("code", "C-1"),
		Err(FrameworkError::ReadOnlyProperty { ref key, .. }) if key == "code"
	));
	object.unlock_read_only_properties_once();
	object.set("code", "C-1").unwrap();

	let admin_tx = ModificationQueue::new(SecurityContext::superuser());
	let admin_view = instance.object(Entity::new(&graph, id), &admin_tx).unwrap();
	admin_view.set("code", "C-2").unwrap();
	assert_eq!(object.get("code").unwrap(), Some(Value::from("C-2")));
}

#[test]
fn read_only_objects_reject_writes() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let id = graph.create_node("Customer");
	let traits = instance.traits_of("Customer").unwrap();
	let object = GraphObject::read_only(traits, Entity::new(&graph, id));

	assert!(matches!(
		object.set("name", "acme"),
		Err(FrameworkError::Graph(GraphError::Rejected { .. }))
	));
	assert_eq!(object.get("type").unwrap(), Some(Value::from("Customer")));
}

#[test]
fn required_keys_fail_validation_until_set() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let id = graph.create_node("Customer");
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();

	let mut errors = ErrorBuffer::new();
	assert!(!object.is_valid(&mut errors));
	assert!(errors.contains("title", "must_not_be_empty"));
	assert!(!errors.contains("id", "must_not_be_empty"));
	assert_eq!(errors.to_string(), "Customer.title: must_not_be_empty");

	object.set("title", "Acme Corp").unwrap();
	let mut errors = ErrorBuffer::new();
	assert!(object.is_valid(&mut errors));
	assert!(!errors.has_error());
}

#[test]
fn creation_stamps_date_and_creator() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();

	let user = Uuid::new_v4();
	let id = graph.create_node("Customer");
	let tx = ModificationQueue::new(SecurityContext::for_user(user));
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();
	object
		.invoke_lifecycle(LifecycleKind::OnCreation, &mut ErrorBuffer::new())
		.unwrap();
	assert!(matches!(object.get("createdDate").unwrap(), Some(Value::Date(_))));
	assert_eq!(object.get("createdBy").unwrap(), Some(Value::Id(user)));
	assert_eq!(object.get("lastModifiedDate").unwrap(), None);
	assert_eq!(tx.changed_keys(id), vec!["createdDate".to_string(), "createdBy".to_string()]);

	let anonymous_id = graph.create_node("Customer");
	let anonymous = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, anonymous_id), &anonymous).unwrap();
	object
		.invoke_lifecycle(LifecycleKind::OnCreation, &mut ErrorBuffer::new())
		.unwrap();
	assert_eq!(object.get("createdBy").unwrap(), None);
	assert!(object.get("createdDate").unwrap().is_some());
	let created = Utc::now();
	assert!(matches!(object.get("createdDate").unwrap(), Some(Value::Date(d)) if d <= created));
}

#[test]
fn passive_index_values_cover_flagged_keys() {
	let instance = customer_instance();
	let graph = MemoryGraph::new();
	let id = graph.create_node("Customer");
	let tx = ModificationQueue::new(SecurityContext::anonymous());
	let object = instance.object(Entity::new(&graph, id), &tx).unwrap();

	let values = object.index_passive_properties();
	let passive: Vec<(&str, Option<Value>)> = values
		.iter()
		.map(|(key, value)| (key.name(), value.clone()))
		.collect();
	assert_eq!(passive, vec![("lastModifiedDate", None)]);
}
