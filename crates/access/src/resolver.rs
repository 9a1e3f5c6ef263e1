use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{trace, warn};
use trellis_graph::{Entity, GraphStore, SecurityContext};
use trellis_primitives::{Direction, Permission, PermissionSet, Uuid, Value};
use trellis_registry::builtins::{PRINCIPAL, Principal, SECURITY, SecurityGrant};
use trellis_registry::{GraphObject, TraitsInstance};

use crate::control::{AccessControl, GrantKey};
use crate::error::AccessError;

/// Node reached by the propagation search, linked to the node it was reached from.
struct Step {
	parent: Option<usize>,
	node: Uuid,
}

enum Reach {
	/// The principal holds the permission directly on this neighbour.
	Granted(Uuid),
	/// Neighbours to search next, with the mask that survives the hop.
	Frontier(Vec<(Uuid, PermissionSet)>),
}

/// Decides whether a principal holds a permission on a node.
///
/// Checks run in a fixed order and the first one that answers wins:
///
/// 1. superusers are always granted, then the positive cache is consulted
/// 2. admins, then grants in the type's schema for the user or any enclosing group
/// 3. creation by the owner or of oneself, then a principal reading itself
/// 4. anonymous access is denied
/// 5. ownership, then an explicit `SECURITY` grant for exactly this permission
/// 6. the same checks for each group containing the principal, one level deeper
/// 7. a breadth-first search over permission-propagating relationships
///
/// Exceeding a configured limit denies, it never errors.
pub struct PermissionResolver<'a> {
	control: &'a AccessControl,
	instance: &'a TraitsInstance,
	store: &'a dyn GraphStore,
	memo: FxHashMap<Uuid, FxHashMap<(Uuid, Permission), bool>>,
	in_progress: FxHashSet<(Uuid, Uuid, Permission)>,
}

impl<'a> PermissionResolver<'a> {
	pub(crate) fn new(control: &'a AccessControl, instance: &'a TraitsInstance, store: &'a dyn GraphStore) -> Self {
		Self {
			control,
			instance,
			store,
			memo: FxHashMap::default(),
			in_progress: FxHashSet::default(),
		}
	}

	pub fn is_granted(
		&mut self,
		node: Uuid,
		permission: Permission,
		security: &SecurityContext,
		is_creation: bool,
	) -> Result<bool, AccessError> {
		if security.is_superuser() {
			return decided(node, permission, 0, "superuser", true);
		}

		let key = GrantKey {
			node,
			permission,
			user: security.user(),
		};
		if self.control.recall(&key) {
			return decided(node, permission, 0, "cached", true);
		}

		let resolve = self.control.config().resolve_permissions;
		let granted = self.check(node, permission, security.user(), is_creation, 0, resolve)?;
		if granted {
			self.control.remember(key);
		}
		Ok(granted)
	}

	/// Public and authenticated visibility flags, falling back to a read check.
	pub fn is_visible(&mut self, node: Uuid, security: &SecurityContext) -> Result<bool, AccessError> {
		if security.is_superuser() {
			return Ok(true);
		}

		let object = self.object(node)?;
		let flag = |name: &str| {
			object
				.traits()
				.key_opt(name)
				.and_then(|key| object.get_property(&key))
				.and_then(|value| value.as_bool())
				.unwrap_or(false)
		};
		if flag("visibleToPublicUsers") {
			return Ok(true);
		}
		if security.user().is_some() && flag("visibleToAuthenticatedUsers") {
			return Ok(true);
		}

		self.is_granted(node, Permission::Read, security, false)
	}

	/// Propagation result remembered for `principal` on `node` in this scope.
	pub fn memoized(&self, node: Uuid, principal: Uuid, permission: Permission) -> Option<bool> {
		self.memo
			.get(&node)
			.and_then(|results| results.get(&(principal, permission)))
			.copied()
	}

	fn check(
		&mut self,
		node: Uuid,
		permission: Permission,
		user: Option<Uuid>,
		is_creation: bool,
		level: usize,
		resolve: bool,
	) -> Result<bool, AccessError> {
		let control = self.control;
		if level > control.config().max_recursion_depth {
			warn!(domain = "access", %node, %permission, level, "recursion ceiling reached");
			return Ok(false);
		}

		let object = self.object(node)?;
		let owner = owner_of(&object);
		let Some(user) = user else {
			let reason = if owner.is_some() { "anonymous on owned node" } else { "anonymous" };
			return decided(node, permission, level, reason, false);
		};

		let principal = self.principal(user)?;
		if principal.as_ref().is_some_and(|p| p.is_admin) {
			return decided(node, permission, level, "admin", true);
		}

		let ids = self.principal_ids(user, principal.as_ref())?;
		if object.allowed_by_schema(&ids, permission) {
			return decided(node, permission, level, "schema", true);
		}

		if is_creation && (node == user || owner == Some(user)) {
			return decided(node, permission, level, "creation", true);
		}
		if node == user && (level == 0 || permission == Permission::Read) {
			return decided(node, permission, level, "self", true);
		}
		if owner == Some(user) {
			return decided(node, permission, level, "owner", true);
		}
		if self.has_security_grant(&object, user, permission)? {
			return decided(node, permission, level, "grant", true);
		}

		if let Some(principal) = &principal {
			for &group in &principal.parents {
				if !self.in_progress.insert((node, group, permission)) {
					continue;
				}
				let granted = self.check(node, permission, Some(group), is_creation, level + 1, false);
				self.in_progress.remove(&(node, group, permission));
				if granted? {
					return decided(node, permission, level, "group", true);
				}
			}
		}

		if resolve && self.propagate(node, permission, user, level)? {
			return decided(node, permission, level, "propagation", true);
		}

		decided(node, permission, level, "no grant", false)
	}

	fn propagate(&mut self, root: Uuid, permission: Permission, user: Uuid, level: usize) -> Result<bool, AccessError> {
		let max_level = self.control.config().max_propagation_level;
		let mut steps = vec![Step { parent: None, node: root }];
		let mut queue = VecDeque::from([(0usize, PermissionSet::all(), 0usize)]);
		let mut traversed = FxHashSet::default();
		let mut truncated = false;

		while let Some((index, mask, depth)) = queue.pop_front() {
			if depth >= max_level {
				truncated = true;
				continue;
			}

			let node = steps[index].node;
			match self.memoized(node, user, permission) {
				Some(true) => {
					self.backtrack(&steps, index, user, permission);
					return Ok(true);
				}
				Some(false) => continue,
				None => {}
			}
			if !traversed.insert(node) {
				continue;
			}

			match self.reach(node, permission, user, mask, level)? {
				Reach::Granted(other) => {
					steps.push(Step {
						parent: Some(index),
						node: other,
					});
					self.backtrack(&steps, steps.len() - 1, user, permission);
					return Ok(true);
				}
				Reach::Frontier(next) => {
					for (other, next_mask) in next {
						steps.push(Step {
							parent: Some(index),
							node: other,
						});
						queue.push_back((steps.len() - 1, next_mask, depth + 1));
					}
				}
			}
		}

		if truncated {
			warn!(domain = "access", node = %root, %permission, max_level, "propagation level ceiling reached");
		}
		self.memo
			.entry(root)
			.or_default()
			.insert((user, permission), false);
		Ok(false)
	}

	/// Checks each neighbour across relationships that carry permissions into `node`.
	fn reach(
		&mut self,
		node: Uuid,
		permission: Permission,
		user: Uuid,
		mask: PermissionSet,
		level: usize,
	) -> Result<Reach, AccessError> {
		let max_fanout = self.control.config().max_relationship_fanout;
		let mut frontier = Vec::new();

		for degree in self.store.degree(node) {
			let Some(relation) = self.instance.relation_of(&degree.type_name)? else {
				continue;
			};
			let propagation = *relation.propagation();
			if !propagation.direction.flows_into(degree.direction) {
				continue;
			}
			if degree.count > max_fanout {
				warn!(
					domain = "access",
					%node,
					relationship = %degree.type_name,
					count = degree.count,
					max_fanout,
					"fan-out ceiling reached, not propagating"
				);
				continue;
			}

			let next_mask = propagation.apply(mask);
			if !next_mask.allows(permission) {
				continue;
			}

			for rel in self
				.store
				.relationships(node, degree.direction, Some(degree.type_name.as_str()))
			{
				let other = rel.other_node(node);
				if self.check(other, permission, Some(user), false, level + 1, false)? {
					return Ok(Reach::Granted(other));
				}
				frontier.push((other, next_mask));
			}
		}

		Ok(Reach::Frontier(frontier))
	}

	/// Marks every node on the path from `index` back to the search root as granted.
	fn backtrack(&mut self, steps: &[Step], index: usize, user: Uuid, permission: Permission) {
		let mut current = Some(index);
		while let Some(i) = current {
			let step = &steps[i];
			self.memo
				.entry(step.node)
				.or_default()
				.insert((user, permission), true);
			current = step.parent;
		}
	}

	fn object(&self, node: Uuid) -> Result<GraphObject<'a>, AccessError> {
		let entity = Entity::new(self.store, node);
		let info = entity.info()?;
		let traits = self.instance.traits_of(&info.type_name)?;
		Ok(GraphObject::read_only(traits, entity))
	}

	/// Loads the principal facade; `None` when the id is not a stored principal.
	fn principal(&self, id: Uuid) -> Result<Option<Principal>, AccessError> {
		let Some(info) = self.store.entity(id) else {
			return Ok(None);
		};
		let traits = self.instance.traits_of(&info.type_name)?;
		if !traits.contains(PRINCIPAL) {
			return Ok(None);
		}
		let object = GraphObject::read_only(traits, Entity::new(self.store, id));
		Ok(Some(object.facade::<Principal>()?))
	}

	/// The user and every group that contains it, directly or transitively.
	fn principal_ids(&self, user: Uuid, principal: Option<&Principal>) -> Result<FxHashSet<Uuid>, AccessError> {
		let mut ids = FxHashSet::default();
		ids.insert(user);
		let mut pending: Vec<Uuid> = principal.map(|p| p.parents.clone()).unwrap_or_default();
		while let Some(group) = pending.pop() {
			if !ids.insert(group) {
				continue;
			}
			if let Some(parent) = self.principal(group)? {
				pending.extend(parent.parents);
			}
		}
		Ok(ids)
	}

	fn has_security_grant(
		&self,
		object: &GraphObject<'_>,
		user: Uuid,
		permission: Permission,
	) -> Result<bool, AccessError> {
		for rel in object.relationships(Direction::Incoming, Some(SECURITY)) {
			if rel.source == user && SecurityGrant::load(self.store, rel.id)?.allowed.allows(permission) {
				return Ok(true);
			}
		}
		Ok(false)
	}
}

fn owner_of(object: &GraphObject<'_>) -> Option<Uuid> {
	let key = object.traits().key_opt("owner")?;
	object.get_property(&key).as_ref().and_then(Value::as_id)
}

fn decided(
	node: Uuid,
	permission: Permission,
	level: usize,
	reason: &'static str,
	granted: bool,
) -> Result<bool, AccessError> {
	trace!(domain = "access", %node, %permission, level, reason, granted, "permission decided");
	Ok(granted)
}
