use parking_lot::Mutex;
use trellis_primitives::{Uuid, Value};

/// Who is performing an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
	user: Option<Uuid>,
	superuser: bool,
}

impl SecurityContext {
	/// Context of an unauthenticated caller.
	pub fn anonymous() -> Self {
		Self::default()
	}

	/// Context of an authenticated principal.
	pub fn for_user(user: Uuid) -> Self {
		Self {
			user: Some(user),
			superuser: false,
		}
	}

	/// Context bypassing all permission checks.
	pub fn superuser() -> Self {
		Self {
			user: None,
			superuser: true,
		}
	}

	/// Returns the accessing principal, if any.
	pub fn user(&self) -> Option<Uuid> {
		self.user
	}

	/// Returns true if the caller holds superuser privilege.
	pub fn is_superuser(&self) -> bool {
		self.superuser
	}
}

/// A property change recorded for downstream change tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
	pub entity: Uuid,
	pub key: String,
	pub previous: Option<Value>,
	pub current: Option<Value>,
}

/// Transaction-scoped context handed to framework and lifecycle methods.
pub trait TransactionContext {
	/// Returns the caller's security context.
	fn security(&self) -> &SecurityContext;

	/// Records that a property changed.
	fn record_change(&self, change: PropertyChange);
}

/// Default [`TransactionContext`] collecting changes in memory.
#[derive(Debug, Default)]
pub struct ModificationQueue {
	security: SecurityContext,
	changes: Mutex<Vec<PropertyChange>>,
}

impl ModificationQueue {
	pub fn new(security: SecurityContext) -> Self {
		Self {
			security,
			changes: Mutex::new(Vec::new()),
		}
	}

	/// Returns the changes recorded so far, oldest first.
	pub fn changes(&self) -> Vec<PropertyChange> {
		self.changes.lock().clone()
	}

	/// Returns the names of keys changed on `entity`, in first-change order.
	pub fn changed_keys(&self, entity: Uuid) -> Vec<String> {
		let changes = self.changes.lock();
		let mut keys: Vec<String> = Vec::new();
		for change in changes.iter().filter(|c| c.entity == entity) {
			if !keys.contains(&change.key) {
				keys.push(change.key.clone());
			}
		}
		keys
	}

	/// Drains all recorded changes.
	pub fn take(&self) -> Vec<PropertyChange> {
		std::mem::take(&mut *self.changes.lock())
	}
}

impl TransactionContext for ModificationQueue {
	fn security(&self) -> &SecurityContext {
		&self.security
	}

	fn record_change(&self, change: PropertyChange) {
		tracing::trace!(entity = %change.entity, key = %change.key, "property changed");
		self.changes.lock().push(change);
	}
}
