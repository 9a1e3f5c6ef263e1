use std::sync::LazyLock;

use trellis_graph::{GraphStore, SecurityContext};
use trellis_primitives::{Permission, Uuid};
use trellis_registry::TraitsInstance;

use crate::cache::FixedSizeCache;
use crate::config::AccessConfig;
use crate::error::AccessError;
use crate::resolver::PermissionResolver;

static GLOBAL: LazyLock<AccessControl> = LazyLock::new(AccessControl::default);

/// Cache key of a positive decision. `user` is `None` for anonymous access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrantKey {
	pub node: Uuid,
	pub permission: Permission,
	pub user: Option<Uuid>,
}

/// Long-lived half of permission resolution: limits and the positive-result cache.
///
/// Only grants are cached, and nothing evicts them when the graph changes. A revoked
/// grant keeps answering `true` until its entry ages out or [`clear_cache`] is called.
///
/// [`clear_cache`]: AccessControl::clear_cache
pub struct AccessControl {
	config: AccessConfig,
	granted: FixedSizeCache<GrantKey, ()>,
}

impl Default for AccessControl {
	fn default() -> Self {
		Self::new(AccessConfig::default())
	}
}

impl AccessControl {
	pub fn new(config: AccessConfig) -> Self {
		let config = config.normalized();
		Self {
			granted: FixedSizeCache::new(config.cache_capacity),
			config,
		}
	}

	/// Process-wide instance with the default configuration.
	pub fn global() -> &'static AccessControl {
		&GLOBAL
	}

	pub fn config(&self) -> &AccessConfig {
		&self.config
	}

	/// Starts a resolution scope over one snapshot and store.
	///
	/// The resolver's propagation memo lives as long as it does, so keep one per
	/// transaction rather than per call.
	pub fn resolver<'a>(&'a self, instance: &'a TraitsInstance, store: &'a dyn GraphStore) -> PermissionResolver<'a> {
		PermissionResolver::new(self, instance, store)
	}

	/// One-off check through a fresh resolver.
	pub fn is_granted(
		&self,
		instance: &TraitsInstance,
		store: &dyn GraphStore,
		node: Uuid,
		permission: Permission,
		security: &SecurityContext,
		is_creation: bool,
	) -> Result<bool, AccessError> {
		self.resolver(instance, store)
			.is_granted(node, permission, security, is_creation)
	}

	pub fn is_cached(&self, key: &GrantKey) -> bool {
		self.granted.contains(key)
	}

	pub fn cached_grants(&self) -> usize {
		self.granted.len()
	}

	pub fn clear_cache(&self) {
		self.granted.clear();
	}

	pub(crate) fn recall(&self, key: &GrantKey) -> bool {
		self.granted.get(key).is_some()
	}

	pub(crate) fn remember(&self, key: GrantKey) {
		self.granted.insert(key, ());
	}
}
