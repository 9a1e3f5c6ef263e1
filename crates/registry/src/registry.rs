//! Root and current snapshots.
//!
//! Readers load the current snapshot lock-free and keep it for as long as they need a
//! consistent view. Schema changes build a copy of the root off to the side, resolve it and
//! swap it in as a whole, so a reader never observes a partially updated schema.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use chrono::Utc;
use tracing::debug;

use crate::builtins;
use crate::composition::Traits;
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::instance::TraitsInstance;
use crate::key::PropertyKey;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Owner of the root snapshot and the atomically replaceable current one.
pub struct Registry {
	root: Arc<TraitsInstance>,
	current: ArcSwap<TraitsInstance>,
	copies: AtomicU64,
}

impl Registry {
	/// Publishes `root` as both root and current snapshot after resolving every type.
	pub fn new(root: TraitsInstance) -> Result<Self, RegistryError> {
		root.resolve_all()?;
		let root = Arc::new(root);
		Ok(Self {
			current: ArcSwap::new(Arc::clone(&root)),
			root,
			copies: AtomicU64::new(0),
		})
	}

	/// Registry whose root holds the builtin traits and types.
	pub fn with_builtins() -> Result<Self, RegistryError> {
		Self::with_config(&RegistryConfig::default())
	}

	pub fn with_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
		let mut root = TraitsInstance::with_config(config.root_name.as_str(), config);
		builtins::install(&mut root)?;
		Self::new(root)
	}

	/// The process-wide registry, created with builtins on first use.
	pub fn global() -> Result<&'static Registry, RegistryError> {
		if let Some(registry) = GLOBAL.get() {
			return Ok(registry);
		}
		let registry = Self::with_builtins()?;
		Ok(GLOBAL.get_or_init(|| registry))
	}

	pub fn root(&self) -> Arc<TraitsInstance> {
		Arc::clone(&self.root)
	}

	/// The snapshot all lookups currently go to.
	pub fn current(&self) -> Arc<TraitsInstance> {
		self.current.load_full()
	}

	/// Fresh, unpublished copy of the root, named from the current UTC time and a counter.
	pub fn create_copy_of_root_instance(&self) -> TraitsInstance {
		let sequence = self.copies.fetch_add(1, Ordering::Relaxed);
		let name = format!("{}-{sequence}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
		self.root.create_copy(name)
	}

	/// Resolves `instance` and makes it the current snapshot. Returns the one it replaced.
	///
	/// Resolution happens before the swap; a broken snapshot is never published.
	pub fn replace_current_instance(&self, instance: TraitsInstance) -> Result<Arc<TraitsInstance>, RegistryError> {
		instance.resolve_all()?;
		let instance = Arc::new(instance);
		let previous = self.current.swap(Arc::clone(&instance));
		debug!(
			domain = "registry",
			previous = previous.name(),
			current = instance.name(),
			"published snapshot"
		);
		Ok(previous)
	}

	/// Resolved composition of a type in the current snapshot.
	pub fn of(&self, type_name: &str) -> Result<Arc<Traits>, RegistryError> {
		self.current.load().traits_of(type_name)
	}

	/// Effective key of a type in the current snapshot.
	pub fn key(&self, type_name: &str, name: &str) -> Result<PropertyKey, RegistryError> {
		self.current.load().key(type_name, name)
	}
}

/// [`Registry::of`] on the global registry.
pub fn of(type_name: &str) -> Result<Arc<Traits>, RegistryError> {
	Registry::global()?.of(type_name)
}

/// [`Registry::key`] on the global registry.
pub fn key(type_name: &str, name: &str) -> Result<PropertyKey, RegistryError> {
	Registry::global()?.key(type_name, name)
}
