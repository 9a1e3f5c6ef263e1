use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Limits and switches of permission resolution.
///
/// ```toml
/// max_recursion_depth = 300
/// max_propagation_level = 300
/// max_relationship_fanout = 1000
/// cache_capacity = 10000
/// resolve_permissions = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
	/// Nesting depth past which a check is denied.
	pub max_recursion_depth: usize,
	/// Propagation search levels explored before giving up.
	pub max_propagation_level: usize,
	/// Relationship types with more relationships than this on a node do not propagate.
	pub max_relationship_fanout: usize,
	/// Entries in the positive-result cache.
	pub cache_capacity: usize,
	/// Whether top-level checks search permission-propagating relationships.
	pub resolve_permissions: bool,
}

impl Default for AccessConfig {
	fn default() -> Self {
		Self {
			max_recursion_depth: 300,
			max_propagation_level: 300,
			max_relationship_fanout: 1000,
			cache_capacity: 10_000,
			resolve_permissions: true,
		}
	}
}

/// Errors reading an [`AccessConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("I/O error reading {}: {error}", path.display())]
	Io { path: PathBuf, error: std::io::Error },

	#[error("invalid access configuration: {0}")]
	Parse(#[from] toml::de::Error),
}

impl AccessConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		Ok(config.normalized())
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	/// Raises a zero cache capacity to one.
	pub fn normalized(mut self) -> Self {
		if self.cache_capacity == 0 {
			warn!(domain = "access", "cache_capacity of 0 raised to 1");
			self.cache_capacity = 1;
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn partial_files_keep_defaults() {
		let config = AccessConfig::from_toml_str("max_relationship_fanout = 50\nresolve_permissions = false").unwrap();
		assert_eq!(
			config,
			AccessConfig {
				max_relationship_fanout: 50,
				resolve_permissions: false,
				..AccessConfig::default()
			}
		);
	}

	#[test]
	fn zero_capacity_is_raised() {
		let config = AccessConfig::from_toml_str("cache_capacity = 0").unwrap();
		assert_eq!(config.cache_capacity, 1);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = AccessConfig::from_toml_str("max_depth = 3").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn loads_from_disk() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "max_recursion_depth = 12").unwrap();
		let config = AccessConfig::load(file.path()).unwrap();
		assert_eq!(config.max_recursion_depth, 12);
		assert_eq!(config.max_propagation_level, 300);

		let missing = file.path().with_extension("missing");
		assert!(matches!(AccessConfig::load(&missing), Err(ConfigError::Io { .. })));
	}
}
