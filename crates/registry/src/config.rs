use serde::Deserialize;

use crate::error::RegistryError;

/// Registry settings.
///
/// ```toml
/// root_name = "root"
/// strict_property_conflicts = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
	/// Name of the root snapshot.
	pub root_name: String,
	/// Whether an unresolvable property redeclaration fails type resolution. When off, the
	/// conflict is logged and the last declaration wins.
	pub strict_property_conflicts: bool,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			root_name: "root".to_string(),
			strict_property_conflicts: true,
		}
	}
}

impl RegistryConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, RegistryError> {
		toml::from_str(input).map_err(|err| RegistryError::Config(err.to_string()))
	}
}
