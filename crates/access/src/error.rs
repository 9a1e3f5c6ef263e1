use trellis_graph::GraphError;
use trellis_registry::RegistryError;

/// Failure to evaluate a permission.
///
/// Denial is never an error; these are lookups that failed underneath the check and point
/// at a broken graph or schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
	#[error(transparent)]
	Registry(#[from] RegistryError),

	#[error(transparent)]
	Graph(#[from] GraphError),
}
