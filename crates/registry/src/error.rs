use std::fmt;

use trellis_graph::GraphError;

/// Configuration errors: a broken trait or type definition, never an access decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	/// No type with this name is registered.
	#[error("unknown type: {type_name}")]
	UnknownType { type_name: String },

	/// A type composes a trait that is not registered.
	#[error("type {type_name} composes unknown trait {trait_name}")]
	UnknownTrait { type_name: String, trait_name: String },

	/// A required property key does not exist on the type.
	#[error("type {type_name} has no property key {key}")]
	MissingKey { type_name: String, key: String },

	/// No trait of the type provides a facade of the requested kind.
	#[error("type {type_name} provides no {facade} facade")]
	NoFacade { type_name: String, facade: &'static str },

	/// Two traits declare the same property and neither overrides the other.
	#[error(
		"type {type_name}: property {key} declared by both {existing} and {incoming}, neither abstract"
	)]
	PropertyConflict {
		type_name: String,
		key: String,
		existing: String,
		incoming: String,
	},

	/// A trait with this name is already registered in the snapshot.
	#[error("duplicate trait: {name}")]
	DuplicateTrait { name: String },

	/// A type with this name is already registered in the snapshot.
	#[error("duplicate type: {name}")]
	DuplicateType { name: String },

	/// The entity is missing from the graph.
	#[error("unknown entity: {0}")]
	UnknownEntity(#[from] GraphError),

	/// Configuration could not be parsed.
	#[error("invalid registry configuration: {0}")]
	Config(String),
}

/// A structured validation failure on one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorToken {
	pub type_name: String,
	pub property: Option<String>,
	/// Machine-readable failure token, e.g. `"must_not_be_empty"`.
	pub token: &'static str,
	pub detail: Option<String>,
}

impl fmt::Display for ErrorToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.type_name)?;
		if let Some(property) = &self.property {
			write!(f, ".{property}")?;
		}
		write!(f, ": {}", self.token)?;
		if let Some(detail) = &self.detail {
			write!(f, " ({detail})")?;
		}
		Ok(())
	}
}

/// Collects validation tokens raised while validating or modifying an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBuffer {
	tokens: Vec<ErrorToken>,
}

impl ErrorBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, token: ErrorToken) {
		self.tokens.push(token);
	}

	/// Adds a token for `property` of `type_name`.
	pub fn add_property_error(&mut self, type_name: &str, property: &str, token: &'static str) {
		self.add(ErrorToken {
			type_name: type_name.to_string(),
			property: Some(property.to_string()),
			token,
			detail: None,
		});
	}

	pub fn tokens(&self) -> &[ErrorToken] {
		&self.tokens
	}

	pub fn has_error(&self) -> bool {
		!self.tokens.is_empty()
	}

	/// Returns true if a token with this name was raised for `property`.
	pub fn contains(&self, property: &str, token: &str) -> bool {
		self.tokens
			.iter()
			.any(|t| t.token == token && t.property.as_deref() == Some(property))
	}
}

impl fmt::Display for ErrorBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, token) in self.tokens.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{token}")?;
		}
		Ok(())
	}
}

/// Failure of a lifecycle or framework method.
///
/// These propagate unmodified through lifecycle fan-out and framework super chains so the
/// enclosing transaction can roll back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameworkError {
	#[error("property {key} of {type_name} is read-only")]
	ReadOnlyProperty { type_name: String, key: String },

	#[error("property {key} of {type_name} is an internal system property")]
	SystemProperty { type_name: String, key: String },

	#[error("validation failed: {0}")]
	Validation(ErrorBuffer),

	#[error(transparent)]
	Graph(#[from] GraphError),

	#[error(transparent)]
	Registry(#[from] RegistryError),

	/// Raised by a handler for reasons of its own.
	#[error("{message}")]
	Handler { message: String },
}

impl FrameworkError {
	pub fn handler(message: impl Into<String>) -> Self {
		Self::Handler {
			message: message.into(),
		}
	}
}
