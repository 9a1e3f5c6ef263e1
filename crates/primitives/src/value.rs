use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A property value stored on a node or relationship.
///
/// Absence is modelled with `Option<Value>` by the containers, so there is no null variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
	/// Boolean value.
	Bool(bool),
	/// Signed integer value.
	Int(i64),
	/// Floating point value.
	Float(f64),
	/// String value.
	String(String),
	/// Timestamp value.
	Date(DateTime<Utc>),
	/// Reference to another entity.
	Id(Uuid),
	/// Ordered collection of values.
	List(Vec<Value>),
}

impl Value {
	/// Returns the boolean value if this is a `Bool` variant.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the integer value if this is an `Int` variant.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the string value if this is a `String` variant.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the referenced id if this is an `Id` variant.
	///
	/// Strings holding a valid UUID are accepted too, since schema-defined
	/// reference properties are frequently written as plain strings.
	pub fn as_id(&self) -> Option<Uuid> {
		match self {
			Value::Id(id) => Some(*id),
			Value::String(s) => Uuid::parse_str(s).ok(),
			_ => None,
		}
	}

	/// Returns the list items if this is a `List` variant.
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	/// Returns the type name of this value.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::String(_) => "string",
			Value::Date(_) => "date",
			Value::Id(_) => "id",
			Value::List(_) => "list",
		}
	}

	/// Returns true if the value is an empty string or an empty list.
	pub fn is_blank(&self) -> bool {
		match self {
			Value::String(s) => s.trim().is_empty(),
			Value::List(items) => items.is_empty(),
			_ => false,
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_string())
	}
}

impl From<Uuid> for Value {
	fn from(v: Uuid) -> Self {
		Value::Id(v)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(v: DateTime<Utc>) -> Self {
		Value::Date(v)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(v: Vec<T>) -> Self {
		Value::List(v.into_iter().map(Into::into).collect())
	}
}
