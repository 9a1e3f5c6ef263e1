//! Property keys.
//!
//! A [`PropertyKey`] is an immutable, cheaply cloned handle. Redeclaring a key in a trait
//! produces a new handle; the previous one stays valid for whoever already holds it.

use std::fmt;
use std::sync::Arc;

use trellis_primitives::Value;

bitflags::bitflags! {
	/// Behavioral flags of a property key.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct KeyFlags: u16 {
		/// Placeholder declaration meant to be overridden.
		const ABSTRACT = 1 << 0;
		/// Defined by the runtime schema rather than compiled in.
		const DYNAMIC = 1 << 1;
		/// Only writable after `unlock_system_properties_once`.
		const SYSTEM = 1 << 2;
		/// Only writable after `unlock_read_only_properties_once` or as superuser.
		const READ_ONLY = 1 << 3;
		const INDEXED = 1 << 4;
		/// Indexed from a computed value at commit time.
		const PASSIVELY_INDEXED = 1 << 5;
		const UNIQUE = 1 << 6;
		/// Validation fails when the value is missing or blank.
		const NOT_NULL = 1 << 7;
	}
}

/// Value type of a property key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
	String,
	Boolean,
	Integer,
	Float,
	Date,
	Id,
	/// Reference to another entity, see [`PropertyKey::target_type`].
	Reference,
	List,
}

impl PropertyType {
	/// Returns true if `value` may be stored under a key of this type.
	pub fn accepts(self, value: &Value) -> bool {
		match (self, value) {
			(Self::String, Value::String(_)) => true,
			(Self::Boolean, Value::Bool(_)) => true,
			(Self::Integer, Value::Int(_)) => true,
			(Self::Float, Value::Float(_) | Value::Int(_)) => true,
			(Self::Date, Value::Date(_)) => true,
			(Self::Id | Self::Reference, v) => v.as_id().is_some(),
			(Self::List, Value::List(_)) => true,
			_ => false,
		}
	}
}

#[derive(Clone)]
struct KeyInner {
	name: Box<str>,
	db_name: Box<str>,
	value_type: PropertyType,
	flags: KeyFlags,
	default: Option<Value>,
	target_type: Option<Box<str>>,
	declaring_trait: Option<Box<str>>,
}

/// Typed, named handle to a property of a graph object.
#[derive(Clone)]
pub struct PropertyKey(Arc<KeyInner>);

impl PropertyKey {
	pub fn new(name: impl Into<Box<str>>, value_type: PropertyType) -> Self {
		let name = name.into();
		Self(Arc::new(KeyInner {
			db_name: name.clone(),
			name,
			value_type,
			flags: KeyFlags::empty(),
			default: None,
			target_type: None,
			declaring_trait: None,
		}))
	}

	pub fn string(name: impl Into<Box<str>>) -> Self {
		Self::new(name, PropertyType::String)
	}

	pub fn boolean(name: impl Into<Box<str>>) -> Self {
		Self::new(name, PropertyType::Boolean)
	}

	pub fn integer(name: impl Into<Box<str>>) -> Self {
		Self::new(name, PropertyType::Integer)
	}

	pub fn date(name: impl Into<Box<str>>) -> Self {
		Self::new(name, PropertyType::Date)
	}

	pub fn id(name: impl Into<Box<str>>) -> Self {
		Self::new(name, PropertyType::Id)
	}

	pub fn list(name: impl Into<Box<str>>) -> Self {
		Self::new(name, PropertyType::List)
	}

	/// Reference to an entity of `target_type`.
	pub fn reference(name: impl Into<Box<str>>, target_type: impl Into<Box<str>>) -> Self {
		let mut key = Self::new(name, PropertyType::Reference);
		key.inner_mut().target_type = Some(target_type.into());
		key
	}

	fn inner_mut(&mut self) -> &mut KeyInner {
		Arc::make_mut(&mut self.0)
	}

	pub fn with_flags(mut self, flags: KeyFlags) -> Self {
		self.inner_mut().flags |= flags;
		self
	}

	pub fn with_default(mut self, value: impl Into<Value>) -> Self {
		self.inner_mut().default = Some(value.into());
		self
	}

	/// Stores the property under a different raw name than its key name.
	pub fn with_db_name(mut self, db_name: impl Into<Box<str>>) -> Self {
		self.inner_mut().db_name = db_name.into();
		self
	}

	pub fn abstract_key(self) -> Self {
		self.with_flags(KeyFlags::ABSTRACT)
	}

	pub fn dynamic(self) -> Self {
		self.with_flags(KeyFlags::DYNAMIC)
	}

	pub fn system(self) -> Self {
		self.with_flags(KeyFlags::SYSTEM)
	}

	pub fn read_only(self) -> Self {
		self.with_flags(KeyFlags::READ_ONLY)
	}

	pub fn indexed(self) -> Self {
		self.with_flags(KeyFlags::INDEXED)
	}

	pub fn passively_indexed(self) -> Self {
		self.with_flags(KeyFlags::PASSIVELY_INDEXED)
	}

	pub fn unique(self) -> Self {
		self.with_flags(KeyFlags::UNIQUE)
	}

	pub fn not_null(self) -> Self {
		self.with_flags(KeyFlags::NOT_NULL)
	}

	/// Returns a copy of this key recorded as declared by `trait_name`.
	pub fn declared_by(&self, trait_name: &str) -> Self {
		let mut key = self.clone();
		key.inner_mut().declaring_trait = Some(trait_name.into());
		key
	}

	pub fn name(&self) -> &str {
		&self.0.name
	}

	/// Raw property name in the graph store.
	pub fn db_name(&self) -> &str {
		&self.0.db_name
	}

	pub fn value_type(&self) -> PropertyType {
		self.0.value_type
	}

	pub fn flags(&self) -> KeyFlags {
		self.0.flags
	}

	pub fn default_value(&self) -> Option<&Value> {
		self.0.default.as_ref()
	}

	pub fn target_type(&self) -> Option<&str> {
		self.0.target_type.as_deref()
	}

	pub fn declaring_trait(&self) -> Option<&str> {
		self.0.declaring_trait.as_deref()
	}

	pub fn is_abstract(&self) -> bool {
		self.0.flags.contains(KeyFlags::ABSTRACT)
	}

	pub fn is_dynamic(&self) -> bool {
		self.0.flags.contains(KeyFlags::DYNAMIC)
	}

	pub fn is_system(&self) -> bool {
		self.0.flags.contains(KeyFlags::SYSTEM)
	}

	pub fn is_read_only(&self) -> bool {
		self.0.flags.contains(KeyFlags::READ_ONLY)
	}

	pub fn is_not_null(&self) -> bool {
		self.0.flags.contains(KeyFlags::NOT_NULL)
	}

	pub fn is_passively_indexed(&self) -> bool {
		self.0.flags.contains(KeyFlags::PASSIVELY_INDEXED)
	}

	/// Returns true if both handles point at the same declaration.
	pub fn same_declaration(&self, other: &PropertyKey) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for PropertyKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PropertyKey")
			.field("name", &self.0.name)
			.field("type", &self.0.value_type)
			.field("flags", &self.0.flags)
			.field("declaring_trait", &self.0.declaring_trait)
			.finish()
	}
}

impl fmt::Display for PropertyKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0.name)
	}
}
