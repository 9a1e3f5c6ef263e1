use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An operation a principal may be granted on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
	/// Read the node and its properties.
	Read,
	/// Modify the node's properties.
	Write,
	/// Delete the node.
	Delete,
	/// Change ownership and security grants of the node.
	AccessControl,
}

impl Permission {
	/// All permissions in declaration order.
	pub const ALL: [Permission; 4] = [
		Permission::Read,
		Permission::Write,
		Permission::Delete,
		Permission::AccessControl,
	];

	/// Returns the bitflag for this permission.
	pub const fn as_set(self) -> PermissionSet {
		match self {
			Self::Read => PermissionSet::READ,
			Self::Write => PermissionSet::WRITE,
			Self::Delete => PermissionSet::DELETE,
			Self::AccessControl => PermissionSet::ACCESS_CONTROL,
		}
	}

	/// Returns the canonical name used in security relationships and cache keys.
	pub const fn name(self) -> &'static str {
		match self {
			Self::Read => "read",
			Self::Write => "write",
			Self::Delete => "delete",
			Self::AccessControl => "accessControl",
		}
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Error returned when parsing an unknown permission name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0:?}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
	type Err = UnknownPermission;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"read" => Ok(Self::Read),
			"write" => Ok(Self::Write),
			"delete" => Ok(Self::Delete),
			"accessControl" | "access_control" => Ok(Self::AccessControl),
			other => Err(UnknownPermission(other.to_string())),
		}
	}
}

bitflags::bitflags! {
	/// A set of permissions.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct PermissionSet: u8 {
		/// Read access.
		const READ = 1 << 0;
		/// Write access.
		const WRITE = 1 << 1;
		/// Delete access.
		const DELETE = 1 << 2;
		/// Access control.
		const ACCESS_CONTROL = 1 << 3;
	}
}

impl PermissionSet {
	/// Returns true if the set contains the given permission.
	pub const fn allows(self, permission: Permission) -> bool {
		self.contains(permission.as_set())
	}

	/// Returns the permissions in this set in declaration order.
	pub fn permissions(self) -> impl Iterator<Item = Permission> {
		Permission::ALL.into_iter().filter(move |p| self.allows(*p))
	}
}

impl From<Permission> for PermissionSet {
	fn from(permission: Permission) -> Self {
		permission.as_set()
	}
}

impl FromIterator<Permission> for PermissionSet {
	fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
		let mut set = PermissionSet::empty();
		for permission in iter {
			set |= permission.as_set();
		}
		set
	}
}
