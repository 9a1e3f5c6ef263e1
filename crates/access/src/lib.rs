//! Permission resolution for access-controllable nodes.
//!
//! An [`AccessControl`] holds the limits from [`AccessConfig`] and a bounded cache of
//! positive decisions shared by every request. A [`PermissionResolver`] borrows it together
//! with one registry snapshot and one [`GraphStore`](trellis_graph::GraphStore) and answers
//! `is_granted` / `is_visible` questions, remembering propagation results for its own
//! lifetime.
//!
//! Permissions reach a principal through admin status, schema grants, ownership, explicit
//! `SECURITY` relationships, enclosing groups and relationships whose type propagates
//! permissions from one endpoint to the other.

mod cache;
mod config;
mod control;
mod error;
mod resolver;

pub use cache::FixedSizeCache;
pub use config::{AccessConfig, ConfigError};
pub use control::{AccessControl, GrantKey};
pub use error::AccessError;
pub use resolver::PermissionResolver;
