//! Collaborator contracts consumed by the trait engine.
//!
//! The engine never assumes a storage backend. It reads and writes properties through
//! [`PropertyContainer`], walks relationships through [`GraphStore`], and reports changes and
//! privilege through [`TransactionContext`]. [`MemoryGraph`] is a complete in-process store
//! implementing these contracts.

pub mod container;
pub mod context;
pub mod error;
pub mod memory;
pub mod store;

pub use container::{Entity, PropertyContainer};
pub use context::{ModificationQueue, PropertyChange, SecurityContext, TransactionContext};
pub use error::GraphError;
pub use memory::MemoryGraph;
pub use store::{EntityInfo, EntityKind, GraphStore, RelationshipDegree, RelationshipRecord};
