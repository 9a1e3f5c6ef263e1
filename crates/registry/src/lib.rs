//! Trait composition engine.
//!
//! Types are composed from reusable traits. A [`TraitDefinition`] describes what a trait
//! contributes (property keys, lifecycle handlers, overridable framework methods, views,
//! facades); a [`TraitsInstance`] materializes definitions into [`Trait`]s and resolves each
//! registered type into a [`Traits`] composition; a [`Registry`] publishes snapshots and swaps
//! them atomically when the schema changes.
//!
//! # Resolution
//!
//! A type's declared trait names are flattened depth-first so that every trait follows the
//! traits it depends on, keeping the first occurrence of each. Lookups then follow three rules:
//!
//! - last wins for property keys, framework methods and dynamic methods;
//! - first wins for facades and the relationship shape;
//! - lifecycle handlers of all traits run, in resolution order.
//!
//! Each framework method receives a [`Super`] handle to the implementation it overrides.

pub mod builtins;
mod composition;
mod config;
mod definition;
mod error;
mod facade;
mod instance;
mod key;
mod method;
mod object;
mod registry;
mod relation;
mod runtime_trait;
mod schema;

#[cfg(test)]
mod tests;

pub use composition::{Traits, TypeDeclaration, TypeFlags};
pub use config::RegistryConfig;
pub use definition::{
	BasicTraitDefinition, FrameworkMethods, LifecycleMethods, TraitDefinition, Views, framework_methods, views,
};
pub use error::{ErrorBuffer, ErrorToken, FrameworkError, RegistryError};
pub use facade::FacadeFactory;
pub use instance::{NODE_BASE_TRAITS, RELATIONSHIP_BASE_TRAITS, TraitsInstance};
pub use key::{KeyFlags, PropertyKey, PropertyType};
pub use method::{
	AllowedBySchema, DynamicHandler, DynamicMethod, FrameworkKind, FrameworkMethod, FrameworkMethodKind,
	GetProperty, GetRelationships, IndexPassiveProperties, IsValid, LifecycleHandler, LifecycleKind,
	LifecycleMethod, MethodChain, SetProperty, Super,
};
pub use object::GraphObject;
pub use registry::{Registry, key, of};
pub use relation::Relation;
pub use runtime_trait::{Trait, VIEW_ALL, VIEW_CUSTOM, VIEW_PUBLIC, VIEW_UI};
pub use schema::{SchemaGrant, SchemaMethod, SchemaProperty};
