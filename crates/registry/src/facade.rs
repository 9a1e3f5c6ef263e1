use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::object::GraphObject;

type Build = dyn Fn(&GraphObject<'_>) -> Result<Box<dyn Any + Send>, RegistryError> + Send + Sync;

/// Wraps a graph object into a typed facade value.
#[derive(Clone)]
pub struct FacadeFactory {
	type_id: TypeId,
	type_name: &'static str,
	build: Arc<Build>,
}

impl FacadeFactory {
	pub fn of<F, B>(build: B) -> Self
	where
		F: Any + Send,
		B: Fn(&GraphObject<'_>) -> Result<F, RegistryError> + Send + Sync + 'static,
	{
		Self {
			type_id: TypeId::of::<F>(),
			type_name: std::any::type_name::<F>(),
			build: Arc::new(move |object: &GraphObject<'_>| -> Result<Box<dyn Any + Send>, RegistryError> {
				Ok(Box::new(build(object)?))
			}),
		}
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Builds the facade. Fails with `NoFacade` if `F` is not the type this factory produces.
	pub fn build<F: Any>(&self, object: &GraphObject<'_>) -> Result<F, RegistryError> {
		let no_facade = || RegistryError::NoFacade {
			type_name: object.type_name().to_string(),
			facade: std::any::type_name::<F>(),
		};
		if self.type_id != TypeId::of::<F>() {
			return Err(no_facade());
		}
		let facade = (self.build)(object)?;
		facade.downcast::<F>().map(|boxed| *boxed).map_err(|_| no_facade())
	}
}

impl fmt::Debug for FacadeFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("FacadeFactory").field(&self.type_name).finish()
	}
}
