//! Run-time validation of dynamically-typed middleware input.
//!
//! The typed API cannot be handed a malformed stack: a
//! `Vec<BoxedMiddleware<C>>` is a stack of middleware by construction. These
//! checks exist for values that arrive as `&dyn Any`, e.g. from a plugin
//! registry, and fail with the same errors a caller of the typed API would
//! otherwise have been protected from at compile time.
//!
//! | Input                                   | Result                     |
//! |-----------------------------------------|----------------------------|
//! | `Vec<BoxedMiddleware<C>>`               | accepted                   |
//! | `Vec<Box<dyn Any + Send + Sync>>`       | every element checked      |
//! | `Vec<Box<dyn Any>>`                     | every element checked      |
//! | anything else                           | [`Error::NotAStack`]       |
//!
//! An element is accepted only if it is a `BoxedMiddleware<C>`; otherwise
//! [`Error::NotAMiddleware`].

use std::any::Any;

use crate::error::Error;
use crate::middleware::BoxedMiddleware;

/// Validates a whole stack.
pub fn stack<C: 'static>(candidate: &dyn Any) -> Result<Vec<BoxedMiddleware<C>>, Error> {
    if let Some(layers) = candidate.downcast_ref::<Vec<BoxedMiddleware<C>>>() {
        return Ok(layers.clone());
    }
    if let Some(items) = candidate.downcast_ref::<Vec<Box<dyn Any + Send + Sync>>>() {
        return items.iter().map(|item| middleware::<C>(&**item)).collect();
    }
    if let Some(items) = candidate.downcast_ref::<Vec<Box<dyn Any>>>() {
        return items.iter().map(|item| middleware::<C>(&**item)).collect();
    }
    Err(Error::NotAStack)
}

/// Validates a single middleware.
pub fn middleware<C: 'static>(candidate: &dyn Any) -> Result<BoxedMiddleware<C>, Error> {
    candidate
        .downcast_ref::<BoxedMiddleware<C>>()
        .cloned()
        .ok_or(Error::NotAMiddleware)
}
