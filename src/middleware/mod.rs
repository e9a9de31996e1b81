//! Middleware layer.
//!
//! A middleware is a *factory*: every time the dispatcher reaches its layer
//! it asks for a fresh handler. Plain closures returning a handler are
//! middleware already:
//!
//! ```rust
//! use onion::{Context, Error, Next, Onion};
//! use serde_json::{Value, json};
//!
//! let onion = Onion::<Value>::new().layer(|| |cx: Context<Value>, next: Next<Value>| async move {
//!     cx.update(|c| c["entered"] = json!(true));
//!     next.run().await?;
//!     Ok::<_, Error>(())
//! });
//! assert_eq!(onion.len(), 1);
//! ```
//!
//! Implement [`Middleware`] by hand when the layer carries configuration or
//! needs a stable [`name`](Middleware::name) in traces.

use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};

/// A type-erased middleware, shared by the list and every pipeline built
/// from it.
pub type BoxedMiddleware<C> = Arc<dyn Middleware<C>>;

/// Produces the handler for one layer.
pub trait Middleware<C>: Send + Sync + 'static {
    /// Called once per dispatch of this layer.
    fn handler(&self) -> BoxedHandler<C>;

    /// Label used in trace events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<C, F, H> Middleware<C> for F
where
    F: Fn() -> H + Send + Sync + 'static,
    H: Handler<C>,
{
    fn handler(&self) -> BoxedHandler<C> {
        (self)().into_boxed_handler()
    }
}

/// Erases `middleware` so it can be stored next to other kinds of layer.
pub fn boxed<C: 'static>(middleware: impl Middleware<C>) -> BoxedMiddleware<C> {
    Arc::new(middleware)
}
