//! The orchestrator.
//!
//! [`Onion`] owns the default middleware list, caches the pipeline composed
//! from it, and runs executions against an isolated copy of the caller's
//! context.
//!
//! # Caching
//!
//! The default list is composed once, on the first [`Onion::execute`], and
//! reused until the list changes. Registration takes `&mut self`, so the
//! cache is dropped in the same borrow that changes the list: an execution
//! can never observe a pipeline built from a stale list. Override lists
//! passed to [`Onion::execute_with`] are composed fresh and never cached.
//!
//! # Isolation
//!
//! Every execution works on a [`Context::detached`] copy of the input. The
//! caller's value is never touched, and two executions never share state.

use std::any::Any;
use std::sync::OnceLock;

use tracing::{Instrument, debug, debug_span};

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::{self, BoxedMiddleware, Middleware};
use crate::pipeline::Pipeline;
use crate::validate;

/// An ordered middleware stack and its execution entry points.
///
/// Build it once, then execute it as often as needed. Each
/// [`layer`](Onion::layer) call returns `self` so registrations chain:
///
/// ```rust
/// use onion::{Context, Error, Next, Onion};
/// use serde_json::{Value, json};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Error> {
/// let onion = Onion::<Value>::new()
///     .layer(|| |cx: Context<Value>, next: Next<Value>| async move {
///         cx.update(|c| c["counter"] = json!(1));
///         next.run().await?;
///         Ok::<_, Error>(())
///     })
///     .layer(|| |cx: Context<Value>, _next: Next<Value>| async move {
///         cx.update(|c| {
///             let n = c["counter"].as_i64().unwrap_or(0);
///             c["counter"] = json!(n + 1);
///         });
///     });
///
/// let input = json!({});
/// let output = onion.execute(&input).await?;
///
/// assert_eq!(output, json!({ "counter": 2 }));
/// assert_eq!(input, json!({}));
/// # Ok(())
/// # }
/// ```
pub struct Onion<C> {
    middlewares: Vec<BoxedMiddleware<C>>,
    terminal: Option<BoxedHandler<C>>,
    cache: OnceLock<Pipeline<C>>,
}

impl<C> Onion<C>
where
    C: Clone + Send + 'static,
{
    /// An onion with no layers.
    pub fn new() -> Self {
        Self::with_middlewares(Vec::new())
    }

    /// An onion with the given layers, in order.
    pub fn with_middlewares(middlewares: impl IntoIterator<Item = BoxedMiddleware<C>>) -> Self {
        Self {
            middlewares: middlewares.into_iter().collect(),
            terminal: None,
            cache: OnceLock::new(),
        }
    }

    /// Builds an onion from a dynamically-typed stack.
    ///
    /// Fails with [`Error::NotAStack`] or [`Error::NotAMiddleware`]; see
    /// [`validate`](crate::validate) for the accepted shapes.
    pub fn try_new(candidate: &dyn Any) -> Result<Self, Error> {
        validate::stack::<C>(candidate).map(Self::with_middlewares)
    }

    /// Appends a layer. Returns `self` for chaining.
    pub fn layer(mut self, middleware: impl Middleware<C>) -> Self {
        self.use_middleware(middleware);
        self
    }

    /// Sets the continuation entered after the last layer calls `next`.
    pub fn terminal(mut self, handler: impl Handler<C>) -> Self {
        self.terminal = Some(handler.into_boxed_handler());
        self.invalidate();
        self
    }

    /// Appends a layer to the default list.
    pub fn use_middleware(&mut self, middleware: impl Middleware<C>) -> &mut Self {
        self.push(middleware::boxed(middleware))
    }

    /// Appends a dynamically-typed layer.
    ///
    /// On [`Error::NotAMiddleware`] the list is left unchanged.
    pub fn try_use(&mut self, candidate: &dyn Any) -> Result<&mut Self, Error> {
        let middleware = validate::middleware::<C>(candidate)?;
        Ok(self.push(middleware))
    }

    fn push(&mut self, middleware: BoxedMiddleware<C>) -> &mut Self {
        debug!(middleware = middleware.name(), position = self.middlewares.len(), "middleware registered");
        self.middlewares.push(middleware);
        self.invalidate();
        self
    }

    fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            debug!("cached pipeline invalidated");
        }
    }

    /// The pipeline for the default list, composed on first use.
    pub fn compose(&self) -> Pipeline<C> {
        self.cache
            .get_or_init(|| Pipeline::new(self.middlewares.iter().cloned()))
            .clone()
    }

    /// Whether the default list currently has a cached pipeline.
    pub fn is_composed(&self) -> bool {
        self.cache.get().is_some()
    }

    pub fn middlewares(&self) -> &[BoxedMiddleware<C>] {
        &self.middlewares
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs the default list against a copy of `context`.
    ///
    /// Resolves with the value the outermost layer resolved with, or, when it
    /// resolved with nothing, with the copy of the context as the layers left
    /// it. Any error is returned unchanged.
    pub fn execute(&self, context: &C) -> BoxFuture<'static, Result<C, Error>> {
        self.launch(self.compose(), context)
    }

    /// Like [`execute`](Onion::execute) but with `middlewares` instead of the
    /// default list. The override is composed for this call only.
    pub fn execute_with(
        &self,
        context: &C,
        middlewares: impl IntoIterator<Item = BoxedMiddleware<C>>,
    ) -> BoxFuture<'static, Result<C, Error>> {
        self.launch(Pipeline::new(middlewares), context)
    }

    /// Like [`execute_with`](Onion::execute_with) for a dynamically-typed
    /// override. A validation failure is the execution's error.
    pub fn execute_any(
        &self,
        context: &C,
        candidate: &dyn Any,
    ) -> BoxFuture<'static, Result<C, Error>> {
        match validate::stack::<C>(candidate) {
            Ok(middlewares) => self.execute_with(context, middlewares),
            Err(e) => {
                debug!(error = %e, "override stack rejected");
                Box::pin(std::future::ready(Err(e)))
            }
        }
    }

    fn launch(&self, pipeline: Pipeline<C>, context: &C) -> BoxFuture<'static, Result<C, Error>> {
        let cx = Context::detached(context);
        let terminal = self.terminal.clone();
        let span = debug_span!("onion.execute", layers = pipeline.len());

        Box::pin(
            async move {
                match pipeline.run(cx.clone(), terminal).await {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => Ok(cx.into_inner()),
                    Err(e) => {
                        debug!(error = %e, kind = ?e.kind(), "execution rejected");
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }
}

impl<C> Default for Onion<C>
where
    C: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
