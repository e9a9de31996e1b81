//! The composer: an immutable, ordered layer list ready to run.
//!
//! A [`Pipeline`] is cheap to clone (one `Arc`) and holds no per-run state.
//! Each call to [`Pipeline::run`] starts a fresh cursor, so two runs of the
//! same pipeline, sequential or concurrent, never see each other.

use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::handler::{BoxFuture, BoxedHandler};
use crate::middleware::BoxedMiddleware;
use crate::next::{Dispatch, dispatch};
use crate::outcome::Outcome;

/// A composed middleware stack.
pub struct Pipeline<C> {
    layers: Arc<[BoxedMiddleware<C>]>,
}

impl<C: Send + 'static> Pipeline<C> {
    pub fn new(layers: impl IntoIterator<Item = BoxedMiddleware<C>>) -> Self {
        let layers: Arc<[BoxedMiddleware<C>]> = layers.into_iter().collect();
        debug!(layers = layers.len(), "pipeline composed");
        Self { layers }
    }

    /// Runs every layer against `cx`.
    ///
    /// `terminal`, when given, is entered after the last layer calls `next`.
    /// Resolves with whatever the outermost layer resolves to; an empty
    /// pipeline without a terminal resolves `Ok(None)`.
    pub fn run(
        &self,
        cx: Context<C>,
        terminal: Option<BoxedHandler<C>>,
    ) -> BoxFuture<'static, Outcome<C>> {
        let state = Arc::new(Dispatch::new(Arc::clone(&self.layers), terminal, cx));
        dispatch(state, 0)
    }
}

impl<C> Pipeline<C> {
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self { layers: Arc::clone(&self.layers) }
    }
}
