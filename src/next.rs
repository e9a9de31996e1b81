//! The dispatcher: one `dispatch(i)` step per layer.
//!
//! Every run owns a `Dispatch` state, shared by all the [`Next`] handles
//! created during that run. The state carries the layer list, the optional
//! terminal continuation, the execution-local context and the cursor.
//!
//! # The cursor
//!
//! `entered` counts the layers reached so far. Entering layer `i` requires
//! `i >= entered`, and sets `entered = i + 1`. A layer calling `next` twice
//! asks for the same index again and fails with
//! [`Error::NextCalledMultipleTimes`].
//!
//! # Past the end
//!
//! Index `N` (one past the last layer) runs the terminal continuation if
//! there is one. Anything without a handler resolves `Ok(None)`: a layer
//! that calls `next` at the bottom of the stack never fails for it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use tracing::{trace, warn};

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler};
use crate::middleware::BoxedMiddleware;
use crate::outcome::Outcome;

/// Continuation handed to every layer.
///
/// [`Next::run`] enters the following layer and resolves with whatever that
/// layer resolves to. Cloning a `Next` does not grant a second call: all
/// clones share the run's cursor.
pub struct Next<C> {
    state: Arc<Dispatch<C>>,
    index: usize,
}

pub(crate) struct Dispatch<C> {
    layers: Arc<[BoxedMiddleware<C>]>,
    terminal: Option<BoxedHandler<C>>,
    cx: Context<C>,
    entered: AtomicUsize,
}

impl<C: Send + 'static> Next<C> {
    /// Enters the next layer.
    ///
    /// The cursor is checked right away, not when the returned future is
    /// first polled.
    pub fn run(&self) -> BoxFuture<'static, Outcome<C>> {
        dispatch(Arc::clone(&self.state), self.index)
    }

    /// Position of the layer this continuation enters.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<C> Clone for Next<C> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state), index: self.index }
    }
}

impl<C> std::fmt::Debug for Next<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("layers", &self.state.layers.len())
            .finish()
    }
}

impl<C> Dispatch<C> {
    pub(crate) fn new(
        layers: Arc<[BoxedMiddleware<C>]>,
        terminal: Option<BoxedHandler<C>>,
        cx: Context<C>,
    ) -> Self {
        Self { layers, terminal, cx, entered: AtomicUsize::new(0) }
    }

    fn enter(&self, index: usize) -> Result<(), Error> {
        self.entered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |entered| {
                (index >= entered).then_some(index + 1)
            })
            .map(|_| ())
            .map_err(|_| Error::NextCalledMultipleTimes)
    }
}

enum Slot<C> {
    Layer(BoxedMiddleware<C>),
    Terminal(BoxedHandler<C>),
}

/// Runs layer `index` of `state`.
pub(crate) fn dispatch<C: Send + 'static>(
    state: Arc<Dispatch<C>>,
    index: usize,
) -> BoxFuture<'static, Outcome<C>> {
    if let Err(e) = state.enter(index) {
        warn!(layer = index, "next() called multiple times");
        return Box::pin(std::future::ready(Err(e)));
    }

    let slot = match (state.layers.get(index), &state.terminal) {
        (Some(layer), _) => Slot::Layer(Arc::clone(layer)),
        (None, Some(terminal)) if index == state.layers.len() => {
            Slot::Terminal(Arc::clone(terminal))
        }
        _ => {
            trace!(layer = index, "end of stack");
            return Box::pin(std::future::ready(Ok(None)));
        }
    };

    let cx = state.cx.clone();
    let next = Next { state, index: index + 1 };

    let fut = async move {
        let handler = match slot {
            Slot::Layer(layer) => {
                trace!(layer = index, middleware = layer.name(), "entering layer");
                layer.handler()
            }
            Slot::Terminal(terminal) => {
                trace!(layer = index, "entering terminal");
                terminal
            }
        };
        handler.call(cx, next).await
    };

    // Factory panics, panics in the synchronous part of a handler and
    // panics while polling its future all land here.
    Box::pin(
        AssertUnwindSafe(fut)
            .catch_unwind()
            .map(|res| res.unwrap_or_else(|payload| Err(Error::from_panic(payload)))),
    )
}
