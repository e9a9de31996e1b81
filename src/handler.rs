//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! A pipeline holds handlers of *different* closure types, and a factory
//! hands out a fresh one on every dispatch. Rust collections can only hold
//! one concrete type, so handlers are erased behind `dyn ErasedHandler<C>`.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! |cx, next| async move { … }                 ← user writes this
//!        ↓ a factory returns it
//! handler.into_boxed_handler()                ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(handler))                ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler<C> = Arc<dyn ErasedHandler<C>>
//! handler.call(cx, next)  at dispatch time    ← one vtable dispatch
//!        ↓
//! Box::pin(async { fut.await.into_outcome() }) ← BoxFuture
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::next::Next;
use crate::outcome::{IntoOutcome, Outcome};

/// A heap-allocated, type-erased future.
///
/// `Send + 'a` lets tokio move the future across worker threads; every
/// future the engine hands out is `'static`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler<C> {
    fn call(&self, cx: Context<C>, next: Next<C>) -> BoxFuture<'static, Outcome<C>>;
}

/// A type-erased handler. `Arc` so a terminal continuation can be shared by
/// every execution of the same onion.
pub type BoxedHandler<C> = Arc<dyn ErasedHandler<C> + Send + Sync + 'static>;

/// Implemented for every valid layer handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the shape
///
/// ```text
/// Fn(Context<C>, Next<C>) -> impl Future<Output = impl IntoOutcome<C>>
/// ```
///
/// Sealed via the private `Sealed` supertrait: only the blanket impl below
/// can satisfy it.
pub trait Handler<C>: private::Sealed<C> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<C>;
}

mod private {
    pub trait Sealed<C> {}
}

impl<C, F, Fut, R> private::Sealed<C> for F
where
    F: Fn(Context<C>, Next<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome<C> + Send + 'static,
{
}

impl<C, F, Fut, R> Handler<C> for F
where
    C: 'static,
    F: Fn(Context<C>, Next<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome<C> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<C> {
        Arc::new(FnHandler(self))
    }
}

/// Erases `handler`. Useful for passing a terminal to
/// [`Pipeline::run`](crate::Pipeline::run).
pub fn boxed<C: 'static>(handler: impl Handler<C>) -> BoxedHandler<C> {
    handler.into_boxed_handler()
}

/// Newtype bridging a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<C, F, Fut, R> ErasedHandler<C> for FnHandler<F>
where
    C: 'static,
    F: Fn(Context<C>, Next<C>) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome<C> + Send + 'static,
{
    fn call(&self, cx: Context<C>, next: Next<C>) -> BoxFuture<'static, Outcome<C>> {
        // The synchronous part of the handler runs here, before the future
        // exists. Callers wrap this in `catch_unwind`.
        let fut = (self.0)(cx, next);
        Box::pin(async move { fut.await.into_outcome() })
    }
}
