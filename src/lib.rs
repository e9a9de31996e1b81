//! # onion
//!
//! Onion-model middleware composition for Rust.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! An ordered list of layers runs over one shared, mutable context. Each
//! layer may do work, call `next` to enter the layer below, and do more work
//! once the layers below have settled:
//!
//! ```text
//! execute(ctx) ─▶ layer 0 ─▶ layer 1 ─▶ … ─▶ layer N-1 ─▶ terminal
//!                   │           │               │            │
//! result ◀──────── layer 0 ◀─ layer 1 ◀─ … ◀─ layer N-1 ◀────┘
//! ```
//!
//! What onion intentionally does not do:
//!
//! - **Branching, retries, fan-out**: a layer is free to loop or spawn,
//!   the engine only walks the list
//! - **Transport**: the context is an in-memory value, not a socket
//! - **Persistence**: nothing outlives an execution
//!
//! What's left:
//!
//! - Strict call order in, mirror order out
//! - `next` callable once per layer; a second call is an error, not UB
//! - Errors and panics from any layer surface unchanged to the caller
//! - Every execution works on its own copy of the input
//!
//! ## Quick start
//!
//! ```rust
//! use onion::{Context, Error, Next, Onion};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let onion = Onion::<Value>::new()
//!         .layer(|| stamp)
//!         .layer(|| |_cx: Context<Value>, _next: Next<Value>| async {
//!             Some(json!({ "replaced": true }))
//!         });
//!
//!     let out = onion.execute(&json!({})).await?;
//!     assert_eq!(out, json!({ "replaced": true }));
//!     Ok(())
//! }
//!
//! // The outermost layer forwards whatever the layers below resolved to.
//! async fn stamp(cx: Context<Value>, next: Next<Value>) -> Result<Option<Value>, Error> {
//!     cx.update(|c| c["stamped"] = json!(true));
//!     next.run().await
//! }
//! ```

mod context;
mod error;
mod handler;
mod next;
mod onion;
mod outcome;
mod pipeline;

pub mod middleware;
pub mod validate;

pub use context::Context;
pub use error::{BoxError, Error, ErrorKind};
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use middleware::{BoxedMiddleware, Middleware};
pub use next::Next;
pub use onion::Onion;
pub use outcome::{IntoOutcome, Outcome};
pub use pipeline::Pipeline;

pub use handler::boxed as boxed_handler;
