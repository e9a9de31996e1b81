//! Unified error type.

use thiserror::Error;

/// A boxed, thread-safe error produced by a middleware handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed middleware input, caught by the validator.
    Type,
    /// A handler broke the dispatch contract (called `next` twice).
    Protocol,
    /// A handler failed: returned an error or panicked.
    Handler,
}

/// The error type returned by every fallible onion operation.
///
/// Handler errors pass through untouched: the `Display` output is the
/// handler's own message, and [`Error::downcast_ref`] recovers the original
/// value.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Middlewares stack must be an array!")]
    NotAStack,

    #[error("Middleware must be composed of functions!")]
    NotAMiddleware,

    #[error("next() called multiple times")]
    NextCalledMultipleTimes,

    #[error(transparent)]
    Handler(BoxError),

    #[error("{0}")]
    Panic(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAStack | Self::NotAMiddleware => ErrorKind::Type,
            Self::NextCalledMultipleTimes => ErrorKind::Protocol,
            Self::Handler(_) | Self::Panic(_) => ErrorKind::Handler,
        }
    }

    /// Wraps any handler error.
    ///
    /// An [`Error`] that was boxed on its way out of a handler (typically a
    /// `next.run().await?` inside a layer) is unboxed back to itself, so a
    /// protocol violation deep in the stack still surfaces as one.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        let boxed: BoxError = err.into();
        match boxed.downcast::<Error>() {
            Ok(inner) => *inner,
            Err(other) => Self::Handler(other),
        }
    }

    /// Returns the original handler error if it is of type `E`.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Builds a [`Error::Panic`] from a caught unwind payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_owned(),
            Err(payload) => match payload.downcast::<String>() {
                Ok(s) => *s,
                Err(_) => "middleware panicked".to_owned(),
            },
        };
        Self::Panic(message)
    }
}
