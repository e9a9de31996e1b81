//! What a layer resolves to, and the [`IntoOutcome`] conversion trait.
//!
//! A layer either resolves with an explicit value (`Some`) or with nothing
//! (`None`). When the outermost layer resolves with nothing, the execution
//! falls back to the context it mutated in place.

use crate::error::{BoxError, Error};

/// The settled result of a layer, a pipeline run, or a `next` call.
pub type Outcome<C> = Result<Option<C>, Error>;

/// Conversion into an [`Outcome`].
///
/// Implemented for the return types a handler is likely to have:
///
/// | Handler returns          | Outcome                       |
/// |--------------------------|-------------------------------|
/// | `()`                     | `Ok(None)`                    |
/// | `Option<C>`              | `Ok(value)`                   |
/// | `Result<(), E>`          | `Ok(None)` or the error       |
/// | `Result<Option<C>, E>`   | the value or the error        |
///
/// `E` is anything convertible into a [`BoxError`]: this crate's [`Error`],
/// any `std::error::Error + Send + Sync`, a `String` or a `&str`.
pub trait IntoOutcome<C> {
    fn into_outcome(self) -> Outcome<C>;
}

impl<C> IntoOutcome<C> for () {
    fn into_outcome(self) -> Outcome<C> { Ok(None) }
}

impl<C> IntoOutcome<C> for Option<C> {
    fn into_outcome(self) -> Outcome<C> { Ok(self) }
}

impl<C, E> IntoOutcome<C> for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Outcome<C> {
        self.map(|()| None).map_err(Error::handler)
    }
}

impl<C, E> IntoOutcome<C> for Result<Option<C>, E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Outcome<C> {
        self.map_err(Error::handler)
    }
}
