//! The execution-local context shared by every layer of one run.
//!
//! Each execution works on its own copy of the caller's value. Layers reach
//! it through a [`Context`] handle: a cheap, cloneable `Arc<Mutex<C>>`.
//!
//! The lock is only ever held inside the synchronous closures passed to
//! [`Context::with`] and [`Context::update`]. There is no guard type to keep
//! alive across an `.await`, so a layer can never deadlock itself by holding
//! the context while it awaits `next`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to the context of one execution.
pub struct Context<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> Context<C> {
    pub fn new(value: C) -> Self {
        Self { inner: Arc::new(Mutex::new(value)) }
    }

    /// Structural copy of `source`, detached from the caller's value.
    ///
    /// This is the isolation boundary: mutations made during an execution
    /// never reach `source` or any other execution. `Clone` decides what is
    /// copied, so resource handles inside `C` follow their own `Clone` impl.
    pub fn detached(source: &C) -> Self
    where
        C: Clone,
    {
        Self::new(source.clone())
    }

    /// Reads the context.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&*self.lock())
    }

    /// Mutates the context in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut *self.lock())
    }

    /// Swaps in a new value and returns the old one.
    pub fn replace(&self, value: C) -> C {
        std::mem::replace(&mut *self.lock(), value)
    }

    pub fn snapshot(&self) -> C
    where
        C: Clone,
    {
        self.lock().clone()
    }

    /// Takes the value out of the handle.
    ///
    /// Falls back to a snapshot when another handle is still alive, e.g. a
    /// layer that moved its `Context` into a detached task.
    pub fn into_inner(self) -> C
    where
        C: Clone,
    {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }

    // A panicking layer poisons the lock; the data is still what the caller
    // should see, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, C> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> Clone for Context<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for Context<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Context").field(&*self.lock()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn detached_copy_does_not_touch_the_source() {
        let source = json!({ "counter": 0 });
        let cx = Context::detached(&source);
        cx.update(|c| c["counter"] = json!(5));

        assert_eq!(source["counter"], 0);
        assert_eq!(cx.snapshot()["counter"], 5);
    }

    #[test]
    fn clones_share_one_value() {
        let cx = Context::new(json!({}));
        let other = cx.clone();
        other.update(|c| c["seen"] = json!(true));

        assert_eq!(cx.with(|c| c["seen"].clone()), json!(true));
    }

    #[test]
    fn replace_returns_previous_value() {
        let cx = Context::new(json!({ "a": 1 }));
        let old = cx.replace(json!({ "b": 2 }));

        assert_eq!(old, json!({ "a": 1 }));
        assert_eq!(cx.snapshot(), json!({ "b": 2 }));
    }

    #[test]
    fn into_inner_with_outstanding_handle_snapshots() {
        let cx = Context::new(json!({ "n": 1 }));
        let leaked = cx.clone();
        let value: Value = cx.into_inner();

        assert_eq!(value, json!({ "n": 1 }));
        assert_eq!(leaked.snapshot(), value);
    }

    #[test]
    fn poisoned_lock_still_yields_data() {
        let cx = Context::new(json!({ "n": 1 }));
        let handle = cx.clone();
        let _ = std::thread::spawn(move || {
            handle.update(|c: &mut Value| {
                c["n"] = json!(2);
                if c["n"] == 2 {
                    panic!("layer blew up");
                }
            })
        })
        .join();

        assert_eq!(cx.into_inner(), json!({ "n": 2 }));
    }
}
