//! Opaque per-dispatch state threaded through every callback.
//!
//! Server adapters construct an [`Env`] once (edge runtimes from their
//! platform environment, the socket server from whatever state the embedder
//! supplies) and the pipeline clones the handle into each callback
//! invocation. The routing core never inspects the contents.

use std::any::Any;
use std::sync::Arc;

/// Cheaply cloneable handle to adapter-supplied state.
#[derive(Clone, Default)]
pub struct Env {
    inner: Option<Arc<dyn Any + Send + Sync>>,
}

impl Env {
    /// Wrap a value so callbacks can retrieve it with [`Env::get`].
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Some(Arc::new(value)),
        }
    }

    /// Downcast back to the stored type.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.as_ref()?.downcast_ref::<T>()
    }

    /// `true` when no state was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_none()
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("present", &self.inner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_typed_state() {
        struct AppState {
            counter: u64,
        }
        let env = Env::new(AppState { counter: 7 });
        assert_eq!(env.get::<AppState>().unwrap().counter, 7);
        assert!(env.get::<String>().is_none());
    }

    #[test]
    fn default_is_empty() {
        let env = Env::default();
        assert!(env.is_empty());
        assert!(env.get::<u32>().is_none());
    }
}
