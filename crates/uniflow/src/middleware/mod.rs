//! Middleware: interceptors wrapping the store's dispatch.
//!
//! A middleware sees every dispatched action before the reducer does. It can
//! pass the action along (`next`), transform it, or consume it and bridge
//! the work back in later through [`MiddlewareApi::dispatch`]. The chain is
//! built once, at [`apply_middleware`](crate::apply_middleware) time, as an
//! onion: the first middleware in the list sees the action first on the way
//! in and last on the way out.

use std::sync::{Arc, Weak};

use crate::action::Action;
use crate::error::{Result, StoreError};
use crate::store::StoreInner;

pub mod effect;
pub mod logging;

/// One link of the dispatch pipeline.
pub type DispatchFn<A> = Arc<dyn Fn(A) -> Result<Option<A>> + Send + Sync>;

/// An interceptor in the dispatch pipeline.
///
/// `wrap` receives the next link and returns this middleware's own link; it
/// runs once per store, when the chain is assembled. The returned link must
/// call `next` exactly once per action, or not at all if it deliberately
/// consumes the action (in which case it returns `Ok(None)`).
pub trait Middleware<S, A>: Send + Sync {
    fn wrap(self: Arc<Self>, api: MiddlewareApi<S, A>, next: DispatchFn<A>) -> DispatchFn<A>;
}

/// The restricted store capability handed to middleware: read the state,
/// and dispatch back into the head of the chain. Holding one does not keep
/// the store alive.
pub struct MiddlewareApi<S, A> {
    inner: Weak<StoreInner<S, A>>,
}

impl<S, A> Clone for MiddlewareApi<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S, A> MiddlewareApi<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    pub(crate) fn new(inner: Weak<StoreInner<S, A>>) -> Self {
        Self { inner }
    }

    /// Current state snapshot, with the same re-entrancy rules as
    /// [`Store::state`](crate::Store::state).
    pub fn state(&self) -> Result<Arc<S>> {
        self.upgrade()?.state_snapshot()
    }

    /// Dispatch through the head of the chain, so the action passes every
    /// middleware again, including the caller's own.
    ///
    /// While a dispatch is in flight on the store the action is queued and
    /// runs as a fresh, full-pipeline cycle after the current cycle
    /// completes, before the in-flight `dispatch` returns. From an idle
    /// context (an async effect, another thread) it runs immediately.
    pub fn dispatch(&self, action: A) -> Result<()> {
        self.upgrade()?.dispatch_from_middleware(action)
    }

    fn upgrade(&self) -> Result<Arc<StoreInner<S, A>>> {
        self.inner.upgrade().ok_or(StoreError::StoreDropped)
    }
}
