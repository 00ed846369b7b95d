//! The store: state owner, dispatch loop, listener registry.
//!
//! One dispatch cycle (middleware pass, reducer, state swap, listener
//! notification) runs to completion before the next may start. The cycle guard
//! is acquired without blocking, so a dispatch that re-enters (from a
//! reducer, a listener, or another thread racing this one) is rejected with
//! [`StoreError::ConcurrentDispatch`] instead of deadlocking.
//!
//! Middleware that wants to dispatch while a cycle is in flight goes through
//! [`MiddlewareApi::dispatch`](crate::middleware::MiddlewareApi::dispatch),
//! which queues the action; the queue is drained after the current cycle,
//! each entry as a brand-new cycle through the full pipeline.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::thread::{self, ThreadId};

use crate::action::Action;
use crate::enhancer::StoreEnhancer;
use crate::error::{Result, StoreError};
use crate::middleware::{DispatchFn, MiddlewareApi};
use crate::reducer::Reducer;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(rwlock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rwlock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(PoisonError::into_inner)
}

struct ListenerEntry {
    id: u64,
    callback: Arc<dyn Fn() + Send + Sync>,
}

#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: Vec<ListenerEntry>,
}

impl ListenerSet {
    fn snapshot(&self) -> Vec<Arc<dyn Fn() + Send + Sync>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect()
    }

    pub(crate) fn remove(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }
}

/// Resets the single-writer flag when a cycle ends, also on unwind.
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Marks the current thread as "inside the reducer" for the duration of the
/// reducer call, so `state`/`subscribe` misuse can be told apart from
/// legitimate calls out of middleware or listeners.
struct ReduceGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> ReduceGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Self { slot }
    }
}

impl Drop for ReduceGuard<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

pub(crate) struct StoreInner<S, A> {
    state: RwLock<Arc<S>>,
    reducer: RwLock<Arc<dyn Reducer<S, A>>>,
    pub(crate) listeners: Mutex<ListenerSet>,
    pending: Mutex<VecDeque<A>>,
    pipeline: RwLock<Option<DispatchFn<A>>>,
    cycle_active: AtomicBool,
    reducing_on: Mutex<Option<ThreadId>>,
    next_listener_id: AtomicU64,
}

impl<S, A> StoreInner<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    fn check_action(action: &A) -> Result<()> {
        if action.kind().trim().is_empty() {
            return Err(StoreError::InvalidAction {
                action: format!("{action:?}"),
            });
        }
        Ok(())
    }

    pub(crate) fn in_reducer_on_this_thread(&self) -> bool {
        *lock(&self.reducing_on) == Some(thread::current().id())
    }

    pub(crate) fn state_snapshot(&self) -> Result<Arc<S>> {
        if self.in_reducer_on_this_thread() {
            return Err(StoreError::Reentrancy { op: "state" });
        }
        Ok(Arc::clone(&read(&self.state)))
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.cycle_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(CycleGuard {
            flag: &self.cycle_active,
        })
    }

    /// Reducer pass, state swap, listener notification. The terminal link of
    /// every dispatch pipeline.
    fn base_cycle(&self, action: A) -> Result<Option<A>> {
        Self::check_action(&action)?;

        let prev = Arc::clone(&read(&self.state));
        let reducer = Arc::clone(&read(&self.reducer));
        let next = {
            let _guard = ReduceGuard::enter(&self.reducing_on);
            reducer.reduce(prev.as_ref(), &action)
        }?;
        *write(&self.state) = Arc::new(next);

        let snapshot = lock(&self.listeners).snapshot();
        for listener in snapshot {
            (*listener)();
        }

        Ok(Some(action))
    }

    fn run_pipeline(&self, action: A) -> Result<Option<A>> {
        let pipeline = read(&self.pipeline).clone();
        match pipeline {
            Some(dispatch) => (*dispatch)(action),
            None => self.base_cycle(action),
        }
    }

    fn drain_pending(&self) -> Result<()> {
        loop {
            let next = lock(&self.pending).pop_front();
            match next {
                Some(action) => {
                    self.run_pipeline(action)?;
                }
                None => return Ok(()),
            }
        }
    }

    fn discard_pending(&self) {
        let mut pending = lock(&self.pending);
        if !pending.is_empty() {
            log::warn!(
                "discarding {} queued action(s) after a failed dispatch",
                pending.len()
            );
            pending.clear();
        }
    }

    /// Runs one top-level dispatch: the action through the pipeline, then
    /// every action middleware queued meanwhile, FIFO, each through the full
    /// pipeline again.
    fn run_root(&self, guard: CycleGuard<'_>, action: A) -> Result<Option<A>> {
        let outcome = self.run_pipeline(action).and_then(|out| {
            self.drain_pending()?;
            Ok(out)
        });
        if outcome.is_err() {
            self.discard_pending();
        }
        drop(guard);
        outcome
    }

    fn dispatch_root(&self, action: A) -> Result<Option<A>> {
        Self::check_action(&action)?;
        let guard = self.try_begin().ok_or(StoreError::ConcurrentDispatch)?;
        self.run_root(guard, action)
    }

    /// Head re-entry for middleware: run now if the store is idle, queue
    /// otherwise. A queued action runs before the in-flight dispatch returns
    /// to its caller; an insertion racing the end of a cycle is picked up by
    /// the next dispatch.
    pub(crate) fn dispatch_from_middleware(&self, action: A) -> Result<()> {
        Self::check_action(&action)?;
        match self.try_begin() {
            Some(guard) => self.run_root(guard, action).map(|_| ()),
            None => {
                lock(&self.pending).push_back(action);
                Ok(())
            }
        }
    }

    fn subscribe(&self, callback: Arc<dyn Fn() + Send + Sync>) -> Result<u64> {
        if self.in_reducer_on_this_thread() {
            return Err(StoreError::Reentrancy { op: "subscribe" });
        }
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).entries.push(ListenerEntry { id, callback });
        Ok(id)
    }

    fn replace_reducer(&self, reducer: Arc<dyn Reducer<S, A>>) -> Result<()> {
        let guard = self
            .try_begin()
            .ok_or(StoreError::Reentrancy { op: "replace_reducer" })?;
        *write(&self.reducer) = reducer;
        let outcome = self.base_cycle(A::init()).and_then(|_| self.drain_pending());
        if outcome.is_err() {
            self.discard_pending();
        }
        drop(guard);
        outcome
    }
}

/// The state container.
///
/// `Store` is a cheap handle (`Clone` bumps one `Arc`); all clones address
/// the same state, listener set and pipeline. There is no ambient global
/// instance: construct one with [`Store::new`] or [`create_store`] and
/// thread it through application setup.
pub struct Store<S, A> {
    inner: Arc<StoreInner<S, A>>,
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("listeners", &lock(&self.inner.listeners).entries.len())
            .field("dispatching", &self.inner.cycle_active.load(Ordering::Acquire))
            .finish()
    }
}

impl<S, A> Store<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    /// Build a store and dispatch the bootstrap action through the reducer,
    /// so [`Store::state`] is well-defined from the first call.
    ///
    /// Without `preloaded`, the reducer starts from `S::default()`; a
    /// combined reducer then materializes every slice from its own default.
    /// A reducer that fails on the bootstrap action fails construction.
    pub fn new(reducer: impl Reducer<S, A> + 'static, preloaded: Option<S>) -> Result<Self>
    where
        S: Default,
    {
        let store = Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(Arc::new(preloaded.unwrap_or_default())),
                reducer: RwLock::new(Arc::new(reducer)),
                listeners: Mutex::new(ListenerSet::default()),
                pending: Mutex::new(VecDeque::new()),
                pipeline: RwLock::new(None),
                cycle_active: AtomicBool::new(false),
                reducing_on: Mutex::new(None),
                next_listener_id: AtomicU64::new(0),
            }),
        };
        let guard = store
            .inner
            .try_begin()
            .ok_or(StoreError::ConcurrentDispatch)?;
        let init = store.inner.base_cycle(A::init());
        drop(guard);
        init?;
        Ok(store)
    }

    /// Current state snapshot.
    ///
    /// Fails with [`StoreError::Reentrancy`] when called from inside the
    /// in-flight reducer call; listeners and middleware may call it freely.
    pub fn state(&self) -> Result<Arc<S>> {
        self.inner.state_snapshot()
    }

    /// Dispatch an action: the only way to trigger a state transition.
    ///
    /// Returns `Ok(Some(action))` once the action has traversed the pipeline
    /// and the reducer pass committed, `Ok(None)` when a middleware
    /// intentionally consumed it. On error nothing was committed and no
    /// listener was notified.
    pub fn dispatch(&self, action: A) -> Result<Option<A>> {
        self.inner.dispatch_root(action)
    }

    /// Register a listener, invoked with no arguments after every committed
    /// dispatch, in subscription order.
    ///
    /// Subscribing while a notification pass is running is allowed and takes
    /// effect from the next cycle; subscribing from inside a reducer fails
    /// with [`StoreError::Reentrancy`].
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Result<Subscription<S, A>> {
        let id = self.inner.subscribe(Arc::new(listener))?;
        Ok(Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        })
    }

    /// Hot-swap the active reducer and dispatch the bootstrap action so the
    /// new reducer can materialize sub-state for keys it introduces.
    ///
    /// Fails with [`StoreError::Reentrancy`] while a dispatch is in flight.
    pub fn replace_reducer(&self, reducer: impl Reducer<S, A> + 'static) -> Result<()> {
        self.inner.replace_reducer(Arc::new(reducer))
    }

    pub(crate) fn install_pipeline(&self, dispatch: DispatchFn<A>) {
        *write(&self.inner.pipeline) = Some(dispatch);
    }

    /// The terminal pipeline link: the store's own reducer-driven dispatch.
    pub(crate) fn base_dispatch_fn(&self) -> DispatchFn<A> {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |action| match weak.upgrade() {
            Some(inner) => inner.base_cycle(action),
            None => Err(StoreError::StoreDropped),
        })
    }

    pub(crate) fn middleware_api(&self) -> MiddlewareApi<S, A> {
        MiddlewareApi::new(Arc::downgrade(&self.inner))
    }
}

/// Handle returned by [`Store::subscribe`]; the listener stays registered
/// until `unsubscribe` is called.
pub struct Subscription<S, A> {
    id: u64,
    inner: Weak<StoreInner<S, A>>,
}

impl<S, A> Subscription<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    /// Remove the listener. Removing it during a notification pass does not
    /// affect the pass already underway; removing it from inside a reducer
    /// fails with [`StoreError::Reentrancy`].
    pub fn unsubscribe(self) -> Result<()> {
        let Some(inner) = self.inner.upgrade() else {
            return Ok(());
        };
        if inner.in_reducer_on_this_thread() {
            return Err(StoreError::Reentrancy { op: "unsubscribe" });
        }
        lock(&inner.listeners).remove(self.id);
        Ok(())
    }
}

impl<S, A> fmt::Debug for Subscription<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Build a store, optionally wrapped by an enhancer such as
/// [`apply_middleware`](crate::apply_middleware).
pub fn create_store<S, A>(
    reducer: impl Reducer<S, A> + 'static,
    preloaded: Option<S>,
    enhancer: Option<Box<dyn StoreEnhancer<S, A>>>,
) -> Result<Store<S, A>>
where
    S: Default + Send + Sync + 'static,
    A: Action,
{
    let store = Store::new(reducer, preloaded)?;
    Ok(match enhancer {
        Some(enhancer) => enhancer.enhance(store),
        None => store,
    })
}
