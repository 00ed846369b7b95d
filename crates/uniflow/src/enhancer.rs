//! Store enhancers.
//!
//! An enhancer wraps a freshly built store to add cross-cutting behavior.
//! [`apply_middleware`] is the one shipped here: it assembles the middleware
//! onion with [`compose`] and installs it as the store's dispatch pipeline.

use std::sync::Arc;

use crate::action::Action;
use crate::compose::{compose, Unary};
use crate::middleware::{DispatchFn, Middleware};
use crate::store::Store;

/// Wraps a store constructor's output with cross-cutting behavior.
pub trait StoreEnhancer<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    fn enhance(self: Box<Self>, store: Store<S, A>) -> Store<S, A>;
}

/// Enhancer produced by [`apply_middleware`].
pub struct MiddlewareEnhancer<S, A> {
    middlewares: Vec<Arc<dyn Middleware<S, A>>>,
}

/// Build an enhancer installing the given middleware chain.
///
/// The first middleware in the list is the outermost link: it sees every
/// action first on the way in and last on the way out; the innermost link
/// always ends at the store's own reducer-driven dispatch.
pub fn apply_middleware<S, A>(
    middlewares: Vec<Arc<dyn Middleware<S, A>>>,
) -> Box<dyn StoreEnhancer<S, A>>
where
    S: Send + Sync + 'static,
    A: Action,
{
    Box::new(MiddlewareEnhancer { middlewares })
}

impl<S, A> StoreEnhancer<S, A> for MiddlewareEnhancer<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    fn enhance(self: Box<Self>, store: Store<S, A>) -> Store<S, A> {
        let api = store.middleware_api();
        let base = store.base_dispatch_fn();

        let wrappers: Vec<Unary<DispatchFn<A>>> = self
            .middlewares
            .into_iter()
            .map(|mw| {
                let api = api.clone();
                Box::new(move |next: DispatchFn<A>| Arc::clone(&mw).wrap(api.clone(), next))
                    as Unary<DispatchFn<A>>
            })
            .collect();

        store.install_pipeline(compose(wrappers)(base));
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, StoreError};
    use crate::middleware::MiddlewareApi;
    use crate::store::create_store;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, strum::AsRefStr)]
    enum TestAction {
        Init,
        Inc,
        Spawn,
        Swallowed,
    }

    impl Action for TestAction {
        fn kind(&self) -> &str {
            self.as_ref()
        }

        fn init() -> Self {
            TestAction::Init
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: i64,
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn logging_reducer(log: Log) -> impl Fn(&Counter, &TestAction) -> Result<Counter> {
        move |state, action| {
            if !matches!(action, TestAction::Init) {
                log.lock().unwrap().push(format!("reduce:{}", action.kind()));
            }
            match action {
                TestAction::Inc => Ok(Counter {
                    value: state.value + 1,
                }),
                _ => Ok(state.clone()),
            }
        }
    }

    /// Records pre/post entries around `next`.
    struct Tape {
        name: &'static str,
        log: Log,
    }

    impl Middleware<Counter, TestAction> for Tape {
        fn wrap(
            self: Arc<Self>,
            _api: MiddlewareApi<Counter, TestAction>,
            next: DispatchFn<TestAction>,
        ) -> DispatchFn<TestAction> {
            Arc::new(move |action| {
                self.log.lock().unwrap().push(format!("{}:pre", self.name));
                let out = (*next)(action);
                self.log.lock().unwrap().push(format!("{}:post", self.name));
                out
            })
        }
    }

    /// Dispatches `Inc` through the head once, when it sees `Spawn`.
    struct Spawner;

    impl Middleware<Counter, TestAction> for Spawner {
        fn wrap(
            self: Arc<Self>,
            api: MiddlewareApi<Counter, TestAction>,
            next: DispatchFn<TestAction>,
        ) -> DispatchFn<TestAction> {
            Arc::new(move |action| {
                if matches!(action, TestAction::Spawn) {
                    api.dispatch(TestAction::Inc)?;
                }
                (*next)(action)
            })
        }
    }

    /// Consumes `Swallowed` without calling `next`.
    struct Sink;

    impl Middleware<Counter, TestAction> for Sink {
        fn wrap(
            self: Arc<Self>,
            _api: MiddlewareApi<Counter, TestAction>,
            next: DispatchFn<TestAction>,
        ) -> DispatchFn<TestAction> {
            Arc::new(move |action| {
                if matches!(action, TestAction::Swallowed) {
                    return Ok(None);
                }
                (*next)(action)
            })
        }
    }

    #[test]
    fn test_onion_ordering() {
        let log: Log = Arc::default();
        let store = create_store(
            logging_reducer(Arc::clone(&log)),
            None,
            Some(apply_middleware(vec![
                Arc::new(Tape {
                    name: "A",
                    log: Arc::clone(&log),
                }) as Arc<dyn Middleware<_, _>>,
                Arc::new(Tape {
                    name: "B",
                    log: Arc::clone(&log),
                }),
            ])),
        )
        .unwrap();

        store.dispatch(TestAction::Inc).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["A:pre", "B:pre", "reduce:Inc", "B:post", "A:post"]
        );
    }

    #[test]
    fn test_head_redispatch_runs_after_the_current_cycle() {
        let log: Log = Arc::default();
        let store = create_store(
            logging_reducer(Arc::clone(&log)),
            None,
            Some(apply_middleware(vec![
                Arc::new(Tape {
                    name: "A",
                    log: Arc::clone(&log),
                }) as Arc<dyn Middleware<_, _>>,
                Arc::new(Spawner),
            ])),
        )
        .unwrap();

        let out = store.dispatch(TestAction::Spawn).unwrap();
        assert_eq!(out, Some(TestAction::Spawn));
        // Spawn's cycle completes, then the queued Inc re-enters from the
        // head (passing A again) as its own cycle.
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "A:pre",
                "reduce:Spawn",
                "A:post",
                "A:pre",
                "reduce:Inc",
                "A:post"
            ]
        );
        assert_eq!(store.state().unwrap().value, 1);
    }

    #[test]
    fn test_short_circuit_returns_none_and_commits_nothing() {
        let log: Log = Arc::default();
        let store = create_store(
            logging_reducer(Arc::clone(&log)),
            None,
            Some(apply_middleware(vec![Arc::new(Sink) as Arc<dyn Middleware<_, _>>])),
        )
        .unwrap();

        let out = store.dispatch(TestAction::Swallowed).unwrap();
        assert_eq!(out, None);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(store.state().unwrap().value, 0);
    }

    #[test]
    fn test_api_outliving_the_store_reports_it() {
        struct Keeper(Arc<Mutex<Option<MiddlewareApi<Counter, TestAction>>>>);

        impl Middleware<Counter, TestAction> for Keeper {
            fn wrap(
                self: Arc<Self>,
                api: MiddlewareApi<Counter, TestAction>,
                next: DispatchFn<TestAction>,
            ) -> DispatchFn<TestAction> {
                *self.0.lock().unwrap() = Some(api);
                next
            }
        }

        let slot = Arc::new(Mutex::new(None));
        let store = create_store(
            |state: &Counter, _: &TestAction| -> Result<Counter> { Ok(state.clone()) },
            None,
            Some(apply_middleware(vec![
                Arc::new(Keeper(Arc::clone(&slot))) as Arc<dyn Middleware<_, _>>
            ])),
        )
        .unwrap();
        drop(store);

        let api = slot.lock().unwrap().take().unwrap();
        assert!(matches!(
            api.dispatch(TestAction::Inc),
            Err(StoreError::StoreDropped)
        ));
        assert!(matches!(api.state(), Err(StoreError::StoreDropped)));
    }
}
