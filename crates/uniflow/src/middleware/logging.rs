//! Observability middleware.

use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::middleware::{DispatchFn, Middleware, MiddlewareApi};

/// Logs every action passing through, with state snapshots before and after
/// at trace level. Never alters the action or the state, always calls `next`
/// exactly once.
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> Middleware<S, A> for LoggingMiddleware
where
    S: fmt::Debug + Send + Sync + 'static,
    A: Action,
{
    fn wrap(self: Arc<Self>, api: MiddlewareApi<S, A>, next: DispatchFn<A>) -> DispatchFn<A> {
        Arc::new(move |action| {
            let kind = action.kind().to_owned();
            let before = api.state();
            log::debug!("dispatch -> {kind}");

            let outcome = (*next)(action);

            match &outcome {
                Ok(Some(_)) => log::debug!("dispatch <- {kind}"),
                Ok(None) => log::debug!("dispatch <- {kind} (consumed by middleware)"),
                Err(err) => log::debug!("dispatch <- {kind} failed: {err}"),
            }
            if let (Ok(before), Ok(after)) = (before, api.state()) {
                log::trace!("state around `{kind}`: {before:?} -> {after:?}");
            }
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::store::create_store;
    use crate::apply_middleware;

    #[derive(Debug, Clone, PartialEq, strum::AsRefStr)]
    enum TestAction {
        Init,
        Inc,
    }

    impl Action for TestAction {
        fn kind(&self) -> &str {
            self.as_ref()
        }

        fn init() -> Self {
            TestAction::Init
        }
    }

    #[test]
    fn test_action_passes_through_unchanged() {
        let reducer = |state: &i64, action: &TestAction| -> Result<i64> {
            Ok(match action {
                TestAction::Inc => state + 1,
                _ => *state,
            })
        };
        let store = create_store(
            reducer,
            None,
            Some(apply_middleware(vec![
                Arc::new(LoggingMiddleware::new()) as Arc<dyn Middleware<_, _>>
            ])),
        )
        .unwrap();

        let out = store.dispatch(TestAction::Inc).unwrap();
        assert_eq!(out, Some(TestAction::Inc));
        // One dispatch, one reducer pass: `next` ran exactly once.
        assert_eq!(*store.state().unwrap(), 1);
    }
}
