//! Async/effect middleware.
//!
//! An action enum opts in by carrying an [`Effect`] in one of its variants
//! and implementing [`EffectAction`]. When such an action is dispatched, the
//! middleware does not forward it to the reducer: it runs the effect with a
//! clone of the middleware api, and the effect bridges its results back by
//! dispatching plain follow-up actions, typically from a spawned task. Each
//! follow-up is an independent dispatch cycle, and the dispatching caller is
//! never blocked on the effect's work.

use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::middleware::{DispatchFn, Middleware, MiddlewareApi};

/// An executable unit carried inside an action variant.
pub struct Effect<S, A>(Box<dyn FnOnce(MiddlewareApi<S, A>) + Send>);

impl<S, A> Effect<S, A> {
    pub fn new(run: impl FnOnce(MiddlewareApi<S, A>) + Send + 'static) -> Self {
        Self(Box::new(run))
    }

    /// Consume and execute the effect.
    pub fn run(self, api: MiddlewareApi<S, A>) {
        (self.0)(api)
    }
}

impl<S, A> fmt::Debug for Effect<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Effect")
    }
}

/// Outcome of splitting an action: either it carried an effect, or it is a
/// plain action to forward down the chain.
pub enum EffectSplit<S, A> {
    Effect(Effect<S, A>),
    Plain(A),
}

/// Implemented by action types that may carry an [`Effect`].
pub trait EffectAction<S>: Sized {
    fn into_effect(self) -> EffectSplit<S, Self>;
}

/// Runs effect-carrying actions instead of forwarding them to `next`.
pub struct EffectMiddleware;

impl EffectMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EffectMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> Middleware<S, A> for EffectMiddleware
where
    S: Send + Sync + 'static,
    A: Action + EffectAction<S>,
{
    fn wrap(self: Arc<Self>, api: MiddlewareApi<S, A>, next: DispatchFn<A>) -> DispatchFn<A> {
        Arc::new(move |action| {
            let kind = action.kind().to_owned();
            match action.into_effect() {
                EffectSplit::Effect(effect) => {
                    log::debug!("running effect `{kind}`");
                    effect.run(api.clone());
                    Ok(None)
                }
                EffectSplit::Plain(action) => (*next)(action),
            }
        })
    }
}
