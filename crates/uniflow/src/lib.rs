//! uniflow: a single-writer, observable state container.
//!
//! State lives in one place, changes only through dispatched actions, and
//! every transition is computed by pure reducers. A middleware pipeline
//! wraps dispatch for cross-cutting concerns (logging, async effects);
//! listeners are notified synchronously, in subscription order, after each
//! committed transition.
//!
//! The crate provides:
//! - [`Store`], constructed via [`create_store`]: `state` / `dispatch` /
//!   `subscribe` / `replace_reducer`
//! - [`combine_reducers`]: one root reducer over a keyed [`SliceMap`],
//!   preserving aggregate identity when nothing changed
//! - [`apply_middleware`]: the onion-ordered dispatch pipeline, built on
//!   the generic [`compose`]
//! - reference middlewares [`LoggingMiddleware`] and [`EffectMiddleware`]
//!
//! There are no ambient singletons: construct a store and thread the handle
//! (a cheap `Clone`) through your application.

pub mod action;
pub mod combine;
pub mod compose;
pub mod enhancer;
pub mod error;
pub mod middleware;
pub mod reducer;
pub mod store;

pub use action::Action;
pub use combine::{combine_reducers, CombinedReducer, SliceKey, SliceMap, SliceReducer};
pub use compose::{compose, Unary};
pub use enhancer::{apply_middleware, MiddlewareEnhancer, StoreEnhancer};
pub use error::{Result, StoreError};
pub use middleware::effect::{Effect, EffectAction, EffectMiddleware, EffectSplit};
pub use middleware::logging::LoggingMiddleware;
pub use middleware::{DispatchFn, Middleware, MiddlewareApi};
pub use reducer::Reducer;
pub use store::{create_store, Store, Subscription};
