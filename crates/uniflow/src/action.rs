//! Action contract.
//!
//! Actions are consumer-defined sum types: each variant names one intended
//! state transition, and reducers match on them exhaustively. The container
//! never looks at payloads, only at the discriminant.

use std::fmt;

/// A tagged value describing an intended state transition.
///
/// `kind` must return a stable, non-empty discriminant for every variant;
/// dispatching an action whose `kind` is blank fails with
/// [`StoreError::InvalidAction`](crate::StoreError::InvalidAction).
/// Deriving `strum::AsRefStr` on the action enum and returning
/// `self.as_ref()` is the usual implementation.
pub trait Action: fmt::Debug + Send + 'static {
    /// Stable discriminant naming this action.
    fn kind(&self) -> &str;

    /// The bootstrap action.
    ///
    /// Dispatched internally on store construction and after
    /// [`replace_reducer`](crate::Store::replace_reducer) so reducers can
    /// materialize default state. Reducers should treat it like any other
    /// unrecognized action; its `kind` must be non-empty like every other.
    fn init() -> Self;
}
