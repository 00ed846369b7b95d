//! Error taxonomy for the store.
//!
//! The container performs no recovery: every failure surfaces synchronously
//! at the `dispatch` (or construction) call site, and a failed dispatch is
//! fully rolled back before the error is returned.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Everything that can go wrong inside the container.
///
/// Reducer and middleware failures that carry no structure of their own are
/// funneled through [`StoreError::Propagated`]; `?` on an `anyhow::Error`
/// inside a reducer does the right thing.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The dispatched action has an empty (or blank) discriminant.
    #[error("action {action} has an empty discriminant")]
    InvalidAction { action: String },

    /// A slice reducer produced no output for an action it should have
    /// answered with its unchanged input.
    #[error("reducer for slice `{key}` produced no output")]
    InvalidReducerOutput { key: &'static str },

    /// A store operation was invoked from inside the in-flight reducer call.
    #[error("`{op}` called from inside an active reducer")]
    Reentrancy { op: &'static str },

    /// A dispatch was attempted while another one is running on this store.
    #[error("a dispatch is already running on this store")]
    ConcurrentDispatch,

    /// Unstructured error raised by a reducer or middleware.
    #[error(transparent)]
    Propagated(#[from] anyhow::Error),

    /// The store behind a middleware handle is gone.
    #[error("store has been dropped")]
    StoreDropped,
}
