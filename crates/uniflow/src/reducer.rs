//! Reducer contract.

use crate::error::Result;

/// A pure state transition: `(state, action) -> state`.
///
/// Reducers receive the committed state by reference and return the next
/// value; they can never mutate the input. A reducer must be total: for an
/// action it does not recognize it returns the input unchanged (a clone, or
/// the same `Arc` for slice-based state). Errors propagate synchronously out
/// of [`dispatch`](crate::Store::dispatch) and roll the whole cycle back.
pub trait Reducer<S, A>: Send + Sync {
    fn reduce(&self, state: &S, action: &A) -> Result<S>;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(&S, &A) -> Result<S> + Send + Sync,
{
    fn reduce(&self, state: &S, action: &A) -> Result<S> {
        self(state, action)
    }
}
