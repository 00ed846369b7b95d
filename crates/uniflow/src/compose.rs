//! Generic composition of unary functions.
//!
//! This is the one place function chaining is implemented; the middleware
//! pipeline in [`apply_middleware`](crate::apply_middleware) is built with
//! it, and it works for any other ordered-wrapper scenario.

/// A boxed unary function over `T`.
pub type Unary<T> = Box<dyn Fn(T) -> T>;

/// Compose unary functions right to left.
///
/// `compose(vec![f, g, h])` yields `|x| f(g(h(x)))`; the empty list composes
/// to the identity function.
pub fn compose<T: 'static>(funcs: Vec<Unary<T>>) -> Unary<T> {
    funcs
        .into_iter()
        .rev()
        .fold(Box::new(|value| value) as Unary<T>, |inner, func| {
            Box::new(move |value| func(inner(value)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_composition_is_identity() {
        let id = compose::<String>(Vec::new());
        assert_eq!(id("x".to_string()), "x");
    }

    #[test]
    fn test_single_function() {
        let f = compose::<String>(vec![Box::new(|s| s + "1")]);
        assert_eq!(f("x".to_string()), "x1");
    }

    #[test]
    fn test_leftmost_runs_last() {
        let f = compose::<String>(vec![
            Box::new(|s| s + "1"),
            Box::new(|s| s + "2"),
            Box::new(|s| s + "3"),
        ]);
        // f(g(h(x))): "3" is appended first, "1" last.
        assert_eq!(f("x".to_string()), "x321");
    }
}
