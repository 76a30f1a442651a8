//! Scoped-thread fan-out for independent subtree evaluation.
//!
//! Used for the "sibling steps of a projection" case named in the
//! concurrency model: when a path step or filter predicate is evaluated
//! once per element of a sequence, those evaluations don't depend on each
//! other, so with `with_concurrency(true)` they can run on a
//! `std::thread::scope` fan-out instead of sequentially. Results are
//! joined back in source order regardless of which thread finished first.
//! No thread pool: threads are spawned and joined within the scope of this
//! one call, keeping the core dependency-light (no `rayon`/`tokio`).

use jq_error::EvalError;

/// Map `items` through `f`, in parallel when `concurrent` is true and there
/// is more than one item, sequentially otherwise. `f` must be safe to call
/// from any thread; it is never called concurrently with itself on the
/// same item.
pub fn map_maybe_parallel<T, R, F>(
    concurrent: bool,
    items: Vec<T>,
    f: F,
) -> Result<Vec<R>, EvalError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R, EvalError> + Sync,
{
    if !concurrent || items.len() < 2 {
        return items.into_iter().map(f).collect();
    }
    std::thread::scope(|scope| {
        let handles: Vec<_> = items.into_iter().map(|item| scope.spawn(|| f(item))).collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| Err(EvalError::cancelled())))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_path_preserves_order() {
        let items = vec![1, 2, 3];
        let result = map_maybe_parallel(false, items, |n| Ok::<_, EvalError>(n * 2)).unwrap();
        assert_eq!(result, vec![2, 4, 6]);
    }

    #[test]
    fn parallel_path_preserves_order() {
        let items: Vec<i32> = (0..50).collect();
        let result = map_maybe_parallel(true, items.clone(), |n| Ok::<_, EvalError>(n * 2)).unwrap();
        let expected: Vec<i32> = items.iter().map(|n| n * 2).collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn parallel_path_propagates_first_error() {
        let items = vec![1, 2, 3];
        let result =
            map_maybe_parallel(true, items, |n| if n == 2 { Err(EvalError::cancelled()) } else { Ok(n) });
        assert!(result.is_err());
    }
}
