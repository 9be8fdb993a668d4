//! Row-parallel helpers that degrade to plain loops without `parallel`.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run `f` for every row index and concatenate the returned rows in order.
///
/// Each call owns the row it builds, so rows can be produced on any worker.
#[cfg(feature = "parallel")]
pub(crate) fn collect_rows<T, F>(rows: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    (0..rows).into_par_iter().flat_map_iter(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn collect_rows<T, F>(rows: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> Vec<T>,
{
    (0..rows).flat_map(f).collect()
}
