use rayon::prelude::*;

const PARALLEL_THRESHOLD: usize = 1024;

/// Indexed map that fans out over rayon for large batches. Output order always
/// follows the index order.
pub fn map_indexed<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if len >= PARALLEL_THRESHOLD {
        return (0..len).into_par_iter().map(&f).collect();
    }

    (0..len).map(f).collect()
}

pub fn for_each_indexed_mut<T, F>(slice: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    if slice.len() >= PARALLEL_THRESHOLD {
        slice
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, value)| f(idx, value));
        return;
    }

    for (idx, value) in slice.iter_mut().enumerate() {
        f(idx, value);
    }
}
