//! Row-striped scheduling of all unordered document pairs over a fixed set of workers.
//!
//! Worker `w` of `W` owns rows `i = w, w + W, w + 2W, ...` and sweeps `j = i + 1 .. n` for each.
//! Every pair `(i, j)` with `i < j` belongs to exactly one worker, no queue is shared, and the
//! assignment depends only on `(n, W)`.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

pub fn pair_count(n: usize) -> usize { n * n.saturating_sub(1) / 2 }

/// Workers actually started: at least one, and never more than there are rows with pairs.
pub fn effective_workers(n: usize, workers: usize) -> usize { workers.clamp(1, n.saturating_sub(1).max(1)) }

/// Pairs owned by `worker`, in lexicographic order.
pub fn stripe(n: usize, workers: usize, worker: usize) -> impl Iterator<Item = (usize, usize)> {
    (worker..n).step_by(workers.max(1)).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
}

pub fn stripe_len(n: usize, workers: usize, worker: usize) -> usize {
    (worker..n).step_by(workers.max(1)).map(|i| n - 1 - i).sum()
}

/// A pair whose visit panicked. The remaining pairs of the worker still ran.
#[derive(Debug, Clone)]
pub struct PairPanic {
    pub i: usize,
    pub j: usize,
    pub message: String,
}

/// Visit every pair of `0..n` on scoped worker threads and wait for all of them.
///
/// A panic inside `visit` is caught per pair and returned, so one bad pair neither kills its
/// worker nor the pool.
pub fn for_each_pair<F>(n: usize, workers: usize, visit: F) -> Result<Vec<PairPanic>>
where
    F: Fn(usize, usize) + Sync,
{
    let workers = effective_workers(n, workers);
    let panics = Mutex::new(Vec::new());
    thread::scope(|scope| -> Result<()> {
        for w in 0..workers {
            let visit = &visit;
            let panics = &panics;
            thread::Builder::new()
                .name(format!("compare-{w}"))
                .spawn_scoped(scope, move || {
                    tracing::debug!(worker = w, pairs = stripe_len(n, workers, w), "worker started");
                    for (i, j) in stripe(n, workers, w) {
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| visit(i, j))) {
                            panics.lock().push(PairPanic { i, j, message: panic_message(payload.as_ref()) });
                        }
                    }
                })
                .with_context(|| format!("spawning comparison worker {w}"))?;
        }
        Ok(())
    })?;
    Ok(panics.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn stripes_cover_every_pair_once() {
        for n in 0..12 {
            for workers in 1..=14 {
                let mut seen = HashSet::new();
                let mut total = 0;
                for w in 0..workers {
                    assert_eq!(stripe(n, workers, w).count(), stripe_len(n, workers, w));
                    for (i, j) in stripe(n, workers, w) {
                        assert!(i < j && j < n);
                        assert_eq!(i % workers, w);
                        assert!(seen.insert((i, j)), "duplicate pair ({i}, {j})");
                        total += 1;
                    }
                }
                assert_eq!(total, pair_count(n));
            }
        }
    }

    #[test]
    fn stripe_is_lexicographic() {
        let pairs: Vec<_> = stripe(5, 2, 0).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (0, 4), (2, 3), (2, 4)]);
    }

    #[test]
    fn effective_workers_bounds() {
        assert_eq!(effective_workers(0, 8), 1);
        assert_eq!(effective_workers(3, 8), 2);
        assert_eq!(effective_workers(100, 8), 8);
        assert_eq!(effective_workers(100, 0), 1);
    }

    #[test]
    fn visits_all_pairs_concurrently() {
        let visited = Mutex::new(Vec::new());
        let panics = for_each_pair(9, 4, |i, j| visited.lock().push((i, j))).unwrap();
        assert!(panics.is_empty());
        let mut visited = visited.into_inner();
        visited.sort();
        assert_eq!(visited.len(), pair_count(9));
        visited.dedup();
        assert_eq!(visited.len(), pair_count(9));
    }

    #[test]
    fn panics_are_contained_per_pair() {
        let visited = Mutex::new(0usize);
        let panics = for_each_pair(6, 3, |i, j| {
            if (i, j) == (1, 4) {
                panic!("bad pair");
            }
            *visited.lock() += 1;
        })
        .unwrap();
        assert_eq!(panics.len(), 1);
        assert_eq!((panics[0].i, panics[0].j), (1, 4));
        assert_eq!(panics[0].message, "bad pair");
        assert_eq!(visited.into_inner(), pair_count(6) - 1);
    }
}
