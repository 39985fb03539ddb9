//! Data-parallel loops over flat index ranges. Every phase of a substep is written against
//! `Execution`, so the same solver code runs on rayon's pool or on the calling thread.
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// Runs every loop on the calling thread, in index order. Used for reproducible tests.
    Serial,
    /// Splits loops across the rayon thread pool.
    Parallel,
}

impl Default for Execution {
    fn default() -> Self {
        Execution::Parallel
    }
}

/// Storage that several workers can fill independently and then sum together.
pub trait Accumulator: Send + Sync {
    /// A zeroed accumulator with the same shape as `self`.
    fn empty_like(&self) -> Self;

    /// Adds every entry of `other` into `self`.
    fn merge(&mut self, other: &Self);
}

impl Execution {
    pub fn for_each_mut<I, F>(self, items: &mut [I], f: F)
    where
        I: Send,
        F: Fn(usize, &mut I) + Send + Sync,
    {
        match self {
            Execution::Serial => items.iter_mut().enumerate().for_each(|(i, x)| f(i, x)),
            Execution::Parallel => items.par_iter_mut().enumerate().for_each(|(i, x)| f(i, x)),
        }
    }

    pub fn map_mut<I, R, F>(self, items: &mut [I], f: F) -> Vec<R>
    where
        I: Send,
        R: Send,
        F: Fn(usize, &mut I) -> R + Send + Sync,
    {
        match self {
            Execution::Serial => items.iter_mut().enumerate().map(|(i, x)| f(i, x)).collect(),
            Execution::Parallel => items
                .par_iter_mut()
                .enumerate()
                .map(|(i, x)| f(i, x))
                .collect(),
        }
    }

    /// Calls `f(accumulator, i)` for every `i` in `0..len`, summing all contributions into
    /// `target`.
    ///
    /// In parallel mode the range is split into at most one piece per worker. Each piece folds
    /// into its own zeroed partial, partials are summed pairwise as pieces finish, and the single
    /// survivor is merged into `target`, so concurrent writes to the same entry never race.
    pub fn scatter<G, F>(self, len: usize, target: &mut G, f: F)
    where
        G: Accumulator,
        F: Fn(&mut G, usize) + Send + Sync,
    {
        match self {
            Execution::Serial => (0..len).for_each(|i| f(target, i)),
            Execution::Parallel => {
                if len == 0 {
                    return;
                }
                let num_pieces = rayon::current_num_threads().max(1).min(len);
                let piece_len = (len + num_pieces - 1) / num_pieces;

                let template: &G = target;
                let sum = (0..len)
                    .into_par_iter()
                    .with_min_len(piece_len)
                    .fold(
                        || template.empty_like(),
                        |mut partial, i| {
                            f(&mut partial, i);
                            partial
                        },
                    )
                    .reduce_with(|mut a, b| {
                        a.merge(&b);
                        a
                    });

                if let Some(sum) = sum {
                    target.merge(&sum);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Histogram(Vec<u64>);

    impl Accumulator for Histogram {
        fn empty_like(&self) -> Self {
            Histogram(vec![0; self.0.len()])
        }

        fn merge(&mut self, other: &Self) {
            self.0.iter_mut().zip(&other.0).for_each(|(a, b)| *a += b);
        }
    }

    #[test]
    fn scatter_does_not_lose_updates() {
        for &execution in &[Execution::Serial, Execution::Parallel] {
            let mut histogram = Histogram(vec![0; 7]);
            execution.scatter(10_000, &mut histogram, |h, i| h.0[i % 7] += 1);

            assert_eq!(histogram.0.iter().sum::<u64>(), 10_000);
            assert_eq!(histogram.0[0], 1429);
            assert_eq!(histogram.0[6], 1428);
        }
    }

    #[test]
    fn scatter_adds_onto_existing_contents() {
        let mut histogram = Histogram(vec![5; 2]);
        Execution::Parallel.scatter(4, &mut histogram, |h, i| h.0[i % 2] += 1);
        assert_eq!(histogram, Histogram(vec![7, 7]));
    }

    #[derive(Debug)]
    struct Counted<'a> {
        allocations: &'a AtomicUsize,
        total: u64,
    }

    impl<'a> Accumulator for Counted<'a> {
        fn empty_like(&self) -> Self {
            self.allocations.fetch_add(1, Ordering::Relaxed);
            Counted {
                allocations: self.allocations,
                total: 0,
            }
        }

        fn merge(&mut self, other: &Self) {
            self.total += other.total;
        }
    }

    #[test]
    fn scatter_allocates_at_most_one_partial_per_worker() {
        let allocations = AtomicUsize::new(0);
        let mut counted = Counted {
            allocations: &allocations,
            total: 0,
        };

        Execution::Parallel.scatter(100_000, &mut counted, |c, i| c.total += i as u64);

        assert_eq!(counted.total, 99_999 * 100_000 / 2);
        let allocated = allocations.load(Ordering::Relaxed);
        assert!(allocated >= 1);
        assert!(allocated <= rayon::current_num_threads());
    }

    #[test]
    fn loops_visit_every_index_once() {
        for &execution in &[Execution::Serial, Execution::Parallel] {
            let mut items = vec![0usize; 257];
            execution.for_each_mut(&mut items, |i, x| *x += i);
            assert!(items.iter().enumerate().all(|(i, &x)| x == i));

            let doubled = execution.map_mut(&mut items, |i, x| {
                *x += 1;
                2 * i
            });
            assert_eq!(doubled[256], 512);
            assert!(items.iter().enumerate().all(|(i, &x)| x == i + 1));
        }
    }
}
