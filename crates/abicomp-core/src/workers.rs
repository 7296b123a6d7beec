//! # Workers
//!
//! A bounded pool for running independent jobs, such as the comparisons of a
//! batch of binary pairs.
//!
//! The pool never has more threads than there are jobs, nor more than the
//! machine's available parallelism. Results come back in job order whatever
//! order the jobs finish in.

use std::num::NonZeroUsize;
use std::thread;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::debug;

use crate::error::{AbiError, Result};

/// Number of threads for `jobs` jobs.
pub fn pool_size(jobs: usize) -> usize
{
    let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    available.min(jobs).max(1)
}

/// Run `f` on every job on a dedicated pool and collect the results in job
/// order.
///
/// ```rust
/// use abicomp_core::workers::run_jobs;
///
/// let squares = run_jobs(vec![1, 2, 3], |n| n * n)?;
/// assert_eq!(squares, [1, 4, 9]);
/// # Ok::<(), abicomp_core::error::AbiError>(())
/// ```
///
/// ## Errors
///
/// Fails when the thread pool cannot be built.
pub fn run_jobs<J, R, F>(jobs: Vec<J>, f: F) -> Result<Vec<R>>
where
    J: Send,
    R: Send,
    F: Fn(J) -> R + Sync + Send,
{
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    let threads = pool_size(jobs.len());
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("abicomp-worker-{index}"))
        .build()
        .map_err(|err| AbiError::WorkerPool(err.to_string()))?;
    debug!(jobs = jobs.len(), threads, "running jobs");

    Ok(pool.install(|| jobs.into_par_iter().map(f).collect()))
}

#[cfg(test)]
mod tests
{
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_results_keep_job_order()
    {
        // Earlier jobs sleep longer, so they finish last.
        let jobs: Vec<u64> = (0..8).collect();
        let results = run_jobs(jobs, |n| {
            thread::sleep(Duration::from_millis(8 - n));
            n * 10
        })
        .unwrap();
        assert_eq!(results, [0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn test_every_job_runs_once()
    {
        let counter = AtomicUsize::new(0);
        let results = run_jobs(vec!["a"; 20], |_| counter.fetch_add(1, Ordering::SeqCst)).unwrap();
        assert_eq!(results.len(), 20);
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_no_jobs()
    {
        let results: Vec<()> = run_jobs(Vec::<u8>::new(), |_| ()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_pool_size_is_bounded_by_jobs()
    {
        assert_eq!(pool_size(1), 1);
        assert_eq!(pool_size(0), 1);
        assert!(pool_size(1000) <= 1000);
    }
}
