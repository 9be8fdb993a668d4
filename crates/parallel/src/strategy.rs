//! Parallel processing strategies

#[cfg(feature = "parallel")]
use cirrus_core::Error;
use cirrus_core::Result;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Processing mode for algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for a requested thread count: `None` uses the global pool,
    /// `Some(1)` runs on the calling thread.
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None | Some(0) => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Short label used in log lines
    pub fn label(&self) -> String {
        match self {
            ProcessingMode::Sequential => "sequential".to_string(),
            ProcessingMode::Parallel => format!("parallel({})", num_cpus()),
            ProcessingMode::ParallelWith(n) => format!("parallel({})", n),
        }
    }
}

/// Strategy for executing independent work items
pub trait ParallelStrategy {
    /// Map a function over work items and collect results in input order.
    ///
    /// `init` creates one piece of mutable state per worker; the state is
    /// reused for every item that worker processes and never shared.
    fn par_map_init<I, S, T, INIT, F>(&self, items: Vec<I>, init: INIT, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        INIT: Fn() -> S + Sync + Send,
        F: Fn(&mut S, I) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map_init<I, S, T, INIT, F>(&self, items: Vec<I>, init: INIT, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        INIT: Fn() -> S + Sync + Send,
        F: Fn(&mut S, I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(sequential(items, init, f)),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => Ok(items.into_par_iter().map_init(init, f).collect()),
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Algorithm(format!("failed to build thread pool: {}", e)))?;
                Ok(pool.install(|| items.into_par_iter().map_init(init, f).collect()))
            }
            #[cfg(not(feature = "parallel"))]
            ProcessingMode::Parallel | ProcessingMode::ParallelWith(_) => {
                Ok(sequential(items, init, f))
            }
        }
    }
}

fn sequential<I, S, T, INIT, F>(items: Vec<I>, init: INIT, f: F) -> Vec<T>
where
    INIT: Fn() -> S,
    F: Fn(&mut S, I) -> T,
{
    let mut state = init();
    items.into_iter().map(|item| f(&mut state, item)).collect()
}

/// Get the number of available CPU cores
#[cfg(feature = "parallel")]
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

/// Get the number of available CPU cores
#[cfg(not(feature = "parallel"))]
pub fn num_cpus() -> usize {
    1
}
