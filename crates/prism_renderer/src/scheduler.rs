//! Execution backends for the per-pixel kernel.
//!
//! A scheduler runs one kernel invocation per item with no ordering
//! guarantees. Kernels only touch the item they are handed, so every
//! backend produces the same result.

use rayon::prelude::*;
use std::sync::Arc;

/// Runs `kernel(index, &mut items[index])` for every item.
pub trait Scheduler: Send + Sync {
    fn dispatch<T: Send>(&self, items: &mut [T], kernel: &(dyn Fn(usize, &mut T) + Sync));

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Data-parallel dispatch on a rayon thread pool.
#[derive(Debug, Clone, Default)]
pub struct ThreadPoolScheduler {
    /// Dedicated pool; the global rayon pool is used when `None`
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl ThreadPoolScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a dedicated pool with `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("prism-worker-{i}"))
            .build()?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads())
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn dispatch<T: Send>(&self, items: &mut [T], kernel: &(dyn Fn(usize, &mut T) + Sync)) {
        let mut run = || {
            items
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, item)| kernel(index, item));
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn name(&self) -> &'static str {
        "thread-pool"
    }
}

/// Single-threaded dispatch, in index order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialScheduler;

impl Scheduler for SerialScheduler {
    fn dispatch<T: Send>(&self, items: &mut [T], kernel: &(dyn Fn(usize, &mut T) + Sync)) {
        for (index, item) in items.iter_mut().enumerate() {
            kernel(index, item);
        }
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill<S: Scheduler>(scheduler: &S) -> Vec<u64> {
        let mut items = vec![0u64; 1000];
        scheduler.dispatch(&mut items, &|i, v| *v = (i as u64) * 3 + 1);
        items
    }

    #[test]
    fn test_backends_agree() {
        let serial = fill(&SerialScheduler);
        let pooled = fill(&ThreadPoolScheduler::new());
        assert_eq!(serial, pooled);
        assert_eq!(serial[10], 31);
    }

    #[test]
    fn test_dedicated_pool() {
        let scheduler = ThreadPoolScheduler::with_threads(2).unwrap();
        assert_eq!(scheduler.threads(), 2);
        assert_eq!(fill(&scheduler), fill(&SerialScheduler));
    }

    #[test]
    fn test_empty_dispatch() {
        let mut items: Vec<u8> = Vec::new();
        SerialScheduler.dispatch(&mut items, &|_, _| unreachable!());
        ThreadPoolScheduler::new().dispatch(&mut items, &|_, _| unreachable!());
    }
}
