use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;

/// Worker pool shared by the parallel stages of world generation.
pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("stratum-worker-{i}"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count);
        }

        let pool = builder.build()?;
        debug!("Job system started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Runs `op` inside the pool so that rayon parallel iterators use its workers.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::JobSystem;

    #[test]
    fn install_runs_parallel_iterators_on_the_pool() {
        let jobs = JobSystem::new(Some(2)).expect("build pool");
        assert_eq!(jobs.install(rayon::current_num_threads), 2);

        let sum: u64 = jobs.install(|| (1..=100u64).into_par_iter().sum());
        assert_eq!(sum, 5050);
    }
}
