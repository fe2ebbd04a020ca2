// 全ジョブ実行

use rayon::prelude::*;

use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs in parallel, collecting results in input order.
/// One job failure does NOT prevent other jobs from running.
///
/// `parallel_workers == 0` uses rayon's default thread count.
pub fn run_all_jobs(
    jobs: &[JobConfig],
    parallel_workers: usize,
) -> Vec<crate::error::Result<JobResult>> {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_workers)
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "cannot build worker pool; running jobs sequentially");
            return jobs.iter().map(run_job).collect();
        }
    };

    pool.install(|| jobs.par_iter().map(run_job).collect())
}
