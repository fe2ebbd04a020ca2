use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pdf_resizer::config::job::JobFile;
use pdf_resizer::config::merged::MergedConfig;
use pdf_resizer::config::{self};
use pdf_resizer::pipeline::job_runner::JobConfig;
use pdf_resizer::pipeline::orchestrator::run_all_jobs;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdf_resizer <jobs.yaml>...");
        eprintln!("  Shrink PDF files towards the target sizes given in job specifications.");
        eprintln!("  Set RUST_LOG (e.g. RUST_LOG=debug) to control log output.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_resizer {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    init_tracing();

    let mut job_configs: Vec<JobConfig> = Vec::new();
    let mut parallel_workers = 0usize;

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };
        parallel_workers = parallel_workers.max(settings.parallel_workers);

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for job in &job_file.jobs {
            let merged = MergedConfig::new(&settings, job);
            if let Err(e) = merged.validate() {
                eprintln!("ERROR: Invalid job for {}: {e}", job.input);
                return ExitCode::FAILURE;
            }

            let input_path = resolve_path(&job_dir, &job.input);
            let output_path = resolve_path(&job_dir, &job.output);
            job_configs.push(JobConfig::from_merged(input_path, output_path, &merged));
        }
    }

    let results = run_all_jobs(&job_configs, parallel_workers);

    let mut has_error = false;
    for (job, result) in job_configs.iter().zip(&results) {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} -> {} ({} -> {} bytes, {})",
                    job_result.input_path.display(),
                    job_result.output_path.display(),
                    job_result.input_size,
                    job_result.output_size,
                    job_result.selected
                );
                if !job_result.target_met {
                    eprintln!(
                        "WARNING: {} did not reach target {} bytes (best {} bytes)",
                        job_result.output_path.display(),
                        job_result.target_size,
                        job_result.output_size
                    );
                }
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    job.input_path.display(),
                    job.output_path.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// RUST_LOG が未設定なら info 以上を stderr に出す。
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
