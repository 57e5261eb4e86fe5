pub mod count;
pub mod finalize;
pub mod merge;

use crate::utils::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::ThreadPoolBuilder;

fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    log::debug!("Initializing thread pool with {} threads...", num_threads);
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("varpile-{}", i))
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e).into())
}

fn progress_bar(len: usize, message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr_with_hz(10));
    let style = ProgressStyle::with_template("{msg:>24} [{bar:40.cyan/blue}] {pos:>5}/{len:5} {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb.set_message(message.into());
    pb
}
