//! External downloader invocation.
//!
//! Spawns one `yt-dlp` process per job with an explicit argument list,
//! consumes its output line by line into progress events, and supports
//! two-phase stop (graceful signal, then force-kill after a grace period).

mod command;
mod probe;
mod progress;
mod spawn;

pub use command::{build_args, strip_time_params, DownloadSpec, DOWNLOADER_BIN};
pub use probe::{find_in_path, require};
pub use progress::{parse_line, ProgressLine, ProgressUpdate};
pub use spawn::{run_download, RunOutcome};

/// Failure to invoke the downloader at all (as opposed to a download that
/// ran and failed, which is a [`RunOutcome::Failed`]).
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The required external command is not on PATH. Checked before any
    /// spawn so the condition is reported once, by name.
    #[error("required command `{0}` not found on PATH")]
    MissingDependency(String),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o while driving downloader: {0}")]
    Io(#[from] std::io::Error),
}
