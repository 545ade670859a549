//! `clipq download` – run the download queue over a clip file.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clipq_core::config::ClipqConfig;
use clipq_core::events::{EventBus, QueueEvent};
use clipq_core::queue::{
    enqueue_clip, run_queue, JobId, JobStatus, Progress, QueueCommand, QueueOptions, QueueState,
};
use clipq_core::runner::{require, DOWNLOADER_BIN};
use clipq_core::timecode::format_clock;
use tokio::sync::{broadcast, mpsc};

use super::resolve_file;

pub async fn run_download(cfg: &ClipqConfig, file: &Path, output_dir: PathBuf) -> Result<()> {
    let resolved = resolve_file(cfg, file)?;
    for err in &resolved.parse_errors {
        println!("parse error: {err}");
    }

    let downloader = require(DOWNLOADER_BIN)?;
    let opts = QueueOptions {
        downloader,
        output_dir,
        output_format: cfg.output_format.clone(),
        max_concurrent: cfg.max_concurrent_downloads,
        stop_grace: Duration::from_secs(cfg.stop_grace_secs),
    };

    let mut state = QueueState::new();
    let mut skipped = 0usize;
    for entry in resolved.entries {
        match entry.outcome {
            Ok(clip) => {
                if let Err(e) = enqueue_clip(&mut state, clip, &opts) {
                    println!("skipping clip at line {}: {e}", entry.block.line);
                    skipped += 1;
                }
            }
            Err(reason) => {
                println!("invalid clip at line {}: {reason}", entry.block.line);
                skipped += 1;
            }
        }
    }
    anyhow::ensure!(
        !state.jobs().is_empty(),
        "no downloadable clips in {}",
        file.display()
    );
    println!(
        "downloading {} clip(s), up to {} at once",
        state.jobs().len(),
        opts.max_concurrent.max(1)
    );

    let bus = EventBus::new(1024);
    let events = bus.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let pending: HashSet<JobId> = state.jobs().iter().map(|j| j.id).collect();
    let names: HashMap<JobId, String> = state
        .jobs()
        .iter()
        .map(|j| (j.id, j.clip.output_name.clone()))
        .collect();
    let printer = tokio::spawn(print_events(events, cmd_tx, pending, names));

    run_queue(&mut state, &opts, &bus, cmd_rx).await?;
    drop(bus);
    let _ = printer.await;

    summarize(&state, skipped)
}

/// Prints queue events until every watched job settles. Owns the command
/// sender: dropping it on exit is what lets the queue loop finish. Ctrl-C
/// turns into a `Shutdown` command.
async fn print_events(
    mut events: broadcast::Receiver<QueueEvent>,
    commands: mpsc::UnboundedSender<QueueCommand>,
    mut pending: HashSet<JobId>,
    names: HashMap<JobId, String>,
) {
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                println!("interrupted, stopping downloads");
                interrupted = true;
                let _ = commands.send(QueueCommand::Shutdown);
            }
            event = events.recv() => match event {
                Ok(QueueEvent::StatusChanged { id, attempt, status }) => {
                    let name = names.get(&id).map(String::as_str).unwrap_or("?");
                    match &status {
                        JobStatus::Failed { detail } => {
                            println!("[{id}] {name}: failed (attempt {attempt}): {detail}");
                        }
                        status => println!("[{id}] {name}: {}", status.label()),
                    }
                    if status.is_terminal() {
                        pending.remove(&id);
                        if pending.is_empty() {
                            break;
                        }
                    }
                }
                Ok(QueueEvent::Progress { id, progress }) => {
                    if let Some(line) = format_progress(&progress) {
                        let name = names.get(&id).map(String::as_str).unwrap_or("?");
                        println!("[{id}] {name}: {line}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("event stream lagged by {n}");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

fn format_progress(progress: &Progress) -> Option<String> {
    if let Some(message) = &progress.message {
        return Some(message.clone());
    }
    let percent = progress.percent?;
    let mut line = format!("{percent:5.1}%");
    if let Some(bps) = progress.speed_bps {
        line.push_str(&format!("  {}/s", format_bytes(bps)));
    }
    if let Some(eta) = progress.eta_secs {
        line.push_str(&format!("  ETA {}", format_clock(eta)));
    }
    Some(line)
}

fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn summarize(state: &QueueState, skipped: usize) -> Result<()> {
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut canceled = 0usize;
    for job in state.jobs() {
        match &job.status {
            JobStatus::Succeeded => succeeded += 1,
            JobStatus::Failed { .. } => failed += 1,
            JobStatus::Canceled => canceled += 1,
            _ => {}
        }
    }
    println!("done: {succeeded} succeeded, {failed} failed, {canceled} canceled, {skipped} skipped");
    for job in state.jobs() {
        if let JobStatus::Failed { detail } = &job.status {
            println!(
                "  {} (line {}): {detail}",
                job.clip.output_name, job.clip.line
            );
        }
    }
    anyhow::ensure!(failed == 0, "{failed} download(s) failed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::format_bytes;

    #[test]
    fn byte_rates_scale_by_unit() {
        assert_eq!(format_bytes(512.0), "512.0 B");
        assert_eq!(format_bytes(2048.0), "2.0 KiB");
        assert_eq!(format_bytes(5.0 * 1024.0 * 1024.0), "5.0 MiB");
    }
}
