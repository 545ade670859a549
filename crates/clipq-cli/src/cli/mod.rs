//! CLI for the clipq clip downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clipq_core::config;
use std::path::PathBuf;

use commands::{run_check, run_download};

/// Top-level CLI for the clipq clip downloader.
#[derive(Debug, Parser)]
#[command(name = "clipq")]
#[command(about = "clipq: batch clip downloader driving yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Parse and resolve a clip file without downloading anything.
    Check {
        /// Path to the clip file.
        file: PathBuf,
    },

    /// Download every valid clip in a file through the bounded queue.
    Download {
        /// Path to the clip file.
        file: PathBuf,

        /// Run up to N downloads concurrently (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Directory for finished clips (default: current directory).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Container format passed to the downloader (mp4, mkv, webm).
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// Output basename template, e.g. "{tag}_{videoid}_{start}-{end}".
        #[arg(long, value_name = "TEMPLATE")]
        template: Option<String>,

        /// Seconds of padding before each clip's start.
        #[arg(long, value_name = "SECS")]
        pad_before: Option<u32>,

        /// Seconds of padding after each clip's end.
        #[arg(long, value_name = "SECS")]
        pad_after: Option<u32>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Check { file } => run_check(&cfg, &file)?,
            CliCommand::Download {
                file,
                jobs,
                output_dir,
                format,
                template,
                pad_before,
                pad_after,
            } => {
                if let Some(jobs) = jobs {
                    cfg.max_concurrent_downloads = jobs;
                }
                if let Some(format) = format {
                    cfg.output_format = format;
                }
                if let Some(template) = template {
                    cfg.output_template = template;
                }
                if let Some(secs) = pad_before {
                    cfg.pad_before = secs;
                }
                if let Some(secs) = pad_after {
                    cfg.pad_after = secs;
                }
                let output_dir = match output_dir {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                run_download(&cfg, &file, output_dir).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
