//! CLI command handlers, one file per command.

mod check;
mod download;

pub use check::run_check;
pub use download::run_download;

use anyhow::{Context, Result};
use clipq_core::clipfile::{self, BlockError};
use clipq_core::config::ClipqConfig;
use clipq_core::resolve::{self, ClipEntry};
use std::fs;
use std::path::Path;

/// A clip file read from disk, parsed and resolved against the config.
pub(super) struct ResolvedFile {
    pub parse_errors: Vec<BlockError>,
    pub entries: Vec<ClipEntry>,
}

pub(super) fn resolve_file(cfg: &ClipqConfig, file: &Path) -> Result<ResolvedFile> {
    resolve::validate_template(&cfg.output_template)
        .with_context(|| format!("invalid output template {:?}", cfg.output_template))?;
    let text = fs::read_to_string(file)
        .with_context(|| format!("cannot read clip file {}", file.display()))?;
    let parsed = clipfile::parse_clip_file(&text);
    let entries = resolve::resolve_blocks(
        &parsed.blocks,
        |video_id| cfg.pad_for(video_id),
        &cfg.output_template,
    );
    Ok(ResolvedFile {
        parse_errors: parsed.errors,
        entries,
    })
}
