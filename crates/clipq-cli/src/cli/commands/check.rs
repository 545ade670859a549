//! `clipq check` – parse and resolve a clip file without downloading.

use anyhow::Result;
use clipq_core::config::ClipqConfig;
use clipq_core::resolve::{find_name_conflicts, group_by_video, ResolvedClip};
use clipq_core::timecode::format_clock;
use std::path::Path;

use super::resolve_file;

pub fn run_check(cfg: &ClipqConfig, file: &Path) -> Result<()> {
    let resolved = resolve_file(cfg, file)?;

    for err in &resolved.parse_errors {
        println!("parse error: {err}");
    }

    let clips: Vec<&ResolvedClip> = resolved
        .entries
        .iter()
        .filter_map(|entry| entry.outcome.as_ref().ok())
        .collect();
    for (video_id, members) in group_by_video(clips.iter().copied()) {
        println!("video {video_id}:");
        for clip in members {
            println!(
                "  line {:<4} {} - {}  cut {}s..{}s  {}",
                clip.line,
                format_clock(clip.start_secs),
                format_clock(clip.end_secs),
                clip.cut_start,
                clip.cut_end,
                clip.output_name
            );
        }
    }

    let mut invalid = 0usize;
    for entry in &resolved.entries {
        if let Err(reason) = &entry.outcome {
            println!("invalid clip at line {}: {reason}", entry.block.line);
            invalid += 1;
        }
    }

    let conflicts = find_name_conflicts(clips.iter().copied());
    for conflict in &conflicts {
        println!(
            "naming conflict: {:?} claimed at line {} and again at line {}",
            conflict.name, conflict.first_line, conflict.conflict_line
        );
    }

    println!(
        "{} clip(s) ok, {} invalid, {} parse error(s), {} naming conflict(s)",
        clips.len(),
        invalid,
        resolved.parse_errors.len(),
        conflicts.len()
    );
    anyhow::ensure!(
        invalid == 0 && resolved.parse_errors.is_empty() && conflicts.is_empty(),
        "clip file has problems"
    );
    Ok(())
}
