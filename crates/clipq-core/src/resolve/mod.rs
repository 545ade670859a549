//! Clip resolution: raw blocks to padded cut ranges and output names.
//!
//! A [`ClipBlock`](crate::clipfile::ClipBlock) resolves against the effective
//! pad for its video into a [`ResolvedClip`]. Invalid clips are kept with
//! their failure reason so they can be displayed; they are never enqueued.

mod output_name;
mod sanitize;
mod video_id;

pub use output_name::{render, validate_template, NameParts, TemplateError, DEFAULT_TEMPLATE};
pub use sanitize::sanitize_basename;
pub use video_id::extract_video_id;

use crate::clipfile::ClipBlock;
use crate::timecode::{self, TimeError};

/// Effective pad seconds applied before the start and after the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pad {
    pub before: u32,
    pub after: u32,
}

/// Why a clip could not be resolved. All variants are recoverable: the clip
/// is retained for display and excluded from queueing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("start reference: {0}")]
    Start(TimeError),
    #[error("end reference: {0}")]
    End(TimeError),
    #[error("cannot determine video id from: {0}")]
    VideoId(String),
    #[error("start and end refer to different videos ({start_id} vs {end_id})")]
    VideoMismatch { start_id: String, end_id: String },
    #[error("clip end ({end}s) must be greater than start ({start}s)")]
    EmptyRange { start: u64, end: u64 },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("clips are in different videos and cannot be merged")]
    MergeVideoMismatch,
    #[error("padded ranges are not adjacent or overlapping")]
    MergeDisjoint,
}

/// A clip block after time extraction, validation, padding, and naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClip {
    pub tag: Option<String>,
    pub video_id: String,
    /// Raw start URL; time parameters are stripped at invocation time.
    pub start_url: String,
    pub start_secs: u64,
    pub end_secs: u64,
    /// Padded range actually cut: `max(0, start - pad.before)`.
    pub cut_start: u64,
    /// Padded range end: `end + pad.after`.
    pub cut_end: u64,
    /// Sanitized output basename (no extension).
    pub output_name: String,
    /// Line of the originating `CLIP` header, for error reporting.
    pub line: usize,
}

/// One clip from the file: either resolved or kept with its failure reason.
#[derive(Debug, Clone)]
pub struct ClipEntry {
    pub block: ClipBlock,
    pub outcome: Result<ResolvedClip, ResolveError>,
}

/// Two distinct clips whose resolved output names collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
    pub name: String,
    /// Header line of the first clip claiming the name.
    pub first_line: usize,
    /// Header line of the later clip that conflicts with it.
    pub conflict_line: usize,
}

/// Resolves one block. `pad_for` supplies the per-video effective pad; a
/// `PAD` line on the block overrides it.
pub fn resolve_block(
    block: &ClipBlock,
    pad_for: impl Fn(&str) -> Pad,
    template: &str,
) -> Result<ResolvedClip, ResolveError> {
    let start_secs = timecode::seconds_from_url(&block.start_ref).map_err(ResolveError::Start)?;
    let video_id = extract_video_id(&block.start_ref)
        .ok_or_else(|| ResolveError::VideoId(block.start_ref.clone()))?;

    // The end reference may be a URL into the same video, or a bare token.
    let end_secs = match timecode::seconds_from_url(&block.end_ref) {
        Ok(secs) => {
            let end_id = extract_video_id(&block.end_ref)
                .ok_or_else(|| ResolveError::VideoId(block.end_ref.clone()))?;
            if end_id != video_id {
                return Err(ResolveError::VideoMismatch {
                    start_id: video_id,
                    end_id,
                });
            }
            secs
        }
        Err(TimeError::BadUrl(_)) => {
            timecode::seconds_from_token(&block.end_ref).map_err(ResolveError::End)?
        }
        Err(e) => return Err(ResolveError::End(e)),
    };

    if end_secs <= start_secs {
        return Err(ResolveError::EmptyRange {
            start: start_secs,
            end: end_secs,
        });
    }

    let pad = match block.pad_override {
        Some((before, after)) => Pad { before, after },
        None => pad_for(&video_id),
    };
    let cut_start = start_secs.saturating_sub(u64::from(pad.before));
    let cut_end = end_secs + u64::from(pad.after);

    let output_name = render(
        template,
        &NameParts {
            tag: block.tag.as_deref().unwrap_or(""),
            start: &timecode::format_seconds(start_secs),
            end: &timecode::format_seconds(end_secs),
            video_id: &video_id,
            title: "",
        },
    )?;

    Ok(ResolvedClip {
        tag: block.tag.clone(),
        video_id,
        start_url: block.start_ref.clone(),
        start_secs,
        end_secs,
        cut_start,
        cut_end,
        output_name,
        line: block.line,
    })
}

/// Resolves every block, keeping invalid clips with their reasons.
pub fn resolve_blocks(
    blocks: &[ClipBlock],
    pad_for: impl Fn(&str) -> Pad,
    template: &str,
) -> Vec<ClipEntry> {
    blocks
        .iter()
        .map(|block| ClipEntry {
            block: block.clone(),
            outcome: resolve_block(block, &pad_for, template),
        })
        .collect()
}

/// Groups resolved clips by video id, in first-appearance order.
pub fn group_by_video<'a>(
    clips: impl IntoIterator<Item = &'a ResolvedClip>,
) -> Vec<(String, Vec<&'a ResolvedClip>)> {
    let mut groups: Vec<(String, Vec<&'a ResolvedClip>)> = Vec::new();
    for clip in clips {
        match groups.iter_mut().find(|(id, _)| *id == clip.video_id) {
            Some((_, members)) => members.push(clip),
            None => groups.push((clip.video_id.clone(), vec![clip])),
        }
    }
    groups
}

/// Finds output-name collisions among resolved clips. Each later clip that
/// re-uses an earlier clip's name is one conflict.
pub fn find_name_conflicts<'a>(
    clips: impl IntoIterator<Item = &'a ResolvedClip>,
) -> Vec<NameConflict> {
    let mut seen: Vec<(&str, usize)> = Vec::new();
    let mut conflicts = Vec::new();
    for clip in clips {
        match seen.iter().find(|(name, _)| *name == clip.output_name) {
            Some(&(_, first_line)) => conflicts.push(NameConflict {
                name: clip.output_name.clone(),
                first_line,
                conflict_line: clip.line,
            }),
            None => seen.push((&clip.output_name, clip.line)),
        }
    }
    conflicts
}

/// Whether two clips in the same video touch or overlap after padding.
pub fn can_merge(a: &ResolvedClip, b: &ResolvedClip) -> bool {
    a.video_id == b.video_id && a.cut_start <= b.cut_end && b.cut_start <= a.cut_end
}

/// Merges two adjacent/overlapping clips of one video into a single clip
/// spanning `min(start)..max(end)`. Explicit, one-way: the caller decides.
pub fn merge(
    a: &ResolvedClip,
    b: &ResolvedClip,
    template: &str,
) -> Result<ResolvedClip, ResolveError> {
    if a.video_id != b.video_id {
        return Err(ResolveError::MergeVideoMismatch);
    }
    if !can_merge(a, b) {
        return Err(ResolveError::MergeDisjoint);
    }

    let (first, last) = if a.start_secs <= b.start_secs { (a, b) } else { (b, a) };
    let start_secs = first.start_secs;
    let end_secs = first.end_secs.max(last.end_secs);
    let tag = first.tag.clone().or_else(|| last.tag.clone());

    let output_name = render(
        template,
        &NameParts {
            tag: tag.as_deref().unwrap_or(""),
            start: &crate::timecode::format_seconds(start_secs),
            end: &crate::timecode::format_seconds(end_secs),
            video_id: &first.video_id,
            title: "",
        },
    )?;

    Ok(ResolvedClip {
        tag,
        video_id: first.video_id.clone(),
        start_url: first.start_url.clone(),
        start_secs,
        end_secs,
        cut_start: first.cut_start.min(last.cut_start),
        cut_end: first.cut_end.max(last.cut_end),
        output_name,
        line: first.line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipfile::parse_clip_file;

    const TEMPLATE: &str = "{tag}_{start}-{end}_{videoid}";

    fn block(start: &str, end: &str) -> ClipBlock {
        ClipBlock {
            tag: Some("serve".to_string()),
            start_ref: start.to_string(),
            end_ref: end.to_string(),
            pad_override: None,
            line: 1,
        }
    }

    fn pad55(_: &str) -> Pad {
        Pad { before: 5, after: 5 }
    }

    #[test]
    fn file_to_resolved_clip_end_to_end() {
        let file = parse_clip_file(
            "CLIP serve\nhttps://youtu.be/AAA?t=10\nhttps://youtu.be/AAA?t=40\n",
        );
        let entries = resolve_blocks(&file.blocks, pad55, TEMPLATE);
        assert_eq!(entries.len(), 1);
        let clip = entries[0].outcome.as_ref().unwrap();
        assert_eq!(clip.video_id, "AAA");
        assert_eq!(clip.start_secs, 10);
        assert_eq!(clip.end_secs, 40);
        assert_eq!(clip.cut_start, 5);
        assert_eq!(clip.cut_end, 45);
        assert_eq!(clip.output_name, "serve_10-40_AAA");
    }

    #[test]
    fn cut_start_never_negative() {
        let b = block("https://youtu.be/AAA?t=5", "https://youtu.be/AAA?t=40");
        let clip = resolve_block(&b, |_| Pad { before: 100, after: 0 }, TEMPLATE).unwrap();
        assert_eq!(clip.cut_start, 0);
    }

    #[test]
    fn per_clip_pad_overrides_video_pad() {
        let mut b = block("https://youtu.be/AAA?t=10", "https://youtu.be/AAA?t=40");
        b.pad_override = Some((1, 2));
        let clip = resolve_block(&b, pad55, TEMPLATE).unwrap();
        assert_eq!(clip.cut_start, 9);
        assert_eq!(clip.cut_end, 42);
    }

    #[test]
    fn end_at_or_before_start_is_invalid() {
        let b = block("https://youtu.be/AAA?t=40", "https://youtu.be/AAA?t=40");
        assert_eq!(
            resolve_block(&b, pad55, TEMPLATE),
            Err(ResolveError::EmptyRange { start: 40, end: 40 })
        );
        let b = block("https://youtu.be/AAA?t=40", "https://youtu.be/AAA?t=10");
        assert!(matches!(
            resolve_block(&b, pad55, TEMPLATE),
            Err(ResolveError::EmptyRange { .. })
        ));
    }

    #[test]
    fn bare_token_end_inherits_start_video() {
        let b = block("https://youtu.be/AAA?t=10", "1m30s");
        let clip = resolve_block(&b, pad55, TEMPLATE).unwrap();
        assert_eq!(clip.end_secs, 90);
        assert_eq!(clip.video_id, "AAA");
    }

    #[test]
    fn cross_video_clip_rejected() {
        let b = block("https://youtu.be/AAA?t=10", "https://youtu.be/BBB?t=40");
        assert!(matches!(
            resolve_block(&b, pad55, TEMPLATE),
            Err(ResolveError::VideoMismatch { .. })
        ));
    }

    #[test]
    fn unreadable_time_is_invalid_not_fatal() {
        let b = block("https://youtu.be/AAA", "https://youtu.be/AAA?t=40");
        assert!(matches!(
            resolve_block(&b, pad55, TEMPLATE),
            Err(ResolveError::Start(_))
        ));
    }

    #[test]
    fn groups_follow_first_appearance_order() {
        let mk = |vid: &str, t: u64| {
            resolve_block(
                &block(
                    &format!("https://youtu.be/{vid}?t={t}"),
                    &format!("https://youtu.be/{vid}?t={}", t + 10),
                ),
                pad55,
                TEMPLATE,
            )
            .unwrap()
        };
        let clips = [mk("B", 10), mk("A", 10), mk("B", 100)];
        let groups = group_by_video(clips.iter());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "B");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "A");
    }

    #[test]
    fn name_conflicts_detected() {
        let b1 = block("https://youtu.be/AAA?t=10", "https://youtu.be/AAA?t=40");
        let mut b2 = b1.clone();
        b2.line = 9;
        let c1 = resolve_block(&b1, pad55, TEMPLATE).unwrap();
        let c2 = resolve_block(&b2, pad55, TEMPLATE).unwrap();
        let conflicts = find_name_conflicts([&c1, &c2]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first_line, 1);
        assert_eq!(conflicts[0].conflict_line, 9);
    }

    #[test]
    fn merge_overlapping_clips() {
        let a = resolve_block(
            &block("https://youtu.be/AAA?t=10", "https://youtu.be/AAA?t=40"),
            pad55,
            TEMPLATE,
        )
        .unwrap();
        let b = resolve_block(
            &block("https://youtu.be/AAA?t=44", "https://youtu.be/AAA?t=80"),
            pad55,
            TEMPLATE,
        )
        .unwrap();
        // Padded: 5..45 and 39..85 overlap.
        assert!(can_merge(&a, &b));
        let merged = merge(&a, &b, TEMPLATE).unwrap();
        assert_eq!(merged.start_secs, 10);
        assert_eq!(merged.end_secs, 80);
        assert_eq!(merged.cut_start, 5);
        assert_eq!(merged.cut_end, 85);
        assert_eq!(merged.output_name, "serve_10-80_AAA");
    }

    #[test]
    fn merge_refuses_disjoint_and_cross_video() {
        let a = resolve_block(
            &block("https://youtu.be/AAA?t=10", "https://youtu.be/AAA?t=20"),
            |_| Pad::default(),
            TEMPLATE,
        )
        .unwrap();
        let b = resolve_block(
            &block("https://youtu.be/AAA?t=100", "https://youtu.be/AAA?t=120"),
            |_| Pad::default(),
            TEMPLATE,
        )
        .unwrap();
        assert_eq!(merge(&a, &b, TEMPLATE), Err(ResolveError::MergeDisjoint));

        let c = resolve_block(
            &block("https://youtu.be/BBB?t=10", "https://youtu.be/BBB?t=20"),
            |_| Pad::default(),
            TEMPLATE,
        )
        .unwrap();
        assert_eq!(merge(&a, &c, TEMPLATE), Err(ResolveError::MergeVideoMismatch));
    }
}
