//! yt-dlp invocation building.
//!
//! Argument-list based; nothing is ever passed through a shell. The
//! progress template asks yt-dlp for one self-describing line per update,
//! prefixed so the reader can tell it from ordinary output.

use std::path::PathBuf;

use url::Url;

use crate::resolve::ResolvedClip;

/// The external downloader command.
pub const DOWNLOADER_BIN: &str = "yt-dlp";

/// Prefix of machine-readable progress lines we request from yt-dlp.
pub const PROGRESS_PREFIX: &str = "clipq:";

const PROGRESS_TEMPLATE: &str = "clipq:status=%(progress.status)s \
percent=%(progress.percent)s \
downloaded=%(progress.downloaded_bytes)s \
total=%(progress.total_bytes)s \
total_est=%(progress.total_bytes_estimate)s \
speed=%(progress.speed)s \
eta=%(progress.eta)s";

/// Everything needed to invoke one download.
#[derive(Debug, Clone)]
pub struct DownloadSpec {
    /// Source URL with time parameters stripped.
    pub url: String,
    pub cut_start: u64,
    pub cut_end: u64,
    pub output_dir: PathBuf,
    /// Output basename without extension.
    pub output_name: String,
    /// Container format (mp4, mkv, webm), lowercase, no leading dot.
    pub format: String,
}

impl DownloadSpec {
    pub fn for_clip(clip: &ResolvedClip, output_dir: PathBuf, format: &str) -> Self {
        Self {
            url: strip_time_params(&clip.start_url),
            cut_start: clip.cut_start,
            cut_end: clip.cut_end,
            output_dir,
            output_name: clip.output_name.clone(),
            format: format.trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    /// The file the downloader will produce.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_name, self.format))
    }
}

/// Builds the full argument vector (everything after the program name).
pub fn build_args(spec: &DownloadSpec) -> Vec<String> {
    let output_pattern = spec
        .output_dir
        .join(format!("{}.%(ext)s", spec.output_name));
    vec![
        "--no-playlist".to_string(),
        "--newline".to_string(),
        "--no-color".to_string(),
        "--progress-template".to_string(),
        format!("download:{PROGRESS_TEMPLATE}"),
        "--merge-output-format".to_string(),
        spec.format.clone(),
        "--download-sections".to_string(),
        format!("*{}-{}", spec.cut_start, spec.cut_end),
        "-o".to_string(),
        output_pattern.to_string_lossy().into_owned(),
        spec.url.clone(),
    ]
}

/// Removes `t`/`start` query parameters and the fragment, so the downloader
/// sees the plain video URL. Unparseable input is returned unchanged.
pub fn strip_time_params(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "t" && k != "start")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept).finish();
    }
    url.set_fragment(None);
    url.into()
}
