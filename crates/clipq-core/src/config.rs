use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::resolve::Pad;

/// Per-video pad override (section in `[video_pads]`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PadOverride {
    pub before: u32,
    pub after: u32,
}

/// Global configuration loaded from `~/.config/clipq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipqConfig {
    /// Default seconds of padding before each clip's start.
    pub pad_before: u32,
    /// Default seconds of padding after each clip's end.
    pub pad_after: u32,
    /// Maximum number of downloads running at once.
    pub max_concurrent_downloads: usize,
    /// Container format passed to the downloader (mp4, mkv, webm).
    pub output_format: String,
    /// Output basename template; see `resolve::validate_template`.
    pub output_template: String,
    /// Seconds to wait after a graceful stop signal before force-killing.
    pub stop_grace_secs: u64,
    /// Per-video pad overrides keyed by video id.
    #[serde(default)]
    pub video_pads: HashMap<String, PadOverride>,
}

impl Default for ClipqConfig {
    fn default() -> Self {
        Self {
            pad_before: 0,
            pad_after: 0,
            max_concurrent_downloads: 2,
            output_format: "mp4".to_string(),
            output_template: crate::resolve::DEFAULT_TEMPLATE.to_string(),
            stop_grace_secs: 5,
            video_pads: HashMap::new(),
        }
    }
}

impl ClipqConfig {
    /// Effective pad for a video: per-video override, else the global default.
    /// A per-clip `PAD` line overrides both (applied in `resolve`).
    pub fn pad_for(&self, video_id: &str) -> Pad {
        match self.video_pads.get(video_id) {
            Some(p) => Pad {
                before: p.before,
                after: p.after,
            },
            None => Pad {
                before: self.pad_before,
                after: self.pad_after,
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("clipq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClipqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClipqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ClipqConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ClipqConfig::default();
        assert_eq!(cfg.pad_before, 0);
        assert_eq!(cfg.pad_after, 0);
        assert_eq!(cfg.max_concurrent_downloads, 2);
        assert_eq!(cfg.output_format, "mp4");
        assert_eq!(cfg.stop_grace_secs, 5);
        assert!(cfg.video_pads.is_empty());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ClipqConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ClipqConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_concurrent_downloads, cfg.max_concurrent_downloads);
        assert_eq!(parsed.output_template, cfg.output_template);
        assert_eq!(parsed.output_format, cfg.output_format);
    }

    #[test]
    fn config_toml_video_pads() {
        let toml = r#"
            pad_before = 5
            pad_after = 5
            max_concurrent_downloads = 3
            output_format = "mkv"
            output_template = "{tag}_{videoid}"
            stop_grace_secs = 2

            [video_pads.AAA]
            before = 1
            after = 2
        "#;
        let cfg: ClipqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent_downloads, 3);
        assert_eq!(cfg.pad_for("AAA"), Pad { before: 1, after: 2 });
        assert_eq!(cfg.pad_for("BBB"), Pad { before: 5, after: 5 });
    }
}
