//! Progress-line grammar for downloader output.
//!
//! Two accepted shapes: the self-describing `clipq:key=value …` line we
//! request via `--progress-template`, and a best-effort scrape of yt-dlp's
//! human output (`NN.N%`, `<rate><unit>/s`, `ETA mm:ss`). Anything else is
//! kept as an opaque status line so a job never looks stalled just because
//! a line did not parse.

use super::command::PROGRESS_PREFIX;

/// One parsed line of downloader output.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    Update(ProgressUpdate),
    /// Non-progress output, verbatim.
    Status(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    /// Percent complete, clamped to 0–100.
    pub percent: Option<f64>,
    pub speed_bps: Option<f64>,
    pub eta_secs: Option<u64>,
    /// Downloader phase from the template line (e.g. "downloading").
    pub phase: Option<String>,
}

/// Classifies one output line. Empty lines yield `None`.
pub fn parse_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        return Some(ProgressLine::Update(parse_template_line(rest)));
    }

    match parse_plain_line(line) {
        Some(update) => Some(ProgressLine::Update(update)),
        None => Some(ProgressLine::Status(line.to_string())),
    }
}

/// Parses the requested `key=value` template form.
fn parse_template_line(rest: &str) -> ProgressUpdate {
    let mut percent = None;
    let mut downloaded = None;
    let mut total = None;
    let mut total_est = None;
    let mut speed = None;
    let mut eta = None;
    let mut phase = None;

    for token in rest.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "percent" => percent = parse_num(value),
            "downloaded" => downloaded = parse_num(value),
            "total" => total = parse_num(value),
            "total_est" => total_est = parse_num(value),
            "speed" => speed = parse_speed(value),
            "eta" => eta = parse_num(value).map(|v| v.max(0.0) as u64),
            "status" if !value.is_empty() => phase = Some(value.to_string()),
            _ => {}
        }
    }

    // Derive percent from byte counts when the template omits it.
    if percent.is_none() {
        if let Some(done) = downloaded {
            let denom = total.filter(|t| *t > 0.0).or(total_est.filter(|t| *t > 0.0));
            if let Some(denom) = denom {
                percent = Some(done / denom * 100.0);
            }
        }
    }

    ProgressUpdate {
        percent: percent.map(|p| p.clamp(0.0, 100.0)),
        speed_bps: speed,
        eta_secs: eta,
        phase,
    }
}

/// Scrapes percent/speed/ETA tokens out of a human-readable line. Returns
/// `None` unless at least a percent or an ETA was found.
fn parse_plain_line(line: &str) -> Option<ProgressUpdate> {
    let mut percent = None;
    let mut speed = None;
    let mut eta = None;

    let mut tokens = line.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        if let Some(value) = token.strip_suffix('%') {
            if percent.is_none() {
                percent = value.parse::<f64>().ok();
            }
        } else if let Some(value) = token.strip_suffix("/s") {
            if speed.is_none() {
                speed = parse_rate(value);
            }
        } else if token == "ETA" {
            if let Some(next) = tokens.peek() {
                if let Some(secs) = parse_clock(next) {
                    eta = Some(secs);
                    tokens.next();
                }
            }
        }
    }

    if percent.is_none() && eta.is_none() {
        return None;
    }
    Some(ProgressUpdate {
        percent: percent.map(|p| p.clamp(0.0, 100.0)),
        speed_bps: speed,
        eta_secs: eta,
        phase: None,
    })
}

/// Numeric field that may be reported as `NA`/`None`/`nan`.
fn parse_num(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || matches!(value.to_ascii_lowercase().as_str(), "na" | "none" | "nan") {
        return None;
    }
    value.parse::<f64>().ok()
}

/// Speed field: plain bytes/sec from the template, or `1.23MiB/s` style.
fn parse_speed(value: &str) -> Option<f64> {
    if let Some(n) = parse_num(value) {
        return Some(n);
    }
    value.strip_suffix("/s").and_then(parse_rate)
}

/// `<magnitude><unit>` where unit is B, KiB/KB, MiB/MB, GiB, TiB, PiB.
fn parse_rate(value: &str) -> Option<f64> {
    let split = value.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    let magnitude: f64 = value[..split].parse().ok()?;
    Some(magnitude * unit_multiplier(&value[split..]))
}

fn unit_multiplier(unit: &str) -> f64 {
    let normalized = unit.trim().to_ascii_uppercase().replace("IB", "B");
    match normalized.as_str() {
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        "TB" => 1024.0f64.powi(4),
        "PB" => 1024.0f64.powi(5),
        _ => 1.0,
    }
}

/// `mm:ss` or `hh:mm:ss` ETA token.
fn parse_clock(token: &str) -> Option<u64> {
    let groups: Vec<&str> = token.split(':').collect();
    if groups.len() != 2 && groups.len() != 3 {
        return None;
    }
    let mut total = 0u64;
    for group in groups {
        if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        total = total * 60 + group.parse::<u64>().ok()?;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_line_full() {
        let line = "clipq:status=downloading percent=42.5 downloaded=425000 \
                    total=1000000 total_est=NA speed=125000.5 eta=31";
        let Some(ProgressLine::Update(u)) = parse_line(line) else {
            panic!("expected update");
        };
        assert_eq!(u.percent, Some(42.5));
        assert_eq!(u.speed_bps, Some(125000.5));
        assert_eq!(u.eta_secs, Some(31));
        assert_eq!(u.phase.as_deref(), Some("downloading"));
    }

    #[test]
    fn template_percent_derived_from_bytes() {
        let line = "clipq:status=downloading percent=NA downloaded=250000 \
                    total=NA total_est=1000000 speed=NA eta=NA";
        let Some(ProgressLine::Update(u)) = parse_line(line) else {
            panic!("expected update");
        };
        assert_eq!(u.percent, Some(25.0));
        assert_eq!(u.speed_bps, None);
    }

    #[test]
    fn template_percent_clamped() {
        let line = "clipq:status=downloading percent=104.2 speed=NA eta=NA";
        let Some(ProgressLine::Update(u)) = parse_line(line) else {
            panic!("expected update");
        };
        assert_eq!(u.percent, Some(100.0));
    }

    #[test]
    fn plain_download_line() {
        let line = "[download]  42.1% of 10.00MiB at 1.00MiB/s ETA 00:31";
        let Some(ProgressLine::Update(u)) = parse_line(line) else {
            panic!("expected update");
        };
        assert_eq!(u.percent, Some(42.1));
        assert_eq!(u.speed_bps, Some(1024.0 * 1024.0));
        assert_eq!(u.eta_secs, Some(31));
    }

    #[test]
    fn eta_with_hours() {
        let line = "[download]   1.0% at 500KiB/s ETA 01:02:03";
        let Some(ProgressLine::Update(u)) = parse_line(line) else {
            panic!("expected update");
        };
        assert_eq!(u.eta_secs, Some(3723));
    }

    #[test]
    fn non_progress_line_becomes_status() {
        let line = "[info] AAA: Downloading 1 format(s): 299+140";
        assert_eq!(
            parse_line(line),
            Some(ProgressLine::Status(line.to_string()))
        );
    }

    #[test]
    fn malformed_template_values_degrade_gracefully() {
        // Garbled values must not lose the line, let alone crash.
        let line = "clipq:status= percent=?? downloaded=abc total= speed=-- eta=";
        let Some(ProgressLine::Update(u)) = parse_line(line) else {
            panic!("expected update");
        };
        assert_eq!(u, ProgressUpdate::default());
    }

    #[test]
    fn empty_line_is_nothing() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
    }
}
