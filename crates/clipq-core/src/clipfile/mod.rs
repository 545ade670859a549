//! Clip file parsing.
//!
//! A clip file is UTF-8 text made of blocks:
//!
//! ```text
//! CLIP [tag]
//! [PAD before [after]]
//! <start URL or time reference>
//! <end URL or time reference>
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Parsing is
//! line-driven: a malformed block is recorded as a [`BlockError`] and the
//! scan continues at the next `CLIP` header, so one bad block never hides
//! the valid ones.

/// One parsed `CLIP` block, still unresolved (raw references).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipBlock {
    /// Optional tag from the `CLIP` header line.
    pub tag: Option<String>,
    /// Raw start reference (URL or time token) as written.
    pub start_ref: String,
    /// Raw end reference.
    pub end_ref: String,
    /// Per-clip pad override from a `PAD before [after]` line.
    pub pad_override: Option<(u32, u32)>,
    /// 1-based line number of the `CLIP` header.
    pub line: usize,
}

/// A recoverable parse failure attached to one spot in the file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct BlockError {
    pub line: usize,
    pub reason: String,
}

/// Result of parsing one clip file: blocks in file order plus any
/// per-block errors, both fully materialized.
#[derive(Debug, Clone, Default)]
pub struct ClipFile {
    pub blocks: Vec<ClipBlock>,
    pub errors: Vec<BlockError>,
}

/// Parses clip-file text. Never fails as a whole; see [`ClipFile::errors`].
pub fn parse_clip_file(text: &str) -> ClipFile {
    let text = text.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = text.lines().collect();
    let mut out = ClipFile::default();
    let mut i = 0usize;

    while i < lines.len() {
        let line_no = i + 1;
        let stripped = lines[i].trim();
        i += 1;

        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let Some(tag) = clip_header(stripped) else {
            out.errors.push(BlockError {
                line: line_no,
                reason: format!("expected CLIP header, found: {stripped}"),
            });
            continue;
        };

        match read_block(&lines, &mut i, line_no, tag) {
            Ok(block) => out.blocks.push(block),
            Err(e) => out.errors.push(e),
        }
    }

    out
}

/// Returns `Some(tag)` if the line is a `CLIP` header.
fn clip_header(line: &str) -> Option<Option<String>> {
    if line == "CLIP" {
        return Some(None);
    }
    let rest = line.strip_prefix("CLIP ")?.trim();
    Some(if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    })
}

fn read_block(
    lines: &[&str],
    i: &mut usize,
    header_line: usize,
    tag: Option<String>,
) -> Result<ClipBlock, BlockError> {
    let mut pad_override = None;

    let first = next_data(lines, i, header_line, "CLIP block missing start reference")?;
    let (start_ref, start_line) = first;
    let start_ref = if is_pad_line(&start_ref) {
        pad_override = Some(parse_pad_line(&start_ref, start_line)?);
        let (url, _) = next_data(lines, i, header_line, "CLIP block missing start reference")?;
        url
    } else {
        start_ref
    };

    let (end_ref, _) = next_data(lines, i, header_line, "CLIP block missing end reference")?;

    Ok(ClipBlock {
        tag,
        start_ref,
        end_ref,
        pad_override,
        line: header_line,
    })
}

/// Advances to the next non-blank, non-comment line. Does not consume a
/// `CLIP` header: that means the current block is incomplete.
fn next_data(
    lines: &[&str],
    i: &mut usize,
    header_line: usize,
    missing: &str,
) -> Result<(String, usize), BlockError> {
    while *i < lines.len() {
        let line_no = *i + 1;
        let stripped = lines[*i].trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            *i += 1;
            continue;
        }
        if clip_header(stripped).is_some() {
            break;
        }
        *i += 1;
        return Ok((stripped.to_string(), line_no));
    }
    Err(BlockError {
        line: header_line,
        reason: missing.to_string(),
    })
}

fn is_pad_line(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|w| w.eq_ignore_ascii_case("PAD"))
}

fn parse_pad_line(line: &str, line_no: usize) -> Result<(u32, u32), BlockError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let invalid = || BlockError {
        line: line_no,
        reason: format!("invalid PAD line: {line}"),
    };
    let (before, after) = match parts.as_slice() {
        [_, before] => (before, None),
        [_, before, after] => (before, Some(after)),
        _ => return Err(invalid()),
    };
    let before: u32 = before.parse().map_err(|_| invalid())?;
    let after: u32 = match after {
        Some(a) => a.parse().map_err(|_| invalid())?,
        None => 0,
    };
    Ok((before, after))
}
