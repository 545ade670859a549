//! Time token and URL timestamp parsing.
//!
//! Converts the accepted time grammars (plain seconds, `90s`, `mm:ss`,
//! `hh:mm:ss`, `NhNmNs`) and `t=`/`start=` URL parameters into whole
//! seconds. Pure functions; no clip semantics.

use url::Url;

/// Error for an unrecognized or out-of-range time token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("empty time token")]
    Empty,
    #[error("invalid time token: {0}")]
    InvalidToken(String),
    #[error("no t= or start= parameter in URL")]
    MissingParam,
    #[error("not a valid URL: {0}")]
    BadUrl(String),
}

/// Parses a bare time token into total seconds.
///
/// Accepted forms, in priority order:
/// 1. pure digits, optionally suffixed with `s` (whole seconds)
/// 2. `mm:ss` or `hh:mm:ss` (groups right of the leftmost must be < 60)
/// 3. `NhNmNs` where any component may be omitted but order is h, m, s
pub fn seconds_from_token(token: &str) -> Result<u64, TimeError> {
    let token = token.trim().to_ascii_lowercase();
    if token.is_empty() {
        return Err(TimeError::Empty);
    }

    if let Some(bare) = token.strip_suffix('s') {
        if !bare.is_empty() && bare.bytes().all(|b| b.is_ascii_digit()) {
            return parse_digits(bare, &token);
        }
    }
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return parse_digits(&token, &token);
    }
    if token.contains(':') {
        return seconds_from_clock(&token);
    }
    seconds_from_hms(&token)
}

/// Extracts total seconds from a URL's `t=` or `start=` parameter.
///
/// The query string is consulted first (`t` wins over `start`); if neither
/// is present there, the fragment is parsed the same way.
pub fn seconds_from_url(raw: &str) -> Result<u64, TimeError> {
    let url = Url::parse(raw.trim()).map_err(|e| TimeError::BadUrl(e.to_string()))?;

    let token = time_param(url.query_pairs())
        .or_else(|| {
            url.fragment()
                .and_then(|f| time_param(url::form_urlencoded::parse(f.as_bytes())))
        })
        .ok_or(TimeError::MissingParam)?;

    seconds_from_token(&token)
}

/// Formats seconds back into the canonical plain-integer token.
pub fn format_seconds(secs: u64) -> String {
    secs.to_string()
}

/// Formats seconds as `h:mm:ss`, or `m:ss` under an hour. Display only.
pub fn format_clock(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

fn time_param<'a>(pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>) -> Option<String> {
    let mut start: Option<String> = None;
    for (key, value) in pairs {
        match key.as_ref() {
            "t" => return Some(value.into_owned()),
            "start" if start.is_none() => start = Some(value.into_owned()),
            _ => {}
        }
    }
    start
}

fn parse_digits(digits: &str, original: &str) -> Result<u64, TimeError> {
    digits
        .parse::<u64>()
        .map_err(|_| TimeError::InvalidToken(original.to_string()))
}

fn seconds_from_clock(token: &str) -> Result<u64, TimeError> {
    let invalid = || TimeError::InvalidToken(token.to_string());
    let groups: Vec<&str> = token.split(':').collect();
    if groups.len() != 2 && groups.len() != 3 {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    for (i, group) in groups.iter().enumerate() {
        if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value = group.parse::<u64>().map_err(|_| invalid())?;
        // Base-60 positional groups; only the leftmost is unbounded.
        if i > 0 && value >= 60 {
            return Err(invalid());
        }
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(invalid)?;
    }
    Ok(total)
}

fn seconds_from_hms(token: &str) -> Result<u64, TimeError> {
    let invalid = || TimeError::InvalidToken(token.to_string());
    let mut units: &[(char, u64)] = &[('h', 3600), ('m', 60), ('s', 1)];
    let mut rest = token;
    let mut total: u64 = 0;
    let mut any = false;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        if digits_end == 0 {
            return Err(invalid());
        }
        let (digits, tail) = rest.split_at(digits_end);
        let unit = tail.chars().next().ok_or_else(invalid)?;

        // Components must appear in h, m, s order with no repeats.
        let pos = units.iter().position(|(u, _)| *u == unit).ok_or_else(invalid)?;
        let value = digits.parse::<u64>().map_err(|_| invalid())?;
        total = value
            .checked_mul(units[pos].1)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
        units = &units[pos + 1..];
        rest = &tail[unit.len_utf8()..];
        any = true;
    }

    if any {
        Ok(total)
    } else {
        Err(invalid())
    }
}
