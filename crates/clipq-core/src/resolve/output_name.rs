//! Output-name templating.
//!
//! Templates are plain strings with `{tag}`, `{start}`, `{end}`,
//! `{videoid}`, and `{title}` placeholders. Absent fields render as empty
//! segments; the result is sanitized and separator runs are collapsed, so
//! `{tag}_{videoid}` with no tag yields `videoid`, not `_videoid`.

use super::sanitize::sanitize_basename;

const FIELDS: &[&str] = &["tag", "start", "end", "videoid", "title"];

/// Default template, matching `{tag}_{videoid}_{start}-{end}`.
pub const DEFAULT_TEMPLATE: &str = "{tag}_{videoid}_{start}-{end}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("output template cannot be empty")]
    Empty,
    #[error("unknown output field: {{{0}}}")]
    UnknownField(String),
    #[error("unclosed {{ in output template")]
    Unclosed,
}

/// Field values rendered into a template. Empty strings mean "absent".
#[derive(Debug, Clone, Default)]
pub struct NameParts<'a> {
    pub tag: &'a str,
    pub start: &'a str,
    pub end: &'a str,
    pub video_id: &'a str,
    pub title: &'a str,
}

/// Checks a template for unknown or malformed placeholders.
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    if template.trim().is_empty() {
        return Err(TemplateError::Empty);
    }
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or(TemplateError::Unclosed)?;
        let field = &after[..close];
        if !FIELDS.contains(&field) {
            return Err(TemplateError::UnknownField(field.to_string()));
        }
        rest = &after[close + 1..];
    }
    Ok(())
}

/// Renders a template to a sanitized, filesystem-safe basename.
pub fn render(template: &str, parts: &NameParts<'_>) -> Result<String, TemplateError> {
    validate_template(template)?;

    let mut raw = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        raw.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or(TemplateError::Unclosed)?;
        raw.push_str(match &after[..close] {
            "tag" => parts.tag,
            "start" => parts.start,
            "end" => parts.end,
            "videoid" => parts.video_id,
            "title" => parts.title,
            other => return Err(TemplateError::UnknownField(other.to_string())),
        });
        rest = &after[close + 1..];
    }
    raw.push_str(rest);

    let name = sanitize_basename(&raw);
    if name.is_empty() {
        Ok("clip".to_string())
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts<'a>() -> NameParts<'a> {
        NameParts {
            tag: "serve",
            start: "10",
            end: "40",
            video_id: "AAA",
            title: "",
        }
    }

    #[test]
    fn renders_tag_range_and_video() {
        let name = render("{tag}_{start}-{end}_{videoid}", &parts()).unwrap();
        assert_eq!(name, "serve_10-40_AAA");
    }

    #[test]
    fn absent_fields_collapse_separators() {
        let mut p = parts();
        p.tag = "";
        assert_eq!(render("{tag}_{videoid}", &p).unwrap(), "AAA");
        assert_eq!(
            render("{tag}_{start}-{end}_{videoid}", &p).unwrap(),
            "10-40_AAA"
        );
    }

    #[test]
    fn absent_field_between_mixed_separators_leaves_one() {
        let name = render("{videoid}-{title}_{tag}", &parts()).unwrap();
        assert_eq!(name, "AAA-serve");
    }

    #[test]
    fn tag_differences_produce_distinct_names() {
        let a = render(DEFAULT_TEMPLATE, &parts()).unwrap();
        let mut p = parts();
        p.tag = "return";
        let b = render(DEFAULT_TEMPLATE, &p).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn all_fields_absent_falls_back() {
        let p = NameParts::default();
        assert_eq!(render("{tag}_{title}", &p).unwrap(), "clip");
    }

    #[test]
    fn unknown_field_rejected() {
        assert_eq!(
            validate_template("{tag}_{bogus}"),
            Err(TemplateError::UnknownField("bogus".to_string()))
        );
    }

    #[test]
    fn malformed_templates_rejected() {
        assert_eq!(validate_template("   "), Err(TemplateError::Empty));
        assert_eq!(validate_template("{tag"), Err(TemplateError::Unclosed));
        assert_eq!(
            validate_template("{}"),
            Err(TemplateError::UnknownField(String::new()))
        );
    }

    #[test]
    fn tag_text_is_sanitized() {
        let mut p = parts();
        p.tag = "net rush / drop?";
        let name = render("{tag}_{videoid}", &p).unwrap();
        assert_eq!(name, "net_rush_drop_AAA");
    }
}
