//! Frontmatter parser for post files.
//!
//! A post file looks like:
//!
//! ```text
//! ---
//! title: "Hello"
//! slug: "hello"
//! date: "2024-01-02"
//! tags: [rust, web]
//! ---
//! Markdown body...
//! ```
//!
//! The parser only reports structural problems. Whether the fields it found
//! make a valid post is decided by [`crate::domain::validation`].

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::ParseError;

pub const DELIMITER: &str = "---";

/// Fixed textual format of the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Metadata keys a post understands. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PostField {
    Title,
    Slug,
    Date,
    Tags,
}

impl PostField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "title" => Some(PostField::Title),
            "slug" => Some(PostField::Slug),
            "date" => Some(PostField::Date),
            "tags" => Some(PostField::Tags),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostField::Title => "title",
            PostField::Slug => "slug",
            PostField::Date => "date",
            PostField::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Date(NaiveDate),
}

/// Parsed metadata block plus the body that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frontmatter {
    pub fields: BTreeMap<PostField, FieldValue>,
    pub body: String,
}

impl Frontmatter {
    pub fn get(&self, field: PostField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// The slug, if one was given as plain text.
    pub fn slug(&self) -> Option<&str> {
        match self.fields.get(&PostField::Slug) {
            Some(FieldValue::Text(slug)) => Some(slug.as_str()),
            _ => None,
        }
    }
}

/// Split `raw` into its metadata block and body.
pub fn parse(raw: &str) -> Result<Frontmatter, ParseError> {
    let mut lines = raw.split_inclusive('\n').enumerate();
    let mut offset = 0;

    // Opening delimiter must be the first non-blank line.
    loop {
        let Some((_, line)) = lines.next() else {
            return Err(ParseError::malformed("missing opening `---` delimiter"));
        };
        offset += line.len();
        if line.trim().is_empty() {
            continue;
        }
        if is_delimiter(line) {
            break;
        }
        return Err(ParseError::malformed(
            "first non-blank line must be the `---` delimiter",
        ));
    }

    let mut fields = BTreeMap::new();
    for (index, line) in lines {
        offset += line.len();
        if is_delimiter(line) {
            return Ok(Frontmatter {
                fields,
                body: raw[offset..].to_string(),
            });
        }
        parse_metadata_line(index + 1, line, &mut fields)?;
    }

    Err(ParseError::malformed("missing closing `---` delimiter"))
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn parse_metadata_line(
    line_no: usize,
    line: &str,
    fields: &mut BTreeMap<PostField, FieldValue>,
) -> Result<(), ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let (key, value) = line.split_once(':').ok_or_else(|| {
        ParseError::malformed(format!("line {line_no}: expected `key: value`"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::malformed(format!("line {line_no}: empty key")));
    }

    let Some(field) = PostField::from_key(key) else {
        tracing::trace!("ignoring unknown frontmatter key `{}`", key);
        return Ok(());
    };

    let value = parse_value(field, value.trim())
        .map_err(|detail| ParseError::malformed(format!("line {line_no}: {detail}")))?;
    fields.insert(field, value);
    Ok(())
}

fn parse_value(field: PostField, value: &str) -> Result<FieldValue, String> {
    if let Some(rest) = value.strip_prefix('[') {
        let inner = rest
            .strip_suffix(']')
            .ok_or_else(|| format!("unterminated list for `{}`", field.as_str()))?;
        if inner.trim().is_empty() {
            return Ok(FieldValue::List(Vec::new()));
        }
        let items = split_list(inner)
            .ok_or_else(|| format!("unterminated quote in `{}`", field.as_str()))?;
        return Ok(FieldValue::List(items));
    }

    let text = unquote(value);
    if field == PostField::Date {
        if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
            return Ok(FieldValue::Date(date));
        }
    }
    Ok(FieldValue::Text(text.to_string()))
}

/// Split list items on commas outside quotes. Only a quote that starts an
/// item opens one. `None` if a quote is left open.
fn split_list(inner: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut open: Option<char> = None;
    for (i, c) in inner.char_indices() {
        match (open, c) {
            (Some(quote), c) if c == quote => open = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if inner[start..i].trim().is_empty() => open = Some(c),
            (None, ',') => {
                items.push(unquote(inner[start..i].trim()).to_string());
                start = i + 1;
            }
            (None, _) => {}
        }
    }
    if open.is_some() {
        return None;
    }
    items.push(unquote(inner[start..].trim()).to_string());
    Some(items)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
