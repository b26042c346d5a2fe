//! Field-level validation for parsed posts and projects.
//!
//! Every rule is checked and all violations are returned together, so a
//! single ingestion reports everything wrong with a file at once.

use serde::Serialize;
use std::fmt;

use super::frontmatter::{FieldValue, Frontmatter, PostField};
use super::project_record::{ProjectField, ProjectFields};
use super::record::{ContentRecord, Post, Project};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    Missing {
        field: String,
    },
    Empty {
        field: String,
    },
    InvalidFormat {
        field: String,
        reason: String,
    },
    /// The key is already owned by a different source file.
    SlugConflict {
        field: String,
        key: String,
        owner: String,
    },
}

impl Violation {
    fn missing(field: &str) -> Self {
        Violation::Missing {
            field: field.to_string(),
        }
    }

    fn empty(field: &str) -> Self {
        Violation::Empty {
            field: field.to_string(),
        }
    }

    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Violation::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Violation::Missing { field }
            | Violation::Empty { field }
            | Violation::InvalidFormat { field, .. }
            | Violation::SlugConflict { field, .. } => field,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Violation::SlugConflict { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing { field } => write!(f, "`{field}` is missing"),
            Violation::Empty { field } => write!(f, "`{field}` must not be empty"),
            Violation::InvalidFormat { field, reason } => write!(f, "`{field}` {reason}"),
            Violation::SlugConflict { field, key, owner } => {
                write!(f, "`{field}` value `{key}` is already owned by {owner}")
            }
        }
    }
}

/// Output of either parser, ready for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRecord {
    Post(Frontmatter),
    Project(ProjectFields),
}

impl ParsedRecord {
    /// The candidate primary key, if one was given as text.
    pub fn key(&self) -> Option<&str> {
        match self {
            ParsedRecord::Post(frontmatter) => frontmatter.slug().map(str::trim),
            ParsedRecord::Project(fields) => fields.get(&ProjectField::Name).map(|n| n.trim()),
        }
    }
}

/// Validate a parsed record.
///
/// `owner` is the source path currently owning the record's key in the
/// content store, if any.
pub fn validate(
    parsed: ParsedRecord,
    source_path: &str,
    owner: Option<&str>,
) -> Result<ContentRecord, Vec<Violation>> {
    match parsed {
        ParsedRecord::Post(frontmatter) => {
            validate_post(frontmatter, source_path, owner).map(ContentRecord::Post)
        }
        ParsedRecord::Project(fields) => {
            validate_project(fields, source_path, owner).map(ContentRecord::Project)
        }
    }
}

pub fn validate_post(
    frontmatter: Frontmatter,
    source_path: &str,
    owner: Option<&str>,
) -> Result<Post, Vec<Violation>> {
    let mut violations = Vec::new();

    let title = required_text(&frontmatter, PostField::Title, &mut violations);

    let slug = required_text(&frontmatter, PostField::Slug, &mut violations);
    if let Some(slug) = &slug {
        if !is_valid_slug(slug) {
            violations.push(Violation::invalid(
                PostField::Slug.as_str(),
                "must be lowercase letters, digits and single hyphens",
            ));
        }
        check_owner(PostField::Slug.as_str(), slug, source_path, owner, &mut violations);
    }

    let date = match frontmatter.get(PostField::Date) {
        None => {
            violations.push(Violation::missing(PostField::Date.as_str()));
            None
        }
        Some(FieldValue::Date(date)) => Some(*date),
        Some(FieldValue::Text(text)) => {
            violations.push(Violation::invalid(
                PostField::Date.as_str(),
                format!("`{text}` is not a YYYY-MM-DD date"),
            ));
            None
        }
        Some(FieldValue::List(_)) => {
            violations.push(Violation::invalid(PostField::Date.as_str(), "must be a date"));
            None
        }
    };

    let tags = match frontmatter.get(PostField::Tags) {
        None => Vec::new(),
        Some(FieldValue::List(items)) => {
            for tag in items {
                if tag.is_empty() {
                    violations.push(Violation::invalid(
                        PostField::Tags.as_str(),
                        "contains an empty tag",
                    ));
                } else if tag.chars().any(char::is_whitespace) {
                    violations.push(Violation::invalid(
                        PostField::Tags.as_str(),
                        format!("tag `{tag}` must be a single word"),
                    ));
                }
            }
            items.clone()
        }
        Some(_) => {
            violations.push(Violation::invalid(
                PostField::Tags.as_str(),
                "must be a list like `[a, b]`",
            ));
            Vec::new()
        }
    };

    match (title, slug, date) {
        (Some(title), Some(slug), Some(date)) if violations.is_empty() => Ok(Post {
            title,
            slug,
            date,
            tags,
            body: frontmatter.body,
        }),
        _ => Err(violations),
    }
}

pub fn validate_project(
    mut fields: ProjectFields,
    source_path: &str,
    owner: Option<&str>,
) -> Result<Project, Vec<Violation>> {
    let mut violations = Vec::new();

    let name = fields.remove(&ProjectField::Name).map(|n| n.trim().to_string());
    match &name {
        None => violations.push(Violation::missing(ProjectField::Name.as_str())),
        Some(name) if name.is_empty() => {
            violations.push(Violation::empty(ProjectField::Name.as_str()))
        }
        Some(name) => check_owner(
            ProjectField::Name.as_str(),
            name,
            source_path,
            owner,
            &mut violations,
        ),
    }

    let url = fields
        .remove(&ProjectField::Url)
        .map(|url| url.trim().to_string());
    match &url {
        None => violations.push(Violation::missing(ProjectField::Url.as_str())),
        Some(url) if url.is_empty() => {
            violations.push(Violation::empty(ProjectField::Url.as_str()))
        }
        Some(url) => {
            if let Err(reason) = check_absolute_url(url) {
                violations.push(Violation::invalid(ProjectField::Url.as_str(), reason));
            }
        }
    }

    let description = fields.remove(&ProjectField::Description);
    if description.is_none() {
        violations.push(Violation::missing(ProjectField::Description.as_str()));
    }
    let image = fields.remove(&ProjectField::Image);
    if image.is_none() {
        violations.push(Violation::missing(ProjectField::Image.as_str()));
    }

    match (name, description, url, image) {
        (Some(name), Some(description), Some(url), Some(image)) if violations.is_empty() => {
            Ok(Project {
                name,
                description,
                url,
                image,
            })
        }
        _ => Err(violations),
    }
}

/// `^[a-z0-9]+(-[a-z0-9]+)*$`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

fn check_absolute_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| format!("`{raw}` is not an absolute URL: {e}"))?;
    if !parsed.has_host() {
        return Err(format!("`{raw}` has no host"));
    }
    Ok(())
}

fn check_owner(
    field: &str,
    key: &str,
    source_path: &str,
    owner: Option<&str>,
    violations: &mut Vec<Violation>,
) {
    if let Some(owner) = owner {
        if owner != source_path {
            violations.push(Violation::SlugConflict {
                field: field.to_string(),
                key: key.to_string(),
                owner: owner.to_string(),
            });
        }
    }
}

fn required_text(
    frontmatter: &Frontmatter,
    field: PostField,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match frontmatter.get(field) {
        None => {
            violations.push(Violation::missing(field.as_str()));
            None
        }
        Some(FieldValue::Text(text)) if text.trim().is_empty() => {
            violations.push(Violation::empty(field.as_str()));
            None
        }
        Some(FieldValue::Text(text)) => Some(text.trim().to_string()),
        Some(_) => {
            violations.push(Violation::invalid(field.as_str(), "must be text"));
            None
        }
    }
}
