use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of content the pipeline publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Post,
    Project,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Post => "post",
            RecordKind::Project => "project",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blog post, keyed by its slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub slug: String,
    pub date: NaiveDate,
    pub tags: Vec<String>,
    pub body: String,
}

/// A portfolio project, keyed by its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub url: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentRecord {
    Post(Post),
    Project(Project),
}

impl ContentRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ContentRecord::Post(_) => RecordKind::Post,
            ContentRecord::Project(_) => RecordKind::Project,
        }
    }

    /// Primary key: slug for posts, name for projects.
    pub fn key(&self) -> &str {
        match self {
            ContentRecord::Post(post) => &post.slug,
            ContentRecord::Project(project) => &project.name,
        }
    }

    pub fn into_post(self) -> Option<Post> {
        match self {
            ContentRecord::Post(post) => Some(post),
            ContentRecord::Project(_) => None,
        }
    }

    pub fn into_project(self) -> Option<Project> {
        match self {
            ContentRecord::Project(project) => Some(project),
            ContentRecord::Post(_) => None,
        }
    }
}

/// A record as held by the content store, together with the repository path
/// of the file that owns its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: ContentRecord,
    pub source_path: String,
}
