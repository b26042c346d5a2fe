//! Domain layer - content records and the pure parsing/validation rules.

pub mod change_set;
pub mod error;
pub mod frontmatter;
pub mod outcome;
pub mod project_record;
pub mod record;
pub mod validation;

pub use error::ParseError;
pub use record::{ContentRecord, Post, Project, RecordKind, StoredRecord};
