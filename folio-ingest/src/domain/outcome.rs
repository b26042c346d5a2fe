//! Per-file ingestion outcomes and the per-notification aggregate.

use serde::Serialize;
use std::fmt;

use super::error::ParseError;
use super::record::RecordKind;
use super::validation::Violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeKind {
    Post,
    Project,
    Unrecognized,
}

impl From<RecordKind> for OutcomeKind {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Post => OutcomeKind::Post,
            RecordKind::Project => OutcomeKind::Project,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeStatus {
    Accepted,
    Rejected,
}

/// Why a single file was not published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code")]
pub enum RejectReason {
    MalformedStructure { detail: String },
    UnexpectedField { fields: Vec<String> },
    InvalidFields { violations: Vec<Violation> },
    SlugConflict { key: String, owner: String },
    DeletionsNotSupported,
    UnrecognizedPath,
    StoreFailure { detail: String },
}

impl RejectReason {
    /// Turn validator output into a reason. A conflict that is the only
    /// problem with a file is reported as `SlugConflict` on its own.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if let [Violation::SlugConflict { key, owner, .. }] = violations.as_slice() {
            return RejectReason::SlugConflict {
                key: key.clone(),
                owner: owner.clone(),
            };
        }
        RejectReason::InvalidFields { violations }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MalformedStructure { .. } => "MalformedStructure",
            RejectReason::UnexpectedField { .. } => "UnexpectedField",
            RejectReason::InvalidFields { .. } => "InvalidFields",
            RejectReason::SlugConflict { .. } => "SlugConflict",
            RejectReason::DeletionsNotSupported => "DeletionsNotSupported",
            RejectReason::UnrecognizedPath => "UnrecognizedPath",
            RejectReason::StoreFailure { .. } => "StoreFailure",
        }
    }
}

impl From<ParseError> for RejectReason {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::MalformedStructure(detail) => RejectReason::MalformedStructure { detail },
            ParseError::UnexpectedField(fields) => RejectReason::UnexpectedField { fields },
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MalformedStructure { detail } => {
                write!(f, "malformed structure: {detail}")
            }
            RejectReason::UnexpectedField { fields } => {
                write!(f, "unexpected field(s): {}", fields.join(", "))
            }
            RejectReason::InvalidFields { violations } => {
                let joined: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                write!(f, "invalid fields: {}", joined.join("; "))
            }
            RejectReason::SlugConflict { key, owner } => {
                write!(f, "key `{key}` is already owned by {owner}")
            }
            RejectReason::DeletionsNotSupported => f.write_str("deletions are not supported"),
            RejectReason::UnrecognizedPath => f.write_str("path is not a post or project file"),
            RejectReason::StoreFailure { detail } => write!(f, "store failure: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionOutcome {
    pub path: String,
    pub record_kind: OutcomeKind,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl IngestionOutcome {
    pub fn accepted(path: impl Into<String>, kind: RecordKind, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            record_kind: kind.into(),
            status: OutcomeStatus::Accepted,
            key: Some(key.into()),
            reason: None,
        }
    }

    pub fn rejected(
        path: impl Into<String>,
        record_kind: OutcomeKind,
        key: Option<String>,
        reason: RejectReason,
    ) -> Self {
        Self {
            path: path.into(),
            record_kind,
            status: OutcomeStatus::Rejected,
            key,
            reason: Some(reason),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OutcomeStatus::Accepted
    }
}

/// Aggregate result of one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiveSummary {
    pub repository: String,
    pub commit: String,
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Files outside the posts/projects areas, or deletions. Counted in
    /// `rejected` as well.
    pub unrecognized: usize,
    pub outcomes: Vec<IngestionOutcome>,
}

impl ReceiveSummary {
    pub fn new(
        repository: impl Into<String>,
        commit: impl Into<String>,
        outcomes: Vec<IngestionOutcome>,
    ) -> Self {
        let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
        let unrecognized = outcomes
            .iter()
            .filter(|o| o.record_kind == OutcomeKind::Unrecognized)
            .count();
        Self {
            repository: repository.into(),
            commit: commit.into(),
            total: outcomes.len(),
            accepted,
            rejected: outcomes.len() - accepted,
            unrecognized,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lone_conflict_becomes_slug_conflict() {
        let reason = RejectReason::from_violations(vec![Violation::SlugConflict {
            field: "slug".to_string(),
            key: "same".to_string(),
            owner: "Posts/a.md".to_string(),
        }]);
        assert_eq!(reason.code(), "SlugConflict");

        let reason = RejectReason::from_violations(vec![
            Violation::SlugConflict {
                field: "slug".to_string(),
                key: "same".to_string(),
                owner: "Posts/a.md".to_string(),
            },
            Violation::Missing {
                field: "date".to_string(),
            },
        ]);
        assert_eq!(reason.code(), "InvalidFields");
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            IngestionOutcome::accepted("Posts/a.md", RecordKind::Post, "a"),
            IngestionOutcome::rejected(
                "Posts/b.md",
                OutcomeKind::Post,
                None,
                RejectReason::MalformedStructure {
                    detail: "x".to_string(),
                },
            ),
            IngestionOutcome::rejected(
                "README.md",
                OutcomeKind::Unrecognized,
                None,
                RejectReason::UnrecognizedPath,
            ),
        ];
        let summary = ReceiveSummary::new("me/site", "abc", outcomes);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.unrecognized, 1);
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = IngestionOutcome::rejected(
            "Posts/gone.md",
            OutcomeKind::Unrecognized,
            None,
            RejectReason::DeletionsNotSupported,
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "Rejected");
        assert_eq!(json["record_kind"], "Unrecognized");
        assert_eq!(json["reason"]["code"], "DeletionsNotSupported");
        assert!(json.get("key").is_none());
    }
}
