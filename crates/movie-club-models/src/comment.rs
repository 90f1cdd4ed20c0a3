use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::person::PersonRef;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "CommentDocument")]
pub struct Comment {
    #[serde(rename = "_key")]
    pub key: String, // Unique within the parent movie
    pub person: PersonRef,
    pub comment: String,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Comment as stored. Older comments only carry the system `_createdAt`;
/// some carry both, and then `createdAt` wins.
#[derive(Deserialize)]
struct CommentDocument {
    #[serde(rename = "_key")]
    key: String,
    person: PersonRef,
    comment: String,
    #[serde(rename = "createdAt", default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "_createdAt", default)]
    system_created_at: Option<DateTime<Utc>>,
}

impl From<CommentDocument> for Comment {
    fn from(document: CommentDocument) -> Self {
        Comment {
            key: document.key,
            person: document.person,
            comment: document.comment,
            created_at: document.created_at.or(document.system_created_at),
        }
    }
}

impl Comment {
    pub fn person_id(&self) -> &str {
        self.person.id()
    }

    pub fn is_authored_by(&self, person_id: &str) -> bool {
        self.person.id() == person_id
    }

    /// Display name if the person reference has been expanded
    pub fn author_name(&self) -> Option<&str> {
        self.person.person().map(|p| p.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_accepts_either_timestamp_field() {
        let a: Comment = serde_json::from_str(
            r#"{"_key":"k1","person":{"_ref":"p1"},"comment":"hi","createdAt":"2024-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        let b: Comment = serde_json::from_str(
            r#"{"_key":"k2","person":{"_ref":"p1"},"comment":"hi","_createdAt":"2024-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        assert_eq!(a.created_at, b.created_at);
        assert!(a.is_authored_by("p1"));
        assert!(!a.is_authored_by("p2"));
        assert_eq!(a.author_name(), None);
    }

    #[test]
    fn test_comment_with_both_timestamps_prefers_created_at() {
        let comment: Comment = serde_json::from_str(
            r#"{"_key":"k1","person":{"_ref":"p1"},"comment":"hi",
                "createdAt":"2024-01-02T03:04:05Z","_createdAt":"2023-06-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(comment.created_at.map(|t| t.to_rfc3339()), Some("2024-01-02T03:04:05+00:00".to_string()));

        let missing: Comment =
            serde_json::from_str(r#"{"_key":"k2","person":{"_ref":"p1"},"comment":"hi","createdAt":null}"#).unwrap();
        assert_eq!(missing.created_at, None);
    }
}
