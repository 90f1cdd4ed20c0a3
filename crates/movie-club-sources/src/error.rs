use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{service} request failed: {status} - {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("document {id} no longer has revision {revision}")]
    RevisionMismatch { id: String, revision: String },

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn new(message: String) -> Self {
        SourceError::Other(message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::DocumentNotFound(_))
            || matches!(self, SourceError::Http { status: 404, .. })
    }

    /// Worth retrying for reads: network failures, rate limits and server errors
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Transport(_) => true,
            SourceError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let server = SourceError::Http { service: "sanity", status: 503, body: String::new() };
        assert!(server.is_transient());
        assert!(!server.is_not_found());

        let missing = SourceError::Http { service: "tmdb", status: 404, body: String::new() };
        assert!(missing.is_not_found());
        assert!(!missing.is_transient());

        let conflict = SourceError::RevisionMismatch { id: "m1".to_string(), revision: "r1".to_string() };
        assert!(!conflict.is_transient());
        assert!(SourceError::DocumentNotFound("m1".to_string()).is_not_found());
    }
}
