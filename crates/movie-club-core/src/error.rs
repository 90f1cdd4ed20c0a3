use movie_club_sources::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MovieError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("\"{0}\" already exists")]
    DuplicateEntity(String),

    #[error("upstream failure: {0}")]
    Upstream(#[from] SourceError),

    #[error("invalid input: {0}")]
    Validation(String),
}

impl MovieError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        MovieError::NotFound { kind, id: id.into() }
    }

    /// Map a store-level "document not found" onto the entity that was asked for
    pub fn from_source(kind: &'static str, id: &str, error: SourceError) -> Self {
        if error.is_not_found() {
            Self::not_found(kind, id)
        } else {
            MovieError::Upstream(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source_maps_not_found() {
        let err = MovieError::from_source("movie", "m1", SourceError::DocumentNotFound("m1".to_string()));
        assert!(matches!(err, MovieError::NotFound { kind: "movie", .. }));

        let err = MovieError::from_source(
            "movie",
            "m1",
            SourceError::Http { service: "sanity", status: 500, body: String::new() },
        );
        assert!(matches!(err, MovieError::Upstream(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(MovieError::DuplicateEntity("Heat".to_string()).to_string(), "\"Heat\" already exists");
        assert_eq!(MovieError::not_found("rating", "p1").to_string(), "rating not found: p1");
    }
}
