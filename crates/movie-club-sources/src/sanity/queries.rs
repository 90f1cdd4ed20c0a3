//! GROQ queries used against the content store.

/// Person fields as seen on ratings and comments. Falls back to the raw
/// reference when the person document is gone.
const PERSON: &str = r#"coalesce(person->{_id, name, image{..., "url": asset->url}}, person)"#;

pub fn movie_projection() -> String {
    format!(
        r#"{{
  ...,
  "poster": poster{{..., "url": asset->url}},
  "poster_backdrop": poster_backdrop{{..., "url": asset->url}},
  "ratings": ratings[]{{..., "person": {person}}},
  "comments": comments[]{{..., "person": {person}}}
}}"#,
        person = PERSON
    )
}

pub fn movies(with_genre: bool) -> String {
    let filter = if with_genre {
        r#"_type == "movie" && $genre in genres"#
    } else {
        r#"_type == "movie""#
    };
    format!(
        "*[{}] | order(releaseDate desc) {}",
        filter,
        movie_projection()
    )
}

pub fn movie_by_id() -> String {
    format!(r#"*[_type == "movie" && _id == $id][0] {}"#, movie_projection())
}

pub fn movie_by_slug() -> String {
    format!(r#"*[_type == "movie" && slug.current == $slug][0] {}"#, movie_projection())
}

pub const PERSON_BY_ID: &str = r#"*[_type == "person" && _id == $id][0]{_id, name, image{..., "url": asset->url}}"#;

pub const PERSON_BY_NAME: &str = r#"*[_type == "person" && name == $name][0]{_id, name, image{..., "url": asset->url}}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movies_query_filters_by_genre_only_when_asked() {
        assert!(movies(true).contains("$genre in genres"));
        assert!(!movies(false).contains("$genre"));
        assert!(movies(false).contains("order(releaseDate desc)"));
    }

    #[test]
    fn test_projection_expands_people() {
        let projection = movie_projection();
        assert!(projection.contains(r#""ratings": ratings[]{..., "person": coalesce(person->"#));
        assert!(projection.contains(r#""comments": comments[]{..., "person": coalesce(person->"#));
    }
}
