//! Pure ordering and filtering over an in-memory movie collection.

use movie_club_models::Movie;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Most recently added first (`_createdAt` descending)
    #[default]
    Newest,
    HighestRated,
    LowestRated,
    MostCommented,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::Newest,
        SortMode::HighestRated,
        SortMode::LowestRated,
        SortMode::MostCommented,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Newest => "newest",
            SortMode::HighestRated => "highest",
            SortMode::LowestRated => "lowest",
            SortMode::MostCommented => "comments",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" | "new" => Ok(SortMode::Newest),
            "highest" | "highest-rated" | "top" => Ok(SortMode::HighestRated),
            "lowest" | "lowest-rated" => Ok(SortMode::LowestRated),
            "comments" | "most-commented" => Ok(SortMode::MostCommented),
            other => Err(format!(
                "unknown sort mode '{}' (expected newest, highest, lowest or comments)",
                other
            )),
        }
    }
}

/// Mean rating, or None when nobody has rated the movie yet
pub fn average_rating(movie: &Movie) -> Option<f64> {
    if movie.ratings.is_empty() {
        return None;
    }
    let total: f64 = movie.ratings.iter().map(|r| r.rating).sum();
    Some(total / movie.ratings.len() as f64)
}

/// A rating as shown to people: whole numbers without a decimal point
pub fn format_rating(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Sort key for the rating modes: unrated counts as 0
fn rating_key(movie: &Movie) -> f64 {
    average_rating(movie).unwrap_or(0.0)
}

/// Order a collection by `mode`. Stable: equal keys keep their input order.
pub fn sort_movies(movies: &[Movie], mode: SortMode) -> Vec<Movie> {
    let mut sorted = movies.to_vec();
    match mode {
        SortMode::Newest => sorted.sort_by(|a, b| newest_first(a, b)),
        SortMode::HighestRated => sorted.sort_by(|a, b| rating_key(b).total_cmp(&rating_key(a))),
        SortMode::LowestRated => sorted.sort_by(|a, b| rating_key(a).total_cmp(&rating_key(b))),
        SortMode::MostCommented => sorted.sort_by(|a, b| b.comments.len().cmp(&a.comments.len())),
    }
    sorted
}

// Missing timestamps sort last
fn newest_first(a: &Movie, b: &Movie) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Release date descending, undated last. This is the order list reads come back in.
pub fn sort_by_release_date(movies: &mut [Movie]) {
    movies.sort_by(|a, b| match (a.release_date, b.release_date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn filter_by_genre(movies: &[Movie], genre: &str) -> Vec<Movie> {
    movies.iter().filter(|m| m.has_genre(genre)).cloned().collect()
}
