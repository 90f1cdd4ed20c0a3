use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use crate::comment::Comment;
use crate::image::{ImageRef, Slug};
use crate::rating::Rating;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<Slug>,
    pub title: String,
    #[serde(rename = "releaseDate", default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>, // Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>, // Synopsis field on documents entered by hand in the studio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_backdrop: Option<ImageRef>,
    #[serde(rename = "externalId", default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<u64>, // TMDB id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ratings: Vec<Rating>,
    #[serde(rename = "_createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Projections return `null` for arrays that were never set
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Movie {
    pub fn slug_str(&self) -> Option<&str> {
        self.slug.as_ref().map(|s| s.current.as_str())
    }

    /// True when `id_or_slug` names this movie by id or by slug
    pub fn matches(&self, id_or_slug: &str) -> bool {
        self.id == id_or_slug || self.slug_str() == Some(id_or_slug)
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    pub fn rating_by(&self, person_id: &str) -> Option<&Rating> {
        self.ratings.iter().find(|r| r.person_id() == person_id)
    }

    pub fn comment(&self, key: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.key == key)
    }

    /// Overview, falling back to the hand-entered plot
    pub fn synopsis(&self) -> Option<&str> {
        self.overview.as_deref().or(self.plot.as_deref())
    }

    /// Case-insensitive title comparison used for duplicate detection
    pub fn has_title(&self, title: &str) -> bool {
        self.title.trim().to_lowercase() == title.trim().to_lowercase()
    }
}

/// Movie document as written on create; the store fills in `_id`, `_rev` and timestamps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub slug: Slug,
    #[serde(rename = "releaseDate", skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    pub poster: ImageRef,
    pub poster_backdrop: ImageRef,
    #[serde(rename = "externalId")]
    pub external_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    pub comments: Vec<Comment>,
    pub ratings: Vec<Rating>,
}
