use serde::{Deserialize, Serialize};

/// One hit from the metadata search endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalMovie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>, // "YYYY-MM-DD", sometimes empty
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalGenre {
    pub id: u64,
    pub name: String,
}

/// Extended fields only available from the detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalMovieDetails {
    pub id: u64,
    #[serde(default)]
    pub genres: Vec<ExternalGenre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub overview: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
    #[serde(default)]
    pub results: Vec<ExternalMovie>,
}
