use movie_club_models::{ExternalMovieDetails, SearchPage};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::error::SourceError;

const SERVICE: &str = "tmdb";

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, SourceError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Http { service: SERVICE, status, body });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

pub fn search_url(base_url: &str, api_key: &str, language: &str, title: &str, page: u32) -> String {
    format!(
        "{}/search/movie?api_key={}&language={}&query={}&page={}&include_adult=false",
        base_url,
        urlencoding::encode(api_key),
        urlencoding::encode(language),
        urlencoding::encode(title),
        page.max(1)
    )
}

pub fn details_url(base_url: &str, api_key: &str, language: &str, id: u64) -> String {
    format!(
        "{}/movie/{}?api_key={}&language={}",
        base_url,
        id,
        urlencoding::encode(api_key),
        urlencoding::encode(language)
    )
}

/// Search movies by title
pub async fn search_movies(
    client: &Client,
    base_url: &str,
    api_key: &str,
    language: &str,
    title: &str,
    page: u32,
) -> Result<SearchPage, SourceError> {
    let page: SearchPage = get_json(client, &search_url(base_url, api_key, language, title, page)).await?;
    debug!(
        "TMDB search page {}/{} returned {} results",
        page.page,
        page.total_pages,
        page.results.len()
    );
    Ok(page)
}

/// Fetch genres, runtime and overview for one movie
pub async fn movie_details(
    client: &Client,
    base_url: &str,
    api_key: &str,
    language: &str,
    id: u64,
) -> Result<ExternalMovieDetails, SourceError> {
    get_json(client, &details_url(base_url, api_key, language, id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let url = search_url("https://api.themoviedb.org/3", "key", "en-US", "the matrix", 0);
        assert_eq!(
            url,
            "https://api.themoviedb.org/3/search/movie?api_key=key&language=en-US&query=the%20matrix&page=1&include_adult=false"
        );
    }

    #[test]
    fn test_details_url() {
        let url = details_url("https://api.themoviedb.org/3", "key", "en-US", 603);
        assert_eq!(url, "https://api.themoviedb.org/3/movie/603?api_key=key&language=en-US");
    }

    #[test]
    fn test_search_page_decodes() {
        let body = r#"{
            "page": 1,
            "total_pages": 2,
            "total_results": 21,
            "results": [{"id": 603, "title": "The Matrix", "release_date": "1999-03-31",
                         "poster_path": "/p.jpg", "backdrop_path": null, "popularity": 80.5}]
        }"#;
        let page: SearchPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.total_results, 21);
        assert_eq!(page.results[0].id, 603);
        assert_eq!(page.results[0].backdrop_path, None);
    }
}
