pub mod catalog;
pub mod comments;
pub mod config;
pub mod movies;
pub mod ratings;
pub mod session;

use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use movie_club_config::{Config, CredentialStore, PathManager};
use movie_club_core::{MovieError, MovieService, ServiceOptions};
use movie_club_models::Movie;
use movie_club_sources::{create_sources, Notifier};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A failure the service already reported through a notification
#[derive(Debug)]
pub struct AlreadyNotified;

impl fmt::Display for AlreadyNotified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation failed")
    }
}

impl std::error::Error for AlreadyNotified {}

/// Handler errors are already logged and shown as a notification by the service
pub fn mutation_failed(_error: MovieError) -> color_eyre::Report {
    AlreadyNotified.into()
}

pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return Err(eyre!(
            "Configuration file not found at {}. Run 'movieclub config init --project-id <id>' first.",
            config_file.display()
        ));
    }
    let config = Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config.validate().map_err(|e| eyre!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// Config if present, for callers (like logging setup) that can run without one
pub fn try_load_config(paths: &PathManager) -> Option<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return None;
    }
    Config::load_from_file(&config_file).ok()
}

pub fn load_credentials(paths: &PathManager) -> Result<CredentialStore> {
    let credentials_file = paths.credentials_file();
    let mut credentials = CredentialStore::new(credentials_file.clone());
    credentials
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    Ok(credentials)
}

/// Everything a data command needs: config, stored credentials and a service
/// wired to the real content store with `output` as its notifier
pub struct Club {
    pub config: Config,
    pub credentials: CredentialStore,
    pub service: MovieService,
}

impl Club {
    pub fn open(output: &Arc<Output>) -> Result<Self> {
        let paths = PathManager::default();
        Self::connect(load_config(&paths)?, load_credentials(&paths)?, output)
    }

    fn connect(config: Config, credentials: CredentialStore, output: &Arc<Output>) -> Result<Self> {
        let sources = create_sources(&config, &credentials).map_err(|e| eyre!("{}", e))?;
        let notifier: Arc<dyn Notifier> = output.clone();
        let service = MovieService::from_sources(sources, notifier, ServiceOptions::from_config(&config));
        debug!("Opened session against project {}", config.content_store.project_id);

        Ok(Self { config, credentials, service })
    }

    /// Person id stored by the last `sign-in`
    pub fn person_id(&self) -> Result<String> {
        self.credentials
            .get_person_id()
            .cloned()
            .ok_or_else(|| eyre!("Not signed in. Run 'movieclub sign-in' first."))
    }

    /// Look a movie up by id or slug so mutations always get the document id
    pub async fn movie(&self, id_or_slug: &str) -> Result<Movie> {
        self.service
            .get_movie(id_or_slug)
            .await
            .map_err(|e| eyre!("{}", e))
    }
}

pub fn format_average(average: Option<f64>) -> String {
    match average {
        Some(value) => format!("{:.1}", value),
        None => "-".to_string(),
    }
}

pub fn year(movie: &Movie) -> String {
    movie
        .release_date
        .map(|d| d.format("%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_format_average() {
        assert_eq!(format_average(None), "-");
        assert_eq!(format_average(Some(6.25)), "6.2");
    }

    #[test]
    fn test_year() {
        let mut movie: Movie = serde_json::from_value(json!({ "_id": "m1", "title": "Heat" })).unwrap();
        assert_eq!(year(&movie), "-");
        movie.release_date = NaiveDate::from_ymd_opt(1995, 12, 15);
        assert_eq!(year(&movie), "1995");
    }

    #[test]
    fn test_connect_reports_through_output() {
        let output = Arc::new(Output::new(OutputFormat::Json, true));
        let mut credentials = CredentialStore::new(std::path::PathBuf::from("/nonexistent/credentials.toml"));
        credentials.set_tmdb_api_key("key".to_string());

        let club = Club::connect(Config::new("abc123"), credentials, &output).unwrap();
        assert_eq!(Arc::strong_count(&output), 2);
        assert!(club.service.current_person().is_none());
    }

    #[test]
    fn test_already_notified_downcasts() {
        let report = mutation_failed(MovieError::Validation("bad".to_string()));
        assert!(report.downcast_ref::<AlreadyNotified>().is_some());
    }
}
