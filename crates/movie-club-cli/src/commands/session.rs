use super::{load_credentials, mutation_failed, Club};
use crate::output::Output;
use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use movie_club_config::{IdentityConfig, PathManager};
use movie_club_models::Session;
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;

/// Command-line values override the configured identity
fn session_from(name: Option<String>, image_url: Option<String>, identity: Option<&IdentityConfig>) -> Option<Session> {
    let name = name.or_else(|| identity.map(|i| i.name.clone()))?;
    let image_url = image_url.or_else(|| identity.and_then(|i| i.image_url.clone()));
    Some(Session { name, image_url })
}

pub async fn sign_in(name: Option<String>, image_url: Option<String>, output: &Arc<Output>) -> Result<()> {
    let mut club = Club::open(output)?;
    let session = session_from(name, image_url, club.config.identity.as_ref())
        .ok_or_else(|| eyre!("No name given. Pass --name or set [identity] name in the config file."))?;

    let person = club.service.sign_in(&session).await.map_err(mutation_failed)?;

    club.credentials.set_person_id(person.id.clone());
    club.credentials.set_signed_in_at(Utc::now());
    club.credentials
        .save()
        .map_err(|e| eyre!("Failed to save session: {}", e))?;

    if output.is_human() {
        output.success(format!("Signed in as {} ({})", person.name.bold(), person.id));
    } else {
        output.json(&json!({ "person": person }));
    }
    Ok(())
}

pub async fn sign_out(output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let mut credentials = load_credentials(&paths)?;
    if credentials.get_person_id().is_none() {
        output.info("Not signed in");
        return Ok(());
    }
    credentials.clear_session();
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;
    output.success("Signed out");
    Ok(())
}

pub async fn whoami(output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let person_id = club.person_id()?;
    let person = club
        .service
        .get_person(&person_id)
        .await
        .map_err(|e| eyre!("Signed-in person {} could not be loaded: {}", person_id, e))?;
    let since = club.credentials.get_signed_in_at();

    if !output.is_human() {
        output.json(&json!({ "person": person, "signedInAt": since }));
        return Ok(());
    }
    output.info(format!("{} ({})", person.name.bold(), person.id));
    if let Some(since) = since {
        output.println(format!("signed in {}", since.format("%Y-%m-%d %H:%M UTC")).bright_black().to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_arguments_and_identity() {
        let identity = IdentityConfig {
            name: "Ada".to_string(),
            image_url: Some("https://example.com/ada.png".to_string()),
        };

        let session = session_from(None, None, Some(&identity)).unwrap();
        assert_eq!(session.name, "Ada");
        assert_eq!(session.image_url.as_deref(), Some("https://example.com/ada.png"));

        let session = session_from(Some("Bo".to_string()), None, Some(&identity)).unwrap();
        assert_eq!(session.name, "Bo");
        assert_eq!(session.image_url.as_deref(), Some("https://example.com/ada.png"));

        assert!(session_from(None, Some("https://example.com/x.png".to_string()), None).is_none());
    }
}
