use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variables take precedence over the credentials file
pub const CONTENT_STORE_TOKEN_ENV: &str = "MOVIECLUB_CONTENT_TOKEN";
pub const TMDB_API_KEY_ENV: &str = "MOVIECLUB_TMDB_API_KEY";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    /// Write token for the content store mutate/upload endpoints
    pub fn content_store_token(&self) -> Option<String> {
        std::env::var(CONTENT_STORE_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.get("content_store_token").cloned())
    }

    pub fn set_content_store_token(&mut self, token: String) {
        self.set("content_store_token".to_string(), token);
    }

    pub fn tmdb_api_key(&self) -> Option<String> {
        std::env::var(TMDB_API_KEY_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.get("tmdb_api_key").cloned())
    }

    pub fn set_tmdb_api_key(&mut self, key: String) {
        self.set("tmdb_api_key".to_string(), key);
    }

    // Person id resolved at last sign-in, so commands can skip the lookup
    pub fn get_person_id(&self) -> Option<&String> {
        self.get("person_id")
    }

    pub fn set_person_id(&mut self, person_id: String) {
        self.set("person_id".to_string(), person_id);
    }

    pub fn get_signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.get("signed_in_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_signed_in_at(&mut self, at: DateTime<Utc>) {
        self.set("signed_in_at".to_string(), at.to_rfc3339());
    }

    pub fn clear_session(&mut self) {
        self.remove("person_id");
        self.remove("signed_in_at");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_content_store_token("sk_test".to_string());
        store.set_tmdb_api_key("tmdb_test".to_string());
        store.set_person_id("person-1".to_string());
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        assert_eq!(loaded_store.get("content_store_token"), Some(&"sk_test".to_string()));
        assert_eq!(loaded_store.get("tmdb_api_key"), Some(&"tmdb_test".to_string()));
        assert_eq!(loaded_store.get_person_id(), Some(&"person-1".to_string()));
    }

    #[test]
    fn test_credential_store_signed_in_at() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        let at = Utc::now();
        store.set_signed_in_at(at);
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        let loaded_at = loaded_store.get_signed_in_at().unwrap();
        // Allow 1 second difference for serialization
        assert!((loaded_at - at).num_seconds().abs() < 2);
    }

    #[test]
    fn test_credential_store_clear_session() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        store.set_person_id("person-1".to_string());
        store.set_signed_in_at(Utc::now());
        store.set("other".to_string(), "value".to_string());

        store.clear_session();
        assert_eq!(store.get_person_id(), None);
        assert_eq!(store.get_signed_in_at(), None);
        assert_eq!(store.get("other"), Some(&"value".to_string()));
    }
}
