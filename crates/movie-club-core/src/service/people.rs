use movie_club_models::{ImageRef, NewPerson, Person, Session};
use tracing::{info, instrument, warn};
use super::MovieService;
use crate::cache::{CacheKey, CachedValue};
use crate::error::MovieError;
use crate::mutation::MutationKind;
use crate::retry::retry_read;

impl MovieService {
    /// Map an identity-provider session to a person record, creating it on first sign-in
    #[instrument(skip(self, session), fields(name = %session.name))]
    pub async fn sign_in(&self, session: &Session) -> Result<Person, MovieError> {
        let guard = self.mutations.start(MutationKind::SignIn);
        let name = session.name.trim();
        let result = if name.is_empty() {
            Err(MovieError::Validation("session has no display name".to_string()))
        } else {
            self.load(CacheKey::current_person(name), |_| self.find_or_create_person(name, session))
                .await
        };
        let person = self.finish(guard, "Sign-in failed", result)?;

        if let Ok(mut signed_in) = self.signed_in.lock() {
            *signed_in = Some(name.to_string());
        }
        self.cache.set(CacheKey::person(&person.id), CachedValue::Person(person.clone()));
        Ok(person)
    }

    async fn find_or_create_person(&self, name: &str, session: &Session) -> Result<Person, MovieError> {
        let existing = retry_read(&self.retry, "find person", || self.store.find_person_by_name(name)).await?;
        if let Some(person) = existing {
            info!("Signed in as {} ({})", person.name, person.id);
            return Ok(person);
        }

        // A missing avatar should not keep anyone out
        let image = match session.image_url.as_deref() {
            Some(url) => match self.upload_from_url(url).await {
                Ok(asset) => Some(ImageRef::from_asset_id(asset)),
                Err(e) => {
                    warn!("Could not upload avatar for {}: {}", name, e);
                    None
                }
            },
            None => None,
        };

        let person = self
            .store
            .create_person(&NewPerson { name: name.to_string(), image })
            .await?;
        self.cache.record_write();
        info!("Created person {} ({})", person.name, person.id);
        Ok(person)
    }
}
