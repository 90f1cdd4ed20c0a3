//! In-process content store with the same document and patch semantics as
//! the hosted one. Useful for tests and for running without network access.

use async_trait::async_trait;
use chrono::Utc;
use movie_club_models::{Movie, NewMovie, NewPerson, Person};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use crate::error::SourceError;
use crate::patch::Patch;
use crate::traits::{ContentStore, ImageUpload, MovieFilter, ReadConsistency};

/// Counters for what the store has been asked to do
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub movie_reads: usize,
    pub person_reads: usize,
    pub fresh_reads: usize,
    pub creates: usize,
    pub patches: usize,
    pub uploads: usize,
}

#[derive(Debug, Default)]
struct FailurePlan {
    read_failures: u32,
    fail_uploads_after: Option<usize>,
    fail_writes: bool,
}

struct MemoryState {
    documents: BTreeMap<String, Value>,
    assets: HashMap<String, ImageUpload>,
    next_id: u64,
    next_revision: u64,
    expand_references: bool,
    stats: StoreStats,
    failures: FailurePlan,
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn injected_failure() -> SourceError {
    SourceError::Http {
        service: "memory",
        status: 503,
        body: "injected failure".to_string(),
    }
}

/// Replace expanded people on ratings/comments with plain references
fn collapse_people(document: &mut Value) {
    for array in ["ratings", "comments"] {
        if let Some(Value::Array(elements)) = document.get_mut(array) {
            for element in elements.iter_mut() {
                let id = element
                    .get("person")
                    .and_then(|p| p.get("_ref").or_else(|| p.get("_id")))
                    .and_then(Value::as_str)
                    .map(|s| s.to_string());
                if let Some(id) = id {
                    element["person"] = json!({ "_type": "reference", "_ref": id });
                }
            }
        }
    }
}

impl MemoryState {
    fn revision(&mut self) -> String {
        self.next_revision += 1;
        format!("rev-{}", self.next_revision)
    }

    fn generate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn check_read(&mut self, consistency: ReadConsistency) -> Result<(), SourceError> {
        if self.failures.read_failures > 0 {
            self.failures.read_failures -= 1;
            return Err(injected_failure());
        }
        if consistency == ReadConsistency::Fresh {
            self.stats.fresh_reads += 1;
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), SourceError> {
        if self.failures.fail_writes {
            return Err(injected_failure());
        }
        Ok(())
    }

    fn person_projection(&self, id: &str) -> Option<Value> {
        self.documents
            .get(id)
            .filter(|d| d["_type"] == "person")
            .map(|d| json!({ "_id": d["_id"], "name": d["name"], "image": d["image"] }))
    }

    /// Shape a stored movie the way the projected read query returns it
    fn project_movie(&self, document: &Value) -> Result<Movie, SourceError> {
        let mut document = document.clone();
        if self.expand_references {
            for array in ["ratings", "comments"] {
                if let Some(Value::Array(elements)) = document.get_mut(array) {
                    for element in elements.iter_mut() {
                        let id = element["person"]["_ref"].as_str().map(|s| s.to_string());
                        if let Some(person) = id.and_then(|id| self.person_projection(&id)) {
                            element["person"] = person;
                        }
                    }
                }
            }
        }
        Ok(serde_json::from_value(document)?)
    }

    fn movies(&self) -> impl Iterator<Item = &Value> {
        self.documents.values().filter(|d| d["_type"] == "movie")
    }

    fn stamp(&mut self, document: &mut Value, id: &str, kind: &str) {
        let now = Utc::now().to_rfc3339();
        document["_id"] = json!(id);
        document["_type"] = json!(kind);
        document["_rev"] = json!(self.revision());
        document["_createdAt"] = json!(now);
        document["_updatedAt"] = json!(now);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                documents: BTreeMap::new(),
                assets: HashMap::new(),
                next_id: 0,
                next_revision: 0,
                expand_references: true,
                stats: StoreStats::default(),
                failures: FailurePlan::default(),
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, SourceError> {
        self.state
            .lock()
            .map_err(|_| SourceError::new("memory store lock poisoned".to_string()))
    }

    /// Seed a movie document as-is (people collapsed to references).
    /// Keeps the given `_createdAt` when present.
    pub fn insert_movie(&self, movie: &Movie) -> Result<(), SourceError> {
        let mut document = serde_json::to_value(movie)?;
        collapse_people(&mut document);
        let mut state = self.state()?;
        let created_at = movie.created_at.map(|t| t.to_rfc3339());
        state.stamp(&mut document, &movie.id, "movie");
        if let Some(created_at) = created_at {
            document["_createdAt"] = json!(created_at);
        }
        state.documents.insert(movie.id.clone(), document);
        Ok(())
    }

    pub fn insert_person(&self, person: &Person) -> Result<(), SourceError> {
        let mut document = serde_json::to_value(person)?;
        let mut state = self.state()?;
        state.stamp(&mut document, &person.id, "person");
        state.documents.insert(person.id.clone(), document);
        Ok(())
    }

    /// Return raw references instead of expanded people on reads
    pub fn set_expand_references(&self, expand: bool) -> Result<(), SourceError> {
        self.state()?.expand_references = expand;
        Ok(())
    }

    /// Fail the next `count` reads with a 503
    pub fn fail_next_reads(&self, count: u32) -> Result<(), SourceError> {
        self.state()?.failures.read_failures = count;
        Ok(())
    }

    /// Let `succeed` more uploads through, then fail every upload after that
    pub fn fail_uploads_after(&self, succeed: usize) -> Result<(), SourceError> {
        let mut state = self.state()?;
        let done = state.stats.uploads;
        state.failures.fail_uploads_after = Some(done + succeed);
        Ok(())
    }

    pub fn fail_writes(&self, fail: bool) -> Result<(), SourceError> {
        self.state()?.failures.fail_writes = fail;
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        self.state().map(|s| s.stats.clone()).unwrap_or_default()
    }

    pub fn asset_count(&self) -> usize {
        self.state().map(|s| s.assets.len()).unwrap_or_default()
    }

    pub fn movie_count(&self) -> usize {
        self.state().map(|s| s.movies().count()).unwrap_or_default()
    }

    /// Stored document without projection, people as references
    pub fn raw_movie(&self, id: &str) -> Option<Movie> {
        let state = self.state().ok()?;
        let document = state.documents.get(id)?.clone();
        serde_json::from_value(document).ok()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn store_name(&self) -> &str {
        "memory"
    }

    async fn fetch_movies(&self, filter: &MovieFilter, consistency: ReadConsistency) -> Result<Vec<Movie>, SourceError> {
        let mut state = self.state()?;
        state.check_read(consistency)?;
        state.stats.movie_reads += 1;

        let mut movies = state
            .movies()
            .map(|d| state.project_movie(d))
            .collect::<Result<Vec<_>, _>>()?;
        movies.retain(|m| filter.matches(m));
        // order(releaseDate desc): undated movies sort last
        movies.sort_by(|a, b| b.release_date.cmp(&a.release_date));
        Ok(movies)
    }

    async fn fetch_movie(&self, id: &str, consistency: ReadConsistency) -> Result<Option<Movie>, SourceError> {
        let mut state = self.state()?;
        state.check_read(consistency)?;
        state.stats.movie_reads += 1;

        let found = match state.movies().find(|d| d["_id"] == id) {
            Some(document) => Some(state.project_movie(document)?),
            None => None,
        };
        Ok(found)
    }

    async fn fetch_movie_by_slug(&self, slug: &str, consistency: ReadConsistency) -> Result<Option<Movie>, SourceError> {
        let mut state = self.state()?;
        state.check_read(consistency)?;
        state.stats.movie_reads += 1;

        let found = match state.movies().find(|d| d["slug"]["current"] == slug) {
            Some(document) => Some(state.project_movie(document)?),
            None => None,
        };
        Ok(found)
    }

    async fn fetch_person(&self, id: &str) -> Result<Option<Person>, SourceError> {
        let mut state = self.state()?;
        state.check_read(ReadConsistency::Cached)?;
        state.stats.person_reads += 1;

        let found = match state.person_projection(id) {
            Some(person) => Some(serde_json::from_value(person)?),
            None => None,
        };
        Ok(found)
    }

    async fn find_person_by_name(&self, name: &str) -> Result<Option<Person>, SourceError> {
        let mut state = self.state()?;
        state.check_read(ReadConsistency::Fresh)?;
        state.stats.person_reads += 1;

        let id = state
            .documents
            .values()
            .find(|d| d["_type"] == "person" && d["name"] == name)
            .and_then(|d| d["_id"].as_str())
            .map(|s| s.to_string());
        match id.and_then(|id| state.person_projection(&id)) {
            Some(person) => Ok(Some(serde_json::from_value(person)?)),
            None => Ok(None),
        }
    }

    async fn create_movie(&self, movie: &NewMovie) -> Result<Movie, SourceError> {
        let mut state = self.state()?;
        state.check_write()?;

        let mut document = serde_json::to_value(movie)?;
        collapse_people(&mut document);
        let id = state.generate_id("movie");
        state.stamp(&mut document, &id, "movie");
        state.documents.insert(id.clone(), document.clone());
        state.stats.creates += 1;
        debug!("memory store: created movie {}", id);

        Ok(serde_json::from_value(document)?)
    }

    async fn create_person(&self, person: &NewPerson) -> Result<Person, SourceError> {
        let mut state = self.state()?;
        state.check_write()?;

        let mut document = serde_json::to_value(person)?;
        let id = state.generate_id("person");
        state.stamp(&mut document, &id, "person");
        state.documents.insert(id.clone(), document.clone());
        state.stats.creates += 1;

        Ok(serde_json::from_value(document)?)
    }

    async fn patch_movie(&self, patch: &Patch) -> Result<Movie, SourceError> {
        let mut state = self.state()?;
        state.check_write()?;

        let current = state
            .documents
            .get(&patch.id)
            .filter(|d| d["_type"] == "movie")
            .cloned()
            .ok_or_else(|| SourceError::DocumentNotFound(patch.id.clone()))?;

        if let Some(expected) = &patch.if_revision {
            if current["_rev"].as_str() != Some(expected.as_str()) {
                return Err(SourceError::RevisionMismatch {
                    id: patch.id.clone(),
                    revision: expected.clone(),
                });
            }
        }

        // Transactions are all-or-nothing: work on a copy
        let mut document = current;
        patch.apply_to(&mut document)?;
        collapse_people(&mut document);
        document["_rev"] = json!(state.revision());
        document["_updatedAt"] = json!(Utc::now().to_rfc3339());

        state.documents.insert(patch.id.clone(), document.clone());
        state.stats.patches += 1;
        Ok(serde_json::from_value(document)?)
    }

    async fn upload_image(&self, image: ImageUpload) -> Result<String, SourceError> {
        let mut state = self.state()?;
        state.check_write()?;
        if let Some(limit) = state.failures.fail_uploads_after {
            if state.stats.uploads >= limit {
                return Err(injected_failure());
            }
        }

        state.stats.uploads += 1;
        let extension = image.content_type.rsplit('/').next().unwrap_or("jpg").to_string();
        let id = format!("image-{}-{}", state.next_id + 1, extension);
        state.next_id += 1;
        state.assets.insert(id.clone(), image);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_club_models::{PersonRef, Rating};

    fn movie(id: &str, title: &str, release: &str, genres: &[&str]) -> Movie {
        serde_json::from_value(json!({
            "_id": id,
            "title": title,
            "releaseDate": release,
            "genres": genres,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_movies_orders_and_filters() {
        let store = MemoryStore::new();
        store.insert_movie(&movie("m1", "Old", "1990-01-01", &["Drama"])).unwrap();
        store.insert_movie(&movie("m2", "New", "2020-01-01", &["Comedy"])).unwrap();
        store.insert_movie(&movie("m3", "Mid", "2005-01-01", &["Drama"])).unwrap();

        let all = store.fetch_movies(&MovieFilter::all(), ReadConsistency::Cached).await.unwrap();
        let titles: Vec<_> = all.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Mid", "Old"]);

        let drama = store.fetch_movies(&MovieFilter::genre("drama"), ReadConsistency::Fresh).await.unwrap();
        assert_eq!(drama.len(), 2);
        assert_eq!(store.stats().fresh_reads, 1);
    }

    #[tokio::test]
    async fn test_reads_expand_people() {
        let store = MemoryStore::new();
        store
            .insert_person(&Person { id: "p1".to_string(), name: "Ada".to_string(), image: None })
            .unwrap();
        let mut m = movie("m1", "Heat", "1995-12-15", &[]);
        m.ratings.push(Rating { key: "r1".to_string(), person: PersonRef::reference("p1"), rating: 8.0 });
        store.insert_movie(&m).unwrap();

        let fetched = store.fetch_movie("m1", ReadConsistency::Cached).await.unwrap().unwrap();
        assert_eq!(fetched.ratings[0].person.person().map(|p| p.name.as_str()), Some("Ada"));

        store.set_expand_references(false).unwrap();
        let fetched = store.fetch_movie("m1", ReadConsistency::Cached).await.unwrap().unwrap();
        assert!(!fetched.ratings[0].person.is_expanded());
    }

    #[tokio::test]
    async fn test_patch_checks_revision() {
        let store = MemoryStore::new();
        store.insert_movie(&movie("m1", "Heat", "1995-12-15", &[])).unwrap();
        let current = store.raw_movie("m1").unwrap();
        let revision = current.revision.clone().unwrap();

        let patch = Patch::new("m1")
            .if_revision(revision.clone())
            .set_if_missing("ratings", json!([]))
            .append("ratings", vec![json!({"_key": "r1", "person": {"_ref": "p1"}, "rating": 5.0})]);
        let patched = store.patch_movie(&patch).await.unwrap();
        assert_eq!(patched.ratings.len(), 1);
        assert_ne!(patched.revision, Some(revision));

        // Same revision again: the document moved on
        let err = store.patch_movie(&patch).await.unwrap_err();
        assert!(matches!(err, SourceError::RevisionMismatch { .. }));
        assert_eq!(store.raw_movie("m1").unwrap().ratings.len(), 1);
    }

    #[tokio::test]
    async fn test_point_reads() {
        let store = MemoryStore::new();
        store
            .insert_person(&Person { id: "p1".to_string(), name: "Ada".to_string(), image: None })
            .unwrap();
        let mut m = movie("m1", "Heat", "1995-12-15", &[]);
        m.slug = serde_json::from_value(json!({ "current": "heat" })).unwrap();
        store.insert_movie(&m).unwrap();

        let by_id = store.fetch_movie("m1", ReadConsistency::Cached).await.unwrap();
        let by_slug = store.fetch_movie_by_slug("heat", ReadConsistency::Fresh).await.unwrap();
        assert_eq!(by_id.map(|m| m.title), Some("Heat".to_string()));
        assert_eq!(by_slug.map(|m| m.id), Some("m1".to_string()));
        assert!(store.fetch_movie("heat", ReadConsistency::Cached).await.unwrap().is_none());
        assert!(store.fetch_movie_by_slug("ronin", ReadConsistency::Cached).await.unwrap().is_none());

        assert_eq!(store.fetch_person("p1").await.unwrap().map(|p| p.name), Some("Ada".to_string()));
        assert!(store.fetch_person("m1").await.unwrap().is_none());
        assert_eq!(store.stats().movie_reads, 4);
    }

    #[tokio::test]
    async fn test_patch_missing_document() {
        let store = MemoryStore::new();
        let err = store.patch_movie(&Patch::new("nope").set("title", json!("x"))).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        store.fail_next_reads(1).unwrap();
        assert!(store.fetch_movies(&MovieFilter::all(), ReadConsistency::Cached).await.is_err());
        assert!(store.fetch_movies(&MovieFilter::all(), ReadConsistency::Cached).await.is_ok());

        store.fail_uploads_after(1).unwrap();
        let upload = || ImageUpload { bytes: vec![1, 2, 3], content_type: "image/png".to_string(), filename: None };
        assert!(store.upload_image(upload()).await.is_ok());
        assert!(store.upload_image(upload()).await.is_err());
        assert_eq!(store.asset_count(), 1);
    }
}
