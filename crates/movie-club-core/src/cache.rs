//! Session-scoped query cache.
//!
//! Entries are keyed by query, carry the time they were fetched and go stale
//! after a per-kind window. Mutations describe their effect as a
//! [`CachePatch`], which is applied to every affected entry under a single
//! lock acquisition so concurrent patches never interleave on one entry.
//!
//! Every patch, invalidation and local write bumps a write generation. A
//! fetch records the generation before it reads and hands it back with the
//! result ([`QueryCache::set_fetched`]); if anything was written meanwhile the
//! result may predate that write, so it is kept but marked stale.

use movie_club_config::CacheConfig;
use movie_club_models::{Comment, Movie, Person, Rating};
use movie_club_sources::{MovieFilter, ReadConsistency};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Movies(MovieFilter),
    /// Keyed by whatever the caller asked for: id or slug
    Movie(String),
    Comments(String),
    Person(String),
    CurrentPerson(String),
}

impl CacheKey {
    pub fn movies(filter: &MovieFilter) -> Self {
        CacheKey::Movies(filter.clone())
    }

    pub fn movie(id_or_slug: impl Into<String>) -> Self {
        CacheKey::Movie(id_or_slug.into())
    }

    pub fn comments(movie_id: impl Into<String>) -> Self {
        CacheKey::Comments(movie_id.into())
    }

    pub fn person(id: impl Into<String>) -> Self {
        CacheKey::Person(id.into())
    }

    pub fn current_person(name: impl Into<String>) -> Self {
        CacheKey::CurrentPerson(name.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Movies(Vec<Movie>),
    Movie(Movie),
    Comments(Vec<Comment>),
    Person(Person),
}

/// Conversion between a query result and its cached form
pub trait Cacheable: Sized + Clone {
    fn from_cached(value: CachedValue) -> Option<Self>;
    fn into_cached(self) -> CachedValue;
}

impl Cacheable for Vec<Movie> {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Movies(movies) => Some(movies),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::Movies(self)
    }
}

impl Cacheable for Movie {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Movie(movie) => Some(movie),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::Movie(self)
    }
}

impl Cacheable for Vec<Comment> {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Comments(comments) => Some(comments),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::Comments(self)
    }
}

impl Cacheable for Person {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Person(person) => Some(person),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::Person(self)
    }
}

/// Effect of a successful write, expressed against cached data
#[derive(Debug, Clone, PartialEq)]
pub enum CachePatch {
    /// Replace the person's rating (matched by key or person) or add it
    UpsertRating { movie_id: String, rating: Rating },
    /// Drop every rating the person has on the movie
    RemoveRating { movie_id: String, person_id: String },
    AppendComment { movie_id: String, comment: Comment },
    RemoveComment { movie_id: String, comment_key: String },
    /// Newly created movie goes to the front of every list whose filter it matches
    PrependMovie(Movie),
}

impl CachePatch {
    fn movie_id(&self) -> &str {
        match self {
            CachePatch::UpsertRating { movie_id, .. }
            | CachePatch::RemoveRating { movie_id, .. }
            | CachePatch::AppendComment { movie_id, .. }
            | CachePatch::RemoveComment { movie_id, .. } => movie_id,
            CachePatch::PrependMovie(movie) => &movie.id,
        }
    }

    /// Apply to one movie document; returns whether anything changed
    fn apply_to_movie(&self, movie: &mut Movie) -> bool {
        if movie.id != self.movie_id() {
            return false;
        }
        match self {
            CachePatch::UpsertRating { rating, .. } => {
                let existing = movie
                    .ratings
                    .iter_mut()
                    .find(|r| r.key == rating.key || r.person_id() == rating.person_id());
                match existing {
                    Some(existing) => *existing = rating.clone(),
                    None => movie.ratings.push(rating.clone()),
                }
                // Legacy duplicates from the same person go away with the write
                let mut seen = false;
                movie.ratings.retain(|r| {
                    if r.person_id() != rating.person_id() {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
                true
            }
            CachePatch::RemoveRating { person_id, .. } => {
                let before = movie.ratings.len();
                movie.ratings.retain(|r| r.person_id() != person_id);
                movie.ratings.len() != before
            }
            CachePatch::AppendComment { comment, .. } => append_comment(&mut movie.comments, comment),
            CachePatch::RemoveComment { comment_key, .. } => remove_comment(&mut movie.comments, comment_key),
            CachePatch::PrependMovie(_) => false,
        }
    }

    fn apply_to_value(&self, key: &CacheKey, value: &mut CachedValue) -> bool {
        match (value, self) {
            (CachedValue::Movies(movies), CachePatch::PrependMovie(movie)) => {
                let CacheKey::Movies(filter) = key else { return false };
                if !filter.matches(movie) || movies.iter().any(|m| m.id == movie.id) {
                    return false;
                }
                movies.insert(0, movie.clone());
                true
            }
            (CachedValue::Movies(movies), patch) => {
                movies.iter_mut().fold(false, |changed, m| patch.apply_to_movie(m) || changed)
            }
            (CachedValue::Movie(movie), patch) => patch.apply_to_movie(movie),
            (CachedValue::Comments(comments), CachePatch::AppendComment { movie_id, comment }) => {
                matches!(key, CacheKey::Comments(id) if id == movie_id) && append_comment(comments, comment)
            }
            (CachedValue::Comments(comments), CachePatch::RemoveComment { movie_id, comment_key }) => {
                matches!(key, CacheKey::Comments(id) if id == movie_id) && remove_comment(comments, comment_key)
            }
            _ => false,
        }
    }
}

fn append_comment(comments: &mut Vec<Comment>, comment: &Comment) -> bool {
    if comments.iter().any(|c| c.key == comment.key) {
        return false;
    }
    comments.push(comment.clone());
    true
}

fn remove_comment(comments: &mut Vec<Comment>, key: &str) -> bool {
    let before = comments.len();
    comments.retain(|c| c.key != key);
    comments.len() != before
}

/// Stale windows per key kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleTimes {
    pub movies: Duration,
    pub movie: Duration,
    pub comments: Duration,
    pub person: Duration,
}

impl StaleTimes {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            movies: config.movie_list_stale(),
            movie: config.movie_detail_stale(),
            comments: config.comments_stale(),
            person: config.person_stale(),
        }
    }

    fn for_key(&self, key: &CacheKey) -> Duration {
        match key {
            CacheKey::Movies(_) => self.movies,
            CacheKey::Movie(_) => self.movie,
            CacheKey::Comments(_) => self.comments,
            CacheKey::Person(_) | CacheKey::CurrentPerson(_) => self.person,
        }
    }
}

impl Default for StaleTimes {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    fetched_at: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn is_fresh(&self, stale_after: Duration) -> bool {
        !self.invalidated && self.fetched_at.elapsed() < stale_after
    }
}

pub struct QueryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    last_write: Mutex<Option<Instant>>,
    generation: AtomicU64,
    stale: StaleTimes,
    fresh_read_window: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self::new(StaleTimes::from_config(&config), config.fresh_read_window())
    }
}

// A poisoned lock only means another task panicked mid-update; the map itself is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl QueryCache {
    pub fn new(stale: StaleTimes, fresh_read_window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            last_write: Mutex::new(None),
            generation: AtomicU64::new(0),
            stale,
            fresh_read_window,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(StaleTimes::from_config(config), config.fresh_read_window())
    }

    /// Value for `key` if present and still fresh
    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let entries = lock(&self.entries);
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.stale.for_key(key)) => {
                debug!("cache hit: {:?}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("cache stale: {:?}", key);
                None
            }
            None => {
                debug!("cache miss: {:?}", key);
                None
            }
        }
    }

    /// Value for `key` regardless of staleness
    pub fn peek(&self, key: &CacheKey) -> Option<CachedValue> {
        lock(&self.entries).get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: CacheKey, value: CachedValue) {
        lock(&self.entries).insert(
            key,
            CacheEntry { value, fetched_at: Instant::now(), invalidated: false },
        );
    }

    /// Current write generation; take it before reading from the store
    pub fn write_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a fetch result read at `generation`. Returns false, and stores the
    /// value already invalidated, when a write landed while the fetch was out.
    pub fn set_fetched(&self, key: CacheKey, value: CachedValue, generation: u64) -> bool {
        let mut entries = lock(&self.entries);
        let current = self.write_generation() == generation;
        if !current {
            debug!("fetch of {:?} overlapped a write; storing it stale", key);
        }
        entries.insert(
            key,
            CacheEntry { value, fetched_at: Instant::now(), invalidated: !current },
        );
        current
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Apply a patch to every cached entry it touches; returns how many changed.
    /// Stale entries are patched too so a later `peek` never shows pre-write data.
    pub fn apply(&self, patch: &CachePatch) -> usize {
        let mut entries = lock(&self.entries);
        self.bump();
        let mut changed = 0;
        for (key, entry) in entries.iter_mut() {
            if patch.apply_to_value(key, &mut entry.value) {
                changed += 1;
            }
        }
        debug!("cache patch {:?} touched {} entries", patch_name(patch), changed);
        changed
    }

    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = lock(&self.entries);
        self.bump();
        if let Some(entry) = entries.get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Mark every movie list stale; entries keep their data until refetched
    pub fn invalidate_movie_lists(&self) {
        let mut entries = lock(&self.entries);
        self.bump();
        for (key, entry) in entries.iter_mut() {
            if matches!(key, CacheKey::Movies(_)) {
                entry.invalidated = true;
            }
        }
    }

    /// Mark stale the detail entries and comment list for one movie
    pub fn invalidate_movie(&self, movie_id: &str) {
        let mut entries = lock(&self.entries);
        self.bump();
        for (key, entry) in entries.iter_mut() {
            let affected = match (key, &entry.value) {
                (CacheKey::Comments(id), _) => id == movie_id,
                (CacheKey::Movie(_), CachedValue::Movie(movie)) => movie.id == movie_id,
                _ => false,
            };
            if affected {
                entry.invalidated = true;
            }
        }
    }

    pub fn clear(&self) {
        let mut entries = lock(&self.entries);
        self.bump();
        entries.clear();
        drop(entries);
        lock(&self.in_flight).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock shared by every fetch of `key`; the holder does the fetch, the rest wait for its result
    pub fn fetch_lock(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.in_flight).entry(key.clone()).or_default().clone()
    }

    /// Fresh copy of a movie already held by any detail or list entry
    pub fn find_movie(&self, movie_id: &str) -> Option<Movie> {
        let entries = lock(&self.entries);
        let fresh = entries
            .iter()
            .filter(|(key, entry)| entry.is_fresh(self.stale.for_key(key)));
        let mut from_list = None;
        for (_, entry) in fresh {
            match &entry.value {
                CachedValue::Movie(movie) if movie.id == movie_id => return Some(movie.clone()),
                CachedValue::Movies(movies) if from_list.is_none() => {
                    from_list = movies.iter().find(|m| m.id == movie_id).cloned();
                }
                _ => {}
            }
        }
        from_list
    }

    /// Any cached person record for `person_id`, stale or not
    pub fn known_person(&self, person_id: &str) -> Option<Person> {
        lock(&self.entries).values().find_map(|entry| match &entry.value {
            CachedValue::Person(person) if person.id == person_id => Some(person.clone()),
            _ => None,
        })
    }

    pub fn record_write(&self) {
        let _entries = lock(&self.entries);
        self.bump();
        *lock(&self.last_write) = Some(Instant::now());
    }

    /// `Fresh` for a while after a local write so the CDN cannot serve pre-write data
    pub fn read_consistency(&self) -> ReadConsistency {
        match *lock(&self.last_write) {
            Some(at) if at.elapsed() < self.fresh_read_window => ReadConsistency::Fresh,
            _ => ReadConsistency::Cached,
        }
    }
}

fn patch_name(patch: &CachePatch) -> &'static str {
    match patch {
        CachePatch::UpsertRating { .. } => "upsert-rating",
        CachePatch::RemoveRating { .. } => "remove-rating",
        CachePatch::AppendComment { .. } => "append-comment",
        CachePatch::RemoveComment { .. } => "remove-comment",
        CachePatch::PrependMovie(_) => "prepend-movie",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_club_models::{PersonRef, Rating};
    use serde_json::json;

    fn movie(id: &str, genres: &[&str]) -> Movie {
        serde_json::from_value(json!({ "_id": id, "title": id, "slug": { "current": id }, "genres": genres }))
            .unwrap()
    }

    fn rating(key: &str, person: &str, value: f64) -> Rating {
        Rating { key: key.to_string(), person: PersonRef::reference(person), rating: value }
    }

    fn comment(key: &str) -> Comment {
        Comment { key: key.to_string(), person: PersonRef::reference("p1"), comment: "hi".to_string(), created_at: None }
    }

    fn cache() -> QueryCache {
        let stale = StaleTimes {
            movies: Duration::from_secs(60),
            movie: Duration::from_secs(60),
            comments: Duration::from_secs(60),
            person: Duration::from_secs(60),
        };
        QueryCache::new(stale, Duration::from_secs(60))
    }

    fn cached_movie(cache: &QueryCache, key: &CacheKey) -> Movie {
        Movie::from_cached(cache.peek(key).unwrap()).unwrap()
    }

    fn cached_movies(cache: &QueryCache, key: &CacheKey) -> Vec<Movie> {
        Vec::<Movie>::from_cached(cache.peek(key).unwrap()).unwrap()
    }

    #[test]
    fn test_get_respects_stale_window() {
        let cache = QueryCache::new(
            StaleTimes { movies: Duration::ZERO, ..StaleTimes::default() },
            Duration::ZERO,
        );
        cache.set(CacheKey::movies(&MovieFilter::all()), CachedValue::Movies(vec![]));
        cache.set(CacheKey::movie("m1"), CachedValue::Movie(movie("m1", &[])));

        assert!(cache.get(&CacheKey::movies(&MovieFilter::all())).is_none());
        assert!(cache.peek(&CacheKey::movies(&MovieFilter::all())).is_some());
        assert!(cache.get(&CacheKey::movie("m1")).is_some());
    }

    #[test]
    fn test_invalidate() {
        let cache = cache();
        let all = CacheKey::movies(&MovieFilter::all());
        let drama = CacheKey::movies(&MovieFilter::genre("Drama"));
        cache.set(all.clone(), CachedValue::Movies(vec![movie("m1", &["Drama"])]));
        cache.set(drama.clone(), CachedValue::Movies(vec![movie("m1", &["Drama"])]));
        cache.set(CacheKey::movie("m1"), CachedValue::Movie(movie("m1", &["Drama"])));
        cache.set(CacheKey::comments("m1"), CachedValue::Comments(vec![]));

        cache.invalidate_movie_lists();
        assert!(cache.get(&all).is_none());
        assert!(cache.get(&drama).is_none());
        assert!(cache.get(&CacheKey::movie("m1")).is_some());

        cache.invalidate_movie("m1");
        assert!(cache.get(&CacheKey::movie("m1")).is_none());
        assert!(cache.get(&CacheKey::comments("m1")).is_none());

        cache.set(CacheKey::person("p1"), CachedValue::Person(Person { id: "p1".into(), name: "Ada".into(), image: None }));
        cache.invalidate(&CacheKey::person("p1"));
        assert!(cache.get(&CacheKey::person("p1")).is_none());
        assert_eq!(cache.known_person("p1").map(|p| p.name), Some("Ada".to_string()));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_upsert_rating_patches_lists_and_detail() {
        let cache = cache();
        let all = CacheKey::movies(&MovieFilter::all());
        let mut m1 = movie("m1", &[]);
        m1.ratings.push(rating("r1", "p1", 4.0));
        cache.set(all.clone(), CachedValue::Movies(vec![m1.clone(), movie("m2", &[])]));
        cache.set(CacheKey::movie("m1"), CachedValue::Movie(m1.clone()));
        cache.set(CacheKey::movie("slug-of-m1"), CachedValue::Movie(m1));

        // Existing rating by p1 is replaced in place
        let changed = cache.apply(&CachePatch::UpsertRating { movie_id: "m1".into(), rating: rating("r1", "p1", 9.0) });
        assert_eq!(changed, 3);
        assert_eq!(cached_movie(&cache, &CacheKey::movie("m1")).ratings, vec![rating("r1", "p1", 9.0)]);
        assert_eq!(cached_movie(&cache, &CacheKey::movie("slug-of-m1")).ratings, vec![rating("r1", "p1", 9.0)]);

        // New person is appended; the other movie in the list is untouched
        cache.apply(&CachePatch::UpsertRating { movie_id: "m1".into(), rating: rating("r2", "p2", 7.0) });
        let list = cached_movies(&cache, &all);
        assert_eq!(list[0].ratings.len(), 2);
        assert!(list[1].ratings.is_empty());

        cache.apply(&CachePatch::RemoveRating { movie_id: "m1".into(), person_id: "p2".into() });
        assert_eq!(cached_movie(&cache, &CacheKey::movie("m1")).ratings, vec![rating("r1", "p1", 9.0)]);
    }

    #[test]
    fn test_upsert_rating_collapses_duplicates() {
        let cache = cache();
        let mut m1 = movie("m1", &[]);
        m1.ratings = vec![rating("r1", "p1", 4.0), rating("r2", "p2", 5.0), rating("r3", "p1", 6.0)];
        cache.set(CacheKey::movie("m1"), CachedValue::Movie(m1));

        cache.apply(&CachePatch::UpsertRating { movie_id: "m1".into(), rating: rating("r1", "p1", 8.0) });
        let ratings = cached_movie(&cache, &CacheKey::movie("m1")).ratings;
        assert_eq!(ratings, vec![rating("r1", "p1", 8.0), rating("r2", "p2", 5.0)]);
    }

    #[test]
    fn test_comment_patches() {
        let cache = cache();
        cache.set(CacheKey::movie("m1"), CachedValue::Movie(movie("m1", &[])));
        cache.set(CacheKey::comments("m1"), CachedValue::Comments(vec![comment("c1")]));
        cache.set(CacheKey::comments("m2"), CachedValue::Comments(vec![]));

        let append = CachePatch::AppendComment { movie_id: "m1".into(), comment: comment("c2") };
        assert_eq!(cache.apply(&append), 2);
        // Applying the same comment twice is a no-op
        assert_eq!(cache.apply(&append), 0);

        let comments = Vec::<Comment>::from_cached(cache.peek(&CacheKey::comments("m1")).unwrap()).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(
            Vec::<Comment>::from_cached(cache.peek(&CacheKey::comments("m2")).unwrap()).unwrap().len(),
            0
        );

        cache.apply(&CachePatch::RemoveComment { movie_id: "m1".into(), comment_key: "c1".into() });
        let comments = Vec::<Comment>::from_cached(cache.peek(&CacheKey::comments("m1")).unwrap()).unwrap();
        assert_eq!(comments, vec![comment("c2")]);
        assert_eq!(cached_movie(&cache, &CacheKey::movie("m1")).comments, vec![comment("c2")]);
    }

    #[test]
    fn test_prepend_movie_respects_filters() {
        let cache = cache();
        let all = CacheKey::movies(&MovieFilter::all());
        let drama = CacheKey::movies(&MovieFilter::genre("Drama"));
        let comedy = CacheKey::movies(&MovieFilter::genre("Comedy"));
        cache.set(all.clone(), CachedValue::Movies(vec![movie("m1", &["Comedy"])]));
        cache.set(drama.clone(), CachedValue::Movies(vec![]));
        cache.set(comedy.clone(), CachedValue::Movies(vec![movie("m1", &["Comedy"])]));

        let patch = CachePatch::PrependMovie(movie("m2", &["Drama"]));
        assert_eq!(cache.apply(&patch), 2);
        assert_eq!(cache.apply(&patch), 0);

        let ids = |key: &CacheKey| cached_movies(&cache, key).into_iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(&all), vec!["m2", "m1"]);
        assert_eq!(ids(&drama), vec!["m2"]);
        assert_eq!(ids(&comedy), vec!["m1"]);
    }

    #[test]
    fn test_find_movie() {
        let cache = cache();
        cache.set(CacheKey::movies(&MovieFilter::all()), CachedValue::Movies(vec![movie("m1", &[]), movie("m2", &[])]));
        assert_eq!(cache.find_movie("m2").map(|m| m.id), Some("m2".to_string()));
        assert!(cache.find_movie("m3").is_none());

        cache.invalidate_movie_lists();
        assert!(cache.find_movie("m2").is_none());
    }

    #[test]
    fn test_read_consistency_after_write() {
        let cache = cache();
        assert_eq!(cache.read_consistency(), ReadConsistency::Cached);
        cache.record_write();
        assert_eq!(cache.read_consistency(), ReadConsistency::Fresh);

        let no_window = QueryCache::new(StaleTimes::default(), Duration::ZERO);
        no_window.record_write();
        assert_eq!(no_window.read_consistency(), ReadConsistency::Cached);
    }

    #[test]
    fn test_fetch_overlapping_a_write_is_stored_stale() {
        let cache = cache();
        let key = CacheKey::movie("m1");

        let before = cache.write_generation();
        assert!(cache.set_fetched(key.clone(), CachedValue::Movie(movie("m1", &[])), before));
        assert!(cache.get(&key).is_some());

        let writes: [fn(&QueryCache); 3] = [
            |c| c.record_write(),
            |c| c.invalidate_movie("m2"),
            |c| {
                c.apply(&CachePatch::UpsertRating { movie_id: "m2".into(), rating: rating("r1", "p1", 5.0) });
            },
        ];
        for write in writes {
            let generation = cache.write_generation();
            write(&cache);
            assert!(!cache.set_fetched(key.clone(), CachedValue::Movie(movie("m1", &[])), generation));
            assert!(cache.get(&key).is_none());
            assert!(cache.peek(&key).is_some());
        }
    }

    #[tokio::test]
    async fn test_fetch_lock_is_shared_per_key() {
        let cache = cache();
        let a = cache.fetch_lock(&CacheKey::movie("m1"));
        let b = cache.fetch_lock(&CacheKey::movie("m1"));
        let other = cache.fetch_lock(&CacheKey::movie("m2"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));

        let _guard = a.lock().await;
        assert!(b.try_lock().is_err());
        assert!(other.try_lock().is_ok());
    }
}
