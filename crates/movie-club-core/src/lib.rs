pub mod cache;
pub mod error;
pub mod mutation;
pub mod retry;
pub mod service;
pub mod sort;

pub use cache::{CacheKey, CachePatch, Cacheable, CachedValue, QueryCache, StaleTimes};
pub use error::MovieError;
pub use mutation::{MutationKind, MutationState, MutationTracker};
pub use retry::{retry_read, RetryPolicy};
pub use service::{MovieService, ServiceOptions};
pub use sort::{average_rating, filter_by_genre, format_rating, sort_by_release_date, sort_movies, SortMode};
