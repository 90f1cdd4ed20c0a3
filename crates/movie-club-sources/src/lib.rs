pub mod error;
pub mod factory;
pub mod image;
pub mod memory;
pub mod notify;
pub mod patch;
pub mod sanity;
pub mod tmdb;
pub mod traits;

pub use error::SourceError;
pub use factory::{create_content_store, create_metadata_source, create_sources, Sources};
pub use image::HttpImageFetcher;
pub use memory::{MemoryStore, StoreStats};
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier, RecordingNotifier};
pub use patch::{Patch, PatchOp};
pub use sanity::SanityClient;
pub use tmdb::TmdbClient;
pub use traits::{ContentStore, ImageFetcher, ImageUpload, MetadataSource, MovieFilter, ReadConsistency};
