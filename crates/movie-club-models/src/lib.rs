pub mod comment;
pub mod external;
pub mod image;
pub mod movie;
pub mod person;
pub mod rating;

pub use comment::Comment;
pub use external::{ExternalGenre, ExternalMovie, ExternalMovieDetails, SearchPage};
pub use image::{AssetReference, ImageRef, Slug};
pub use movie::{Movie, NewMovie};
pub use person::{NewPerson, Person, PersonRef, Session};
pub use rating::{Rating, MAX_RATING, MIN_RATING};
