pub mod movie;
pub mod user;

pub use movie::{GenreGroup, Movie, MovieDraft, MovieStats, MOVIES_TABLE, MOVIE_FIELDS};
pub use user::{Role, User, UserDraft, USERS_TABLE};
