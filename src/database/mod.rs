pub mod manager;
pub mod models;
pub mod movie_repository;
pub mod query_builder;
pub mod user_repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use movie_repository::MovieRepository;
pub use user_repository::UserRepository;
