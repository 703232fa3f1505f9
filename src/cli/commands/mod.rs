pub mod delete;
pub mod import;
pub mod migrate;
