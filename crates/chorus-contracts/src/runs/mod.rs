pub mod cache;
pub mod summary;
