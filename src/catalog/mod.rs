pub mod file_repository;
pub mod metadata_repository;
pub mod model;
pub mod plan_repository;
pub mod session_repository;

pub use model::*;
