/// Database model definitions.
pub mod models;
/// Repository abstraction and the bundled in-memory backend.
pub mod repository;
/// Storage error types shared by every backend.
pub mod storage;
