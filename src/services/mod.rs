pub mod blob_store;
pub mod directory;
pub mod image_ingest;
pub mod session;
pub mod user_store;
