//! PostgreSQL persistence for file metadata records

pub mod files;
pub mod store;
pub mod types;

pub use sqlx::postgres::PgPool;
pub use store::PgMetadataStore;
pub use types::FileRow;
