pub mod files;
pub mod frontend;
pub mod health;
