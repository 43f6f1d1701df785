//! Cloud mirror over a plain HTTP object store
//!
//! Objects are written with `PUT {base}/{key}` and removed with
//! `DELETE {base}/{key}`.

pub mod client;
pub mod error;

pub use client::HttpMirrorClient;
pub use error::{CloudMirrorError, Result};
