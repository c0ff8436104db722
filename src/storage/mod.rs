//! Storage module - Object store capability, GCS client, and access tokens

pub mod auth;
pub mod gcs;
pub mod traits;

pub use traits::{object_key, object_name, ObjectStore, UploadedArtifact, IMAGE_CONTENT_TYPE};
