//! Provider module - Capability trait, domain types, and the Leonardo client

pub mod leonardo;
pub mod traits;

pub use traits::{
    GenerationJob, GenerationProvider, GenerationRequest, GenerationResult, GenerationStatus,
    ImageDescriptor, JobStatus, Submission,
};
