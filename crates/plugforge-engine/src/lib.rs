//! Artifact resolution pipeline: classpath discovery, build orchestration,
//! archive synthesis, caching, and signing.

pub mod build;
pub mod classpath;
pub mod error;
pub mod manifest;
pub mod memo;
pub mod pipeline;
pub mod sign;
pub mod synthesize;

pub use classpath::{Classpath, ClasspathRoot, PackageLocator};
pub use error::EngineError;
pub use manifest::ManifestAttributes;
pub use pipeline::{ArtifactPipeline, CacheKey};
pub use sign::Signer;
