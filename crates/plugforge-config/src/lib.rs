//! Artifact descriptors and declaration files for plugforge.

pub mod decl;
pub mod descriptor;

pub use decl::{Declaration, DeclError};
pub use descriptor::{
    simplify_packages, ArtifactSource, ClassRef, Descriptor, PLATFORM_VERSION,
};
