//! Shared filesystem, process, and hashing helpers for plugforge.

pub mod error;
pub mod fs;
pub mod hash;
pub mod process;
