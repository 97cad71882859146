// crates/rt-deployment-state/src/backends/mod.rs
// ============================================================================
// Module: Built-In Backends
// Description: Backend kinds shipped with RT.
// Purpose: Group the memory and S3 deployment state backends.
// Dependencies: crate::backends::{memory, s3}
// ============================================================================

//! Built-in backend kinds: `memory` for tests and embedders, `s3` for buckets.

pub mod memory;
pub mod s3;

pub use memory::MemoryBackend;
pub use memory::MemoryBackendKind;
pub use s3::S3Backend;
pub use s3::S3BackendKind;
pub use s3::S3Config;
