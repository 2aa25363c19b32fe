//! In-memory collaborator doubles for satchel tests
//!
//! Each double implements one of the `satchel-core` effect traits with
//! deterministic, inspectable behavior: call logs, configurable failure
//! injection, and synchronous loopback delivery for the relay. Used by
//! the unit and integration tests across the workspace; none of this is
//! shipped in production builds.

pub mod directory;
pub mod keys;
pub mod mesh;
pub mod redeemer;
pub mod relay;

pub use directory::MemoryDirectory;
pub use mesh::MemoryMesh;
pub use redeemer::MemoryRedeemer;
pub use relay::MemoryRelay;
