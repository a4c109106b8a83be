//! Packing engine: interleaved vertex layouts and buffers.

mod config;
pub mod encoding;
mod meshes;

pub use config::{PackedAttribute, PackingConfiguration};
pub use meshes::{PackRequest, PackedBuffer, PackedMesh, PackedMeshes, PackedTriangles, PackingOptions};
