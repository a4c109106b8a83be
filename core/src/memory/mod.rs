//! Meshes held entirely in memory.
//!
//! [`MemoryMeshProducer`] collects a parse into a [`MemoryMesh`], and
//! [`serialize_mesh`] writes one back out through any serializer.

mod mesh;
mod producer;
mod serialize;

pub use mesh::{ArrayData, AttributeArray, MemoryMesh, Metadata};
pub use producer::MemoryMeshProducer;
pub use serialize::serialize_mesh;
