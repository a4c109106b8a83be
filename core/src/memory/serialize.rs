use crate::error::SerializeResult;
use crate::memory::MemoryMesh;
use crate::protocol::Serializer;

/// Write `mesh` through `serializer` in protocol order and finish it.
///
/// Both body sections are always written, even when empty. Metadata blocks
/// follow the triangles.
pub fn serialize_mesh<S: Serializer + ?Sized>(mesh: &MemoryMesh, serializer: &mut S) -> SerializeResult<()> {
    serializer.serialize_header(mesh.header())?;

    serializer.serialize_vertex_data_non_interleaved_start()?;
    for array in mesh.arrays_in_order() {
        serializer.serialize_data(array.attribute().name())?;
        for value in array.values() {
            serializer.serialize_value(&value)?;
        }
    }
    serializer.serialize_vertex_data_non_interleaved_finish()?;

    serializer.serialize_triangles_start()?;
    for &[v0, v1, v2] in mesh.triangles() {
        serializer.serialize_triangle(v0, v1, v2)?;
    }
    serializer.serialize_triangles_finish()?;

    for block in mesh.metadata() {
        serializer.serialize_metadata(&block.schema, &block.data)?;
    }
    serializer.finish()
}
