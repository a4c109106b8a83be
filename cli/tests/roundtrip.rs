use std::io::Cursor;

use rstest::rstest;

use smf_binary::{BinaryFormat, BinaryOptions};
use smf_core::FormatProvider;
use smf_core::layout::{
    Attribute, AttributeName, ByteOrder, CoordinateSystem, Header, SchemaIdentifier, SchemaName,
    TriangleBlock,
};
use smf_core::memory::{AttributeArray, MemoryMesh, MemoryMeshProducer, Metadata, serialize_mesh};
use smf_core::protocol::AttributeValue;
use smf_text::TextFormat;

fn name(s: &str) -> AttributeName {
    AttributeName::new(s).unwrap()
}

fn schema(s: &str) -> SchemaIdentifier {
    SchemaIdentifier::new(SchemaName::new(s).unwrap(), 1, 0)
}

fn max_index(bits: u32) -> u64 {
    if bits == 64 { u64::MAX } else { (1 << bits) - 1 }
}

/// Four vertices covering every component type and a triangle using the
/// largest index the index size allows.
fn mesh(index_bits: u32) -> MemoryMesh {
    let position = Attribute::float(name("position"), 3, 32).unwrap();
    let normal = Attribute::float(name("normal"), 3, 16).unwrap();
    let weight = Attribute::float(name("weight"), 1, 64).unwrap();
    let offset = Attribute::signed(name("offset"), 2, 8).unwrap();
    let id = Attribute::unsigned(name("id"), 1, 64).unwrap();

    let header = Header::builder()
        .with_vertex_count(4)
        .with_triangles(TriangleBlock::new(2, index_bits).unwrap())
        .with_schema_identifier(Some(schema("com.example.mesh")))
        .with_coordinate_system(CoordinateSystem::from_tokens(&["+x", "+z", "-y", "clockwise"]).unwrap())
        .with_attributes([
            position.clone(),
            normal.clone(),
            weight.clone(),
            offset.clone(),
            id.clone(),
        ])
        .build()
        .unwrap();

    let floats = |values: &[[f64; 3]]| {
        values
            .iter()
            .map(|v| AttributeValue::float(v).unwrap())
            .collect::<Vec<_>>()
    };
    let positions = floats(&[[0.1, 0.2, 0.3], [1.0, 0.0, 0.0], [0.0, -1.5, 0.0], [3.25, 2.5, -7.75]]);
    let normals = floats(&[[0.0, 1.0, 0.0], [0.5, -0.25, 1024.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
    let weights = [0.1, 1e-300, -2.5e10, 0.0].map(|w| AttributeValue::float(&[w]).unwrap());
    let offsets = [[-128, 127], [0, -1], [5, 6], [-7, 8]].map(|o| AttributeValue::signed(&o).unwrap());
    let ids = [0, 1, u64::MAX, 42].map(|i| AttributeValue::unsigned(&[i]).unwrap());

    MemoryMesh::new(
        header,
        [
            AttributeArray::from_values(position, positions).unwrap(),
            AttributeArray::from_values(normal, normals).unwrap(),
            AttributeArray::from_values(weight, weights).unwrap(),
            AttributeArray::from_values(offset, offsets).unwrap(),
            AttributeArray::from_values(id, ids).unwrap(),
        ],
        vec![[0, 1, 2], [max_index(index_bits), 3, 0]],
        vec![
            Metadata {
                schema: schema("com.example.tags"),
                data: b"tag".to_vec(),
            },
            Metadata {
                schema: schema("com.example.empty"),
                data: Vec::new(),
            },
        ],
    )
    .unwrap()
}

fn encode(provider: &dyn FormatProvider, mesh: &MemoryMesh) -> Vec<u8> {
    let version = provider.highest_version().unwrap();
    let mut out = Vec::new();
    {
        let mut serializer = provider
            .create_serializer(version, Some("out".into()), Box::new(&mut out))
            .unwrap();
        serialize_mesh(mesh, serializer.as_mut()).unwrap();
    }
    out
}

fn decode(provider: &dyn FormatProvider, bytes: &[u8]) -> MemoryMesh {
    let mut producer = MemoryMeshProducer::new();
    provider
        .create_parser(&mut producer, Some("in".into()), Box::new(Cursor::new(bytes)))
        .parse();
    let result = producer.into_mesh();
    assert!(result.errors().is_empty(), "{:?}", result.errors());
    assert!(result.warnings().is_empty(), "{:?}", result.warnings());
    result.value().cloned().unwrap()
}

fn binary(order: ByteOrder) -> BinaryFormat {
    BinaryFormat::with_options(BinaryOptions::default().with_data_byte_order(order))
}

#[rstest]
fn test_text_round_trip(#[values(8, 16, 32, 64)] index_bits: u32) {
    let original = mesh(index_bits);
    let read = decode(&TextFormat::new(), &encode(&TextFormat::new(), &original));
    assert!(read.approx_eq(&original));
}

#[rstest]
fn test_binary_round_trip(
    #[values(8, 16, 32, 64)] index_bits: u32,
    #[values(ByteOrder::BigEndian, ByteOrder::LittleEndian)] order: ByteOrder,
) {
    let original = mesh(index_bits);
    let format = binary(order);
    let read = decode(&format, &encode(&format, &original));
    assert_eq!(read.header(), original.header());
    assert_eq!(read.triangles(), original.triangles());
    assert!(read.approx_eq(&original));
}

#[rstest]
fn test_text_to_binary_and_back(
    #[values(8, 16, 32, 64)] index_bits: u32,
    #[values(ByteOrder::BigEndian, ByteOrder::LittleEndian)] order: ByteOrder,
) {
    let original = mesh(index_bits);
    let text = TextFormat::new();
    let binary = binary(order);

    let from_text = decode(&text, &encode(&text, &original));
    let from_binary = decode(&binary, &encode(&binary, &from_text));
    let back = decode(&text, &encode(&text, &from_binary));
    assert!(back.approx_eq(&original));
    assert_eq!(back.metadata(), original.metadata());
}

#[test]
fn test_second_pass_is_identical() {
    let text = TextFormat::new();
    let binary = binary(ByteOrder::LittleEndian);

    let first = encode(&binary, &decode(&text, &encode(&text, &mesh(16))));
    let second = encode(&binary, &decode(&binary, &first));
    assert_eq!(first, second);

    let first = encode(&text, &decode(&binary, &first));
    let second = encode(&text, &decode(&text, &first));
    assert_eq!(first, second);
}
