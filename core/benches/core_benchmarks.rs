use criterion::{Criterion, black_box, criterion_group, criterion_main};

use smf_core::layout::{
    Attribute, AttributeName, ByteOrder, FormatVersion, Header, TriangleBlock,
};
use smf_core::packing::encoding::{decode_value, encode_value};
use smf_core::packing::{PackRequest, PackedMeshes, PackingConfiguration, PackingOptions};
use smf_core::protocol::{AttributeValue, ParserEvents};

fn name(s: &str) -> AttributeName {
    AttributeName::new(s).unwrap()
}

fn attributes() -> Vec<Attribute> {
    vec![
        Attribute::float(name("position"), 3, 32).unwrap(),
        Attribute::float(name("normal"), 3, 16).unwrap(),
        Attribute::float(name("uv"), 2, 32).unwrap(),
        Attribute::unsigned(name("joints"), 4, 8).unwrap(),
        Attribute::float(name("weights"), 4, 16).unwrap(),
    ]
}

// ---------------------------------------------------------------------------
// Packing configuration
// ---------------------------------------------------------------------------

fn bench_configuration_build(c: &mut Criterion) {
    let attributes = attributes();
    c.bench_function("packing_configuration_build_5", |b| {
        b.iter(|| PackingConfiguration::build(black_box(&attributes)));
    });
}

fn bench_configuration_build_aligned(c: &mut Criterion) {
    let attributes = attributes();
    c.bench_function("packing_configuration_build_aligned_5", |b| {
        b.iter(|| PackingConfiguration::build_aligned(black_box(&attributes), black_box(4)));
    });
}

fn bench_offset_lookup(c: &mut Criterion) {
    let config = PackingConfiguration::build(&attributes()).unwrap();
    c.bench_function("packing_offset_for_index", |b| {
        b.iter(|| config.offset_octets_for_index(black_box(3), black_box(100_000)));
    });
}

// ---------------------------------------------------------------------------
// Component encoding
// ---------------------------------------------------------------------------

fn bench_encode_float3(c: &mut Criterion) {
    let attribute = Attribute::float(name("p"), 3, 32).unwrap();
    let value = AttributeValue::float(&[1.0, 2.0, 3.0]).unwrap();
    let mut out = [0u8; 12];
    c.bench_function("encode_float3_32_le", |b| {
        b.iter(|| {
            encode_value(
                black_box(&value),
                &attribute,
                ByteOrder::LittleEndian,
                &mut out,
            )
        });
    });
}

fn bench_decode_half4(c: &mut Criterion) {
    let attribute = Attribute::float(name("w"), 4, 16).unwrap();
    let bytes = [0x3cu8, 0x00, 0x38, 0x00, 0x34, 0x00, 0x00, 0x00];
    c.bench_function("decode_float4_16_be", |b| {
        b.iter(|| decode_value(black_box(&bytes), &attribute, ByteOrder::BigEndian));
    });
}

// ---------------------------------------------------------------------------
// Streaming pack
// ---------------------------------------------------------------------------

fn bench_pack_mesh(c: &mut Criterion) {
    const VERTICES: u64 = 10_000;
    let header = Header::builder()
        .with_vertex_count(VERTICES)
        .with_triangles(TriangleBlock::new(0, 32).unwrap())
        .with_attributes(attributes())
        .build()
        .unwrap();
    let position = AttributeValue::float(&[0.5, 1.5, -2.0]).unwrap();

    c.bench_function("pack_position_column_10k", |b| {
        b.iter(|| {
            let mut packer = PackedMeshes::new(
                vec![PackRequest::attributes(0, [name("position")])],
                PackingOptions::default(),
            );
            packer.on_start();
            if let Some(h) = packer.on_version_received(FormatVersion::new(1, 0))
                && let Some(body) = h.on_header_parsed(&header)
                && let Some(attrs) = body.on_attributes_non_interleaved()
            {
                let attribute = &header.attributes_in_order()[0];
                if let Some(values) = attrs.on_data_attribute_start(attribute) {
                    for _ in 0..VERTICES {
                        values.on_value(black_box(&position));
                    }
                }
                attrs.on_data_attribute_value_finish(attribute);
                attrs.on_data_attributes_non_interleaved_finish();
            }
            packer.on_finish();
            black_box(packer)
        });
    });
}

criterion_group!(
    benches,
    bench_configuration_build,
    bench_configuration_build_aligned,
    bench_offset_lookup,
    bench_encode_float3,
    bench_decode_half4,
    bench_pack_mesh,
);

criterion_main!(benches);
