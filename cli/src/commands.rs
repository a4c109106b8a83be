//! Command implementations.
//!
//! Every command writes its report to the given output and logs
//! diagnostics through `log`. Data errors in an input fail the command
//! after all of them have been logged.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use smf_binary::{BinaryFormat, BinaryOptions};
use smf_core::diagnostic::{ParseError, ParseWarning};
use smf_core::layout::{AttributeName, ByteOrder};
use smf_core::logged::Logged;
use smf_core::memory::{MemoryMesh, MemoryMeshProducer, serialize_mesh};
use smf_core::packing::{PackRequest, PackedMesh, PackedMeshes, PackingOptions};
use smf_core::protocol::{EventTrace, ParserEvents, TraceOptions};
use smf_core::provider::FormatProvider;
use smf_core::registry::{FormatRegistry, VersionProbed};
use smf_text::TextFormat;

use crate::args::Command;
use crate::error::{CliError, CliResult};

/// Buffer id used by the `pack` command.
const PACK_BUFFER: u32 = 0;

/// The registry of every encoding this tool knows.
///
/// `byte_order` is the vertex data byte order binary output is written in.
pub fn registry(byte_order: ByteOrder) -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    registry.register(TextFormat::new());
    registry.register(BinaryFormat::with_options(
        BinaryOptions::default().with_data_byte_order(byte_order),
    ));
    registry
}

/// Run one command, writing its report to `out`.
pub fn run(command: &Command, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Command::Formats => formats(&registry(ByteOrder::BigEndian), out),
        Command::Probe { file } => {
            let probed = probe_file(&registry(ByteOrder::BigEndian), file)?;
            writeln!(out, "{}: {} {}", file.display(), probed.format.name, probed.version)?;
            Ok(())
        }
        Command::Events { file, skip_values } => events(file, *skip_values, out),
        Command::Convert {
            input,
            output,
            format,
            byte_order,
        } => convert(input, output, format.as_deref(), (*byte_order).into()),
        Command::Pack {
            file,
            attributes,
            align,
            byte_order,
        } => {
            let options = PackingOptions::default()
                .with_byte_order((*byte_order).into())
                .with_alignment(*align);
            pack(file, attributes, options, out)
        }
    }
}

fn formats(registry: &FormatRegistry, out: &mut dyn Write) -> CliResult<()> {
    for provider in registry.providers() {
        let format = provider.format();
        let versions: Vec<String> = provider
            .supported_versions()
            .iter()
            .map(ToString::to_string)
            .collect();
        writeln!(out, "{format}")?;
        writeln!(out, "  {}", format.description)?;
        writeln!(out, "  versions: {}", versions.join(", "))?;
        writeln!(out, "  random access: {}", if format.random_access { "yes" } else { "no" })?;
    }
    Ok(())
}

fn open(path: &Path) -> CliResult<File> {
    File::open(path).map_err(|source| CliError::Open {
        path: path.to_owned(),
        source,
    })
}

/// Log every diagnostic. Returns the number of errors.
fn report(errors: &[ParseError], warnings: &[ParseWarning]) -> usize {
    for warning in warnings {
        log::warn!("{warning}");
    }
    for error in errors {
        log::error!("{error}");
    }
    errors.len()
}

fn check(path: &Path, errors: &[ParseError]) -> CliResult<()> {
    match report(errors, &[]) {
        0 => Ok(()),
        count => Err(CliError::DataErrors {
            path: path.to_owned(),
            count,
        }),
    }
}

/// Identify the encoding of a file by its content.
pub fn probe_file(registry: &FormatRegistry, path: &Path) -> CliResult<VersionProbed> {
    let probed = registry.probe(|| Ok(Box::new(File::open(path)?) as Box<dyn Read>));
    match probed.into_result() {
        Ok((probed, warnings)) => {
            report(&[], &warnings);
            log::debug!("{}: {} version {}", path.display(), probed.format.name, probed.version);
            Ok(probed)
        }
        Err((errors, warnings)) => {
            report(&errors, &warnings);
            Err(CliError::Unrecognized(path.to_owned()))
        }
    }
}

/// Parse a file with whichever provider recognizes it, feeding `events`.
pub fn parse_file(registry: &FormatRegistry, path: &Path, events: &mut dyn ParserEvents) -> CliResult<()> {
    let probed = probe_file(registry, path)?;
    let provider = registry
        .by_name(probed.format.name)
        .ok_or_else(|| CliError::UnknownFormat(probed.format.name.to_owned()))?;
    let reader = BufReader::new(open(path)?);
    let source: Arc<str> = Arc::from(path.display().to_string());
    provider.create_parser(events, Some(source), Box::new(reader)).parse();
    Ok(())
}

/// Log the diagnostics of a finished consumer and take its result.
fn finish<T>(path: &Path, result: Logged<T>) -> CliResult<T> {
    match result.into_result() {
        Ok((value, warnings)) => {
            report(&[], &warnings);
            Ok(value)
        }
        Err((errors, warnings)) => Err(CliError::DataErrors {
            path: path.to_owned(),
            count: report(&errors, &warnings),
        }),
    }
}

/// Parse a file into memory.
pub fn read_mesh(registry: &FormatRegistry, path: &Path) -> CliResult<MemoryMesh> {
    let mut producer = MemoryMeshProducer::new();
    parse_file(registry, path, &mut producer)?;
    finish(path, producer.into_mesh())
}

fn events(path: &Path, skip_values: bool, out: &mut dyn Write) -> CliResult<()> {
    let options = TraceOptions {
        values: !skip_values,
        ..TraceOptions::default()
    };
    let mut trace = EventTrace::with_options(options);
    parse_file(&registry(ByteOrder::BigEndian), path, &mut trace)?;

    for event in trace.events() {
        writeln!(out, "{event}")?;
    }
    for violation in trace.violations() {
        log::error!("{}: protocol order violation: {violation}", path.display());
    }
    check(path, trace.errors())
}

/// The provider `output` is written with: `--format` first, then the suffix.
fn output_provider<'r>(
    registry: &'r FormatRegistry,
    output: &Path,
    format: Option<&str>,
) -> CliResult<&'r dyn FormatProvider> {
    if let Some(name) = format {
        return registry
            .by_name(name)
            .ok_or_else(|| CliError::UnknownFormat(name.to_owned()));
    }
    output
        .extension()
        .and_then(|suffix| suffix.to_str())
        .and_then(|suffix| registry.by_suffix(suffix))
        .ok_or_else(|| CliError::NoOutputFormat(output.to_owned()))
}

/// Write a mesh to `output` in the newest version of the chosen encoding.
pub fn write_mesh(
    registry: &FormatRegistry,
    mesh: &MemoryMesh,
    output: &Path,
    format: Option<&str>,
) -> CliResult<()> {
    let provider = output_provider(registry, output, format)?;
    let Some(version) = provider.highest_version() else {
        return Err(CliError::UnknownFormat(provider.format().name.to_owned()));
    };
    let file = File::create(output).map_err(|source| CliError::Create {
        path: output.to_owned(),
        source,
    })?;
    let destination: Arc<str> = Arc::from(output.display().to_string());
    let mut serializer = provider.create_serializer(version, Some(destination), Box::new(BufWriter::new(file)))?;
    serialize_mesh(mesh, serializer.as_mut())?;
    log::info!("wrote {} {version} to {}", provider.format().name, output.display());
    Ok(())
}

fn convert(input: &Path, output: &Path, format: Option<&str>, byte_order: ByteOrder) -> CliResult<()> {
    let registry = registry(byte_order);
    // Resolve the output before reading so a bad name fails early.
    output_provider(&registry, output, format)?;
    let mesh = read_mesh(&registry, input)?;
    write_mesh(&registry, &mesh, output, format)
}

/// Pack a file into a single buffer holding `attributes`, or all of them.
pub fn pack_file(path: &Path, attributes: &[String], options: PackingOptions) -> CliResult<PackedMesh> {
    let request = if attributes.is_empty() {
        PackRequest::all(PACK_BUFFER)
    } else {
        let names = attributes
            .iter()
            .map(|name| AttributeName::new(name.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        PackRequest::attributes(PACK_BUFFER, names)
    };
    let mut packer = PackedMeshes::new(vec![request], options);
    parse_file(&registry(ByteOrder::BigEndian), path, &mut packer)?;
    finish(path, packer.into_mesh())
}

fn pack(path: &Path, attributes: &[String], options: PackingOptions, out: &mut dyn Write) -> CliResult<()> {
    let packed = pack_file(path, attributes, options)?;
    let vertex_count = packed.header().vertex_count();
    writeln!(out, "byte order: {:?}", packed.byte_order())?;
    for (id, buffer) in packed.buffers() {
        let configuration = buffer.configuration();
        writeln!(
            out,
            "buffer {id}: {vertex_count} vertices of {} octets, {} octets",
            configuration.vertex_size_octets(),
            configuration.buffer_size_octets(vertex_count)?
        )?;
        for packed_attribute in configuration.attributes_ordered() {
            writeln!(
                out,
                "  {:>4}  {}",
                packed_attribute.offset_octets(),
                packed_attribute.attribute()
            )?;
        }
    }
    let triangles = packed.triangles();
    writeln!(
        out,
        "triangles: {} of {}-bit indices, {} octets",
        triangles.triangles().triangle_count(),
        triangles.triangles().index_size_bits(),
        triangles.data().len()
    )?;
    Ok(())
}
