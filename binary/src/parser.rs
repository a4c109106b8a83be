use std::io::{BufReader, Read};
use std::sync::Arc;

use smf_core::diagnostic::{ParseError, ParseWarning};
use smf_core::layout::{ByteOrder, FormatVersion, Header};
use smf_core::logged::Logged;
use smf_core::protocol::{BodyEvents, ParserEvents};
use smf_core::provider::SequentialParser;

use crate::head::read_header;
use crate::io::BinaryReader;
use crate::sections::{self, Flow};
use crate::structures::{
    FileHeader, SECTION_END, SECTION_HEADER, SECTION_METADATA, SECTION_TRIANGLES,
    SECTION_VERTICES, SectionHeader, section_name,
};

/// The only major version this parser reads.
pub const SUPPORTED_MAJOR: u32 = 2;

/// Newest minor version whose content this parser knows.
pub const SUPPORTED_MINOR: u32 = 0;

/// Read the file header and check its magic number.
pub fn file_header<R: Read>(reader: &mut BinaryReader<R>) -> Result<FormatVersion, ParseError> {
    let header = FileHeader::from_bytes(&reader.read_array()?);
    if !header.has_magic() {
        return Err(reader.error_at(0, "Not an SMF binary file; the magic number does not match"));
    }
    Ok(header.version())
}

fn check_major<R: Read>(reader: &BinaryReader<R>, version: FormatVersion) -> Result<(), ParseError> {
    if version.major == SUPPORTED_MAJOR {
        Ok(())
    } else {
        Err(reader.error_at(
            8,
            format!(
                "Unsupported format version {version}; this parser reads major version {SUPPORTED_MAJOR}"
            ),
        ))
    }
}

fn section_header<R: Read>(reader: &mut BinaryReader<R>) -> Result<SectionHeader, ParseError> {
    reader.read_array().map(|bytes| SectionHeader::from_bytes(&bytes))
}

/// Recognize a binary stream from its file header.
pub fn probe(reader: &mut dyn Read) -> Logged<FormatVersion> {
    let mut reader = BinaryReader::new(reader, None);
    match file_header(&mut reader).and_then(|version| {
        check_major(&reader, version)?;
        Ok(version)
    }) {
        Ok(version) => Logged::succeeded(version),
        Err(e) => Logged::failed_with(e),
    }
}

/// One parse session over an `smfb` stream.
pub struct BinaryParser<'a> {
    events: &'a mut dyn ParserEvents,
    reader: BinaryReader<BufReader<Box<dyn Read + 'a>>>,
}

impl<'a> BinaryParser<'a> {
    pub fn new(events: &'a mut dyn ParserEvents, source: Option<Arc<str>>, reader: Box<dyn Read + 'a>) -> Self {
        Self {
            events,
            reader: BinaryReader::new(BufReader::new(reader), source),
        }
    }

    fn parse_stream(&mut self) {
        let version = match file_header(&mut self.reader) {
            Ok(version) => version,
            Err(e) => {
                self.events.on_error(e);
                return;
            }
        };
        if let Err(e) = check_major(&self.reader, version) {
            self.events.on_error(e);
            return;
        }
        if version.minor > SUPPORTED_MINOR {
            let message = format!(
                "Format version {version} is newer than {SUPPORTED_MAJOR}.{SUPPORTED_MINOR}; unrecognized sections will be skipped"
            );
            log::warn!("{message}");
            self.events
                .on_warning(ParseWarning::new(self.reader.position_at(8), message));
        }
        log::debug!("smfb version {version}");

        let Some(header_events) = self.events.on_version_received(version) else {
            return;
        };
        let section = match section_header(&mut self.reader) {
            Ok(section) => section,
            Err(e) => {
                header_events.on_error(e);
                return;
            }
        };
        if section.id() != SECTION_HEADER {
            header_events.on_error(self.reader.error(format!(
                "Expected section '{}', got '{}'",
                section_name(SECTION_HEADER),
                section_name(section.id())
            )));
            return;
        }
        let (header, order) = match read_header(&mut self.reader, section.size()) {
            Ok(read) => read,
            Err(errors) => {
                for e in errors {
                    header_events.on_error(e);
                }
                return;
            }
        };
        log::debug!(
            "smfb header: {} vertices, {} triangles, {:?} vertex data",
            header.vertex_count(),
            header.triangles().triangle_count(),
            order
        );
        let Some(body) = header_events.on_header_parsed(&header) else {
            return;
        };
        parse_body(&mut self.reader, &header, order, body);
    }
}

impl SequentialParser for BinaryParser<'_> {
    fn parse(&mut self) {
        self.events.on_start();
        self.parse_stream();
        self.events.on_finish();
    }
}

fn parse_body<R: Read>(reader: &mut BinaryReader<R>, header: &Header, order: ByteOrder, body: &mut dyn BodyEvents) {
    let mut seen_vertices = false;
    let mut seen_triangles = false;

    loop {
        let section = match section_header(reader) {
            Ok(section) => section,
            Err(e) => {
                body.on_error(e);
                return;
            }
        };
        let (id, size) = (section.id(), section.size());
        let Some(end) = reader.offset().checked_add(size) else {
            body.on_error(reader.error(format!(
                "Section '{}' size {size} is out of range",
                section_name(id)
            )));
            return;
        };
        log::trace!("section {} at {} ({size} octets)", section_name(id), reader.offset());

        let flow = match id {
            SECTION_END => break,
            SECTION_VERTICES if seen_vertices => sections::skip_repeated(reader, id, body),
            SECTION_VERTICES => {
                seen_vertices = true;
                sections::vertices(reader, header, order, id, size, body)
            }
            SECTION_TRIANGLES if seen_triangles => sections::skip_repeated(reader, id, body),
            SECTION_TRIANGLES => {
                seen_triangles = true;
                sections::triangles(reader, header, id, size, body)
            }
            SECTION_METADATA => sections::metadata(reader, id, size, body),
            SECTION_HEADER => sections::skip_repeated(reader, id, body),
            _ => sections::skip_unknown(reader, id, body),
        };
        if flow == Flow::Stop {
            return;
        }
        if let Err(e) = reader.skip_to(end) {
            body.on_error(e);
            return;
        }
    }

    let vertex_count = header.vertex_count();
    if !seen_vertices && vertex_count > 0 {
        body.on_error(reader.error(format!(
            "A non-zero vertex count ({vertex_count}) was specified, but no vertices were provided"
        )));
    }
    let triangle_count = header.triangles().triangle_count();
    if !seen_triangles && triangle_count > 0 {
        body.on_error(reader.error(format!(
            "A non-zero triangle count ({triangle_count}) was specified, but no triangles were provided"
        )));
    }
}
