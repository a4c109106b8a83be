use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

use smf_core::diagnostic::{ParseError, ParseWarning};
use smf_core::layout::{FormatVersion, Header};
use smf_core::logged::Logged;
use smf_core::protocol::{BodyEvents, ParserEvents};
use smf_core::provider::SequentialParser;

use crate::header::{number, parse_header};
use crate::lines::LineReader;
use crate::sections::{self, Flow, SECTION_METADATA, SECTION_TRIANGLES, SECTION_VERTICES};

/// The only major version this parser reads.
pub const SUPPORTED_MAJOR: u32 = 1;

/// Newest minor version whose content this parser knows.
pub const SUPPORTED_MINOR: u32 = 0;

/// Read the `smf <major> <minor>` line.
pub fn version_line<R: BufRead>(lines: &mut LineReader<R>) -> Result<FormatVersion, ParseError> {
    let tokens = lines.require_tokens()?;
    let [magic, major, minor] = tokens.as_slice() else {
        return Err(lines.error(format!(
            "Malformed version line; expected 'smf <major> <minor>', got '{}'",
            tokens.join(" ")
        )));
    };
    if magic != "smf" {
        return Err(lines.error(format!(
            "Not an SMF text file; expected 'smf <major> <minor>', got '{}'",
            tokens.join(" ")
        )));
    }
    Ok(FormatVersion::new(
        number(lines, "major version", major)?,
        number(lines, "minor version", minor)?,
    ))
}

fn check_major<R: BufRead>(lines: &LineReader<R>, version: FormatVersion) -> Result<(), ParseError> {
    if version.major == SUPPORTED_MAJOR {
        Ok(())
    } else {
        Err(lines.error(format!(
            "Unsupported format version {version}; this parser reads major version {SUPPORTED_MAJOR}"
        )))
    }
}

/// Recognize a text stream from its first line.
pub fn probe(reader: &mut dyn Read) -> Logged<FormatVersion> {
    let mut lines = LineReader::new(BufReader::new(reader), None);
    match version_line(&mut lines).and_then(|version| {
        check_major(&lines, version)?;
        Ok(version)
    }) {
        Ok(version) => Logged::succeeded(version),
        Err(e) => Logged::failed_with(e),
    }
}

/// One parse session over an `smft` stream.
pub struct TextParser<'a> {
    events: &'a mut dyn ParserEvents,
    lines: LineReader<BufReader<Box<dyn Read + 'a>>>,
}

impl<'a> TextParser<'a> {
    pub fn new(events: &'a mut dyn ParserEvents, source: Option<Arc<str>>, reader: Box<dyn Read + 'a>) -> Self {
        Self {
            events,
            lines: LineReader::new(BufReader::new(reader), source),
        }
    }

    fn parse_stream(&mut self) {
        let version = match version_line(&mut self.lines) {
            Ok(version) => version,
            Err(e) => {
                self.events.on_error(e);
                return;
            }
        };
        if let Err(e) = check_major(&self.lines, version) {
            self.events.on_error(e);
            return;
        }
        if version.minor > SUPPORTED_MINOR {
            let message = format!(
                "Format version {version} is newer than {SUPPORTED_MAJOR}.{SUPPORTED_MINOR}; unrecognized content will be skipped"
            );
            log::warn!("{message}");
            self.events
                .on_warning(ParseWarning::new(self.lines.position(), message));
        }
        log::debug!("smft version {version}");

        let Some(header_events) = self.events.on_version_received(version) else {
            return;
        };
        let Some(header) = parse_header(&mut self.lines, header_events) else {
            return;
        };
        let Some(body) = header_events.on_header_parsed(&header) else {
            return;
        };
        parse_body(&mut self.lines, &header, body);
    }
}

impl SequentialParser for TextParser<'_> {
    fn parse(&mut self) {
        self.events.on_start();
        self.parse_stream();
        self.events.on_finish();
    }
}

fn parse_body<R: BufRead>(lines: &mut LineReader<R>, header: &Header, body: &mut dyn BodyEvents) {
    let mut seen_vertices = false;
    let mut seen_triangles = false;

    loop {
        let tokens = match lines.next_tokens() {
            Ok(Some(tokens)) => tokens,
            Ok(None) => break,
            Err(e) => {
                body.on_error(e);
                return;
            }
        };

        let flow = match tokens[0].as_str() {
            SECTION_VERTICES if seen_vertices => sections::skip_repeated(lines, &tokens, body),
            SECTION_VERTICES => {
                seen_vertices = true;
                sections::vertices(lines, header, &tokens, body)
            }
            SECTION_TRIANGLES if seen_triangles => sections::skip_repeated(lines, &tokens, body),
            SECTION_TRIANGLES => {
                seen_triangles = true;
                sections::triangles(lines, header, &tokens, body)
            }
            SECTION_METADATA => sections::metadata(lines, &tokens, body),
            _ => sections::skip_unknown(lines, &tokens, body),
        };
        if flow == Flow::Stop {
            return;
        }
    }

    let vertex_count = header.vertex_count();
    if !seen_vertices && vertex_count > 0 {
        body.on_error(lines.error(format!(
            "A non-zero vertex count ({vertex_count}) was specified, but no vertices were provided"
        )));
    }
    let triangle_count = header.triangles().triangle_count();
    if !seen_triangles && triangle_count > 0 {
        body.on_error(lines.error(format!(
            "A non-zero triangle count ({triangle_count}) was specified, but no triangles were provided"
        )));
    }
}
