use std::collections::BTreeSet;
use std::io::{BufWriter, Read, Write};
use std::sync::Arc;

use smf_core::error::ProviderError;
use smf_core::layout::FormatVersion;
use smf_core::logged::Logged;
use smf_core::protocol::{ParserEvents, Serializer};
use smf_core::provider::{FormatDescription, FormatProvider, SequentialParser, check_version};

use crate::parser::{self, TextParser};
use crate::serializer::TextSerializer;

pub const FORMAT: FormatDescription = FormatDescription {
    name: "smft",
    suffix: "smft",
    mime_type: "text/vnd.io7m.smf",
    description: "A line-oriented text encoding of SMF meshes.",
    random_access: false,
};

/// Provider for the `smft` encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormat;

impl TextFormat {
    pub fn new() -> Self {
        Self
    }
}

impl FormatProvider for TextFormat {
    fn format(&self) -> FormatDescription {
        FORMAT
    }

    fn supported_versions(&self) -> BTreeSet<FormatVersion> {
        BTreeSet::from([FormatVersion::new(1, 0)])
    }

    fn create_parser<'a>(
        &self,
        events: &'a mut dyn ParserEvents,
        source: Option<Arc<str>>,
        reader: Box<dyn Read + 'a>,
    ) -> Box<dyn SequentialParser + 'a> {
        Box::new(TextParser::new(events, source, reader))
    }

    fn create_serializer<'a>(
        &self,
        version: FormatVersion,
        destination: Option<Arc<str>>,
        writer: Box<dyn Write + 'a>,
    ) -> Result<Box<dyn Serializer + 'a>, ProviderError> {
        check_version(self, version)?;
        log::debug!(
            "smft serializer {version} for {}",
            destination.as_deref().unwrap_or("<stream>")
        );
        Ok(Box::new(TextSerializer::new(version, BufWriter::new(writer))?))
    }

    fn probe(&self, reader: &mut dyn Read) -> Logged<FormatVersion> {
        parser::probe(reader)
    }
}
