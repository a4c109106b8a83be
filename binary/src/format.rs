use std::collections::BTreeSet;
use std::io::{BufWriter, Read, Write};
use std::sync::Arc;

use smf_core::error::ProviderError;
use smf_core::layout::{ByteOrder, FormatVersion};
use smf_core::logged::Logged;
use smf_core::protocol::{ParserEvents, Serializer};
use smf_core::provider::{FormatDescription, FormatProvider, SequentialParser, check_version};

use crate::parser::{self, BinaryParser};
use crate::serializer::BinarySerializer;

pub const FORMAT: FormatDescription = FormatDescription {
    name: "smfb",
    suffix: "smfb",
    mime_type: "application/vnd.io7m.smf",
    description: "A section-based binary encoding of SMF meshes.",
    random_access: true,
};

/// Serializer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryOptions {
    /// Byte order of vertex data. Structure fields and triangle indices are
    /// always big-endian.
    pub data_byte_order: ByteOrder,
}

impl BinaryOptions {
    pub fn with_data_byte_order(mut self, data_byte_order: ByteOrder) -> Self {
        self.data_byte_order = data_byte_order;
        self
    }
}

/// Provider for the `smfb` encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryFormat {
    options: BinaryOptions,
}

impl BinaryFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BinaryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> BinaryOptions {
        self.options
    }
}

impl FormatProvider for BinaryFormat {
    fn format(&self) -> FormatDescription {
        FORMAT
    }

    fn supported_versions(&self) -> BTreeSet<FormatVersion> {
        BTreeSet::from([FormatVersion::new(2, 0)])
    }

    fn create_parser<'a>(
        &self,
        events: &'a mut dyn ParserEvents,
        source: Option<Arc<str>>,
        reader: Box<dyn Read + 'a>,
    ) -> Box<dyn SequentialParser + 'a> {
        Box::new(BinaryParser::new(events, source, reader))
    }

    fn create_serializer<'a>(
        &self,
        version: FormatVersion,
        destination: Option<Arc<str>>,
        writer: Box<dyn Write + 'a>,
    ) -> Result<Box<dyn Serializer + 'a>, ProviderError> {
        check_version(self, version)?;
        log::debug!(
            "smfb serializer {version} ({:?} vertex data) for {}",
            self.options.data_byte_order,
            destination.as_deref().unwrap_or("<stream>")
        );
        Ok(Box::new(BinarySerializer::new(
            version,
            self.options,
            BufWriter::new(writer),
        )?))
    }

    fn probe(&self, reader: &mut dyn Read) -> Logged<FormatVersion> {
        parser::probe(reader)
    }
}
