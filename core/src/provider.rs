//! The contract every codec implements.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::ProviderError;
use crate::layout::FormatVersion;
use crate::logged::Logged;
use crate::protocol::{ParserEvents, Serializer};

/// Identity of a concrete encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescription {
    /// Short unique name, such as `smft`.
    pub name: &'static str,
    /// File name suffix without the dot.
    pub suffix: &'static str,
    pub mime_type: &'static str,
    pub description: &'static str,
    /// Whether the encoding allows seeking to sections without reading
    /// everything before them.
    pub random_access: bool,
}

impl fmt::Display for FormatDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, .{})", self.name, self.mime_type, self.suffix)
    }
}

/// One parse session over a byte stream.
///
/// Created by [`FormatProvider::create_parser`] with its consumer already
/// attached.
pub trait SequentialParser {
    /// Read the whole stream, driving the consumer from `on_start` to
    /// `on_finish`. Data errors are delivered to the consumer, never
    /// returned.
    fn parse(&mut self);
}

/// A codec: parser and serializer factories for one encoding.
///
/// Providers are stateless apart from their configuration and are shared
/// freely between sessions.
pub trait FormatProvider: Send + Sync {
    fn format(&self) -> FormatDescription;

    fn supported_versions(&self) -> BTreeSet<FormatVersion>;

    /// Default version for new serializers.
    fn highest_version(&self) -> Option<FormatVersion> {
        self.supported_versions().last().copied()
    }

    /// A parser reading `reader` and reporting to `events`.
    ///
    /// `source` names the stream in diagnostics.
    fn create_parser<'a>(
        &self,
        events: &'a mut dyn ParserEvents,
        source: Option<Arc<str>>,
        reader: Box<dyn Read + 'a>,
    ) -> Box<dyn SequentialParser + 'a>;

    /// A serializer writing `version` of this encoding to `writer`.
    fn create_serializer<'a>(
        &self,
        version: FormatVersion,
        destination: Option<Arc<str>>,
        writer: Box<dyn Write + 'a>,
    ) -> Result<Box<dyn Serializer + 'a>, ProviderError>;

    /// Recognize the leading bytes of `reader` and report the declared
    /// version. Reads as little as possible.
    fn probe(&self, reader: &mut dyn Read) -> Logged<FormatVersion>;
}

/// Reject versions a provider does not list.
pub fn check_version(provider: &dyn FormatProvider, version: FormatVersion) -> Result<(), ProviderError> {
    if provider.supported_versions().contains(&version) {
        Ok(())
    } else {
        Err(ProviderError::UnsupportedVersion {
            format: provider.format().name.to_owned(),
            version,
        })
    }
}
