use std::collections::HashMap;
use std::io::{self, Read};

use crate::diagnostic::ParseError;
use crate::layout::FormatVersion;
use crate::logged::Logged;
use crate::provider::{FormatDescription, FormatProvider};

/// The outcome of a successful probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProbed {
    pub format: FormatDescription,
    pub version: FormatVersion,
}

/// Registered codecs, looked up by name, suffix or MIME type.
///
/// Built once by the caller at startup and passed to whatever needs it.
/// Probing tries providers in registration order.
///
/// # Example
///
/// ```ignore
/// let mut registry = FormatRegistry::new();
/// registry.register(TextFormat::new());
/// registry.register(BinaryFormat::new());
///
/// let provider = registry.by_suffix("smfb").unwrap();
/// let probed = registry.probe(|| Ok(Box::new(File::open("mesh.smfb")?) as Box<dyn Read>));
/// ```
#[derive(Default)]
pub struct FormatRegistry {
    providers: Vec<Box<dyn FormatProvider>>,
    by_name: HashMap<&'static str, usize>,
    by_suffix: HashMap<&'static str, usize>,
    by_mime_type: HashMap<&'static str, usize>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    ///
    /// Replaces any previously registered provider with the same name.
    pub fn register(&mut self, provider: impl FormatProvider + 'static) {
        let format = provider.format();
        log::debug!("registering format provider {format}");
        let index = match self.by_name.get(format.name) {
            Some(&index) => {
                let replaced = self.providers[index].format();
                if self.by_suffix.get(replaced.suffix) == Some(&index) {
                    self.by_suffix.remove(replaced.suffix);
                }
                if self.by_mime_type.get(replaced.mime_type) == Some(&index) {
                    self.by_mime_type.remove(replaced.mime_type);
                }
                self.providers[index] = Box::new(provider);
                index
            }
            None => {
                self.providers.push(Box::new(provider));
                self.providers.len() - 1
            }
        };
        self.by_name.insert(format.name, index);
        self.by_suffix.insert(format.suffix, index);
        self.by_mime_type.insert(format.mime_type, index);
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn FormatProvider> {
        self.by_name.get(name).map(|&i| self.providers[i].as_ref())
    }

    /// Look up by file suffix, without the leading dot.
    pub fn by_suffix(&self, suffix: &str) -> Option<&dyn FormatProvider> {
        self.by_suffix.get(suffix).map(|&i| self.providers[i].as_ref())
    }

    pub fn by_mime_type(&self, mime_type: &str) -> Option<&dyn FormatProvider> {
        self.by_mime_type.get(mime_type).map(|&i| self.providers[i].as_ref())
    }

    /// Providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = &dyn FormatProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Find the format and version of a stream.
    ///
    /// `open` is called once per provider tried, each time returning a fresh
    /// stream positioned at the start. The first provider that recognizes
    /// the stream wins. Otherwise the result carries one error per provider,
    /// or a single error if the stream could not be opened.
    pub fn probe<F>(&self, mut open: F) -> Logged<VersionProbed>
    where
        F: FnMut() -> io::Result<Box<dyn Read>>,
    {
        if self.providers.is_empty() {
            return Logged::failed_with(ParseError::message("No format providers available."));
        }

        let mut errors = Vec::new();
        for provider in &self.providers {
            let format = provider.format();
            let mut stream = match open() {
                Ok(stream) => stream,
                Err(e) => {
                    return Logged::failed_with(
                        ParseError::message(format!("Could not open stream: {e}")).with_cause(e),
                    );
                }
            };

            match provider.probe(stream.as_mut()) {
                Logged::Succeeded { value, warnings } => {
                    log::debug!("{} recognized the stream as version {value}", format.name);
                    return Logged::succeeded_with_warnings(
                        VersionProbed {
                            format,
                            version: value,
                        },
                        warnings,
                    );
                }
                Logged::Failed { errors: failures, .. } => {
                    log::trace!("{} did not recognize the stream", format.name);
                    if failures.is_empty() {
                        errors.push(ParseError::message(format!(
                            "{}: stream not recognized",
                            format.name
                        )));
                    }
                    errors.extend(failures.into_iter().map(|mut e| {
                        e.message = format!("{}: {}", format.name, e.message);
                        e
                    }));
                }
            }
        }
        Logged::failed(errors, Vec::new())
    }
}
