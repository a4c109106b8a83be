//! A consumer that records every protocol event.
//!
//! [`EventTrace`] accepts (or, if configured, declines) each stage, keeps a
//! one-line description of every call, and checks the call order as it
//! goes: starts matched by finishes, attributes in header order, value and
//! triangle counts as declared once no data error was reported. It backs
//! the `events` command of the CLI and the protocol conformance tests of
//! every codec.

use crate::diagnostic::{ParseError, ParseWarning};
use crate::layout::{Attribute, FormatVersion, Header, SchemaIdentifier};
use crate::protocol::{
    AttributeValue, AttributesEvents, BodyEvents, Diagnostics, HeaderEvents, MetaEvents,
    ParserEvents, TrianglesEvents, ValuesEvents,
};

/// Which stages an [`EventTrace`] accepts when offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOptions {
    pub header: bool,
    pub body: bool,
    pub vertices: bool,
    pub values: bool,
    pub triangles: bool,
    pub metadata: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            header: true,
            body: true,
            vertices: true,
            values: true,
            triangles: true,
            metadata: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Session,
    Attributes,
    Attribute(usize),
    Triangles,
}

/// Recording and order-checking consumer.
#[derive(Debug, Default)]
pub struct EventTrace {
    options: TraceOptions,
    events: Vec<String>,
    violations: Vec<String>,
    errors: Vec<ParseError>,
    warnings: Vec<ParseWarning>,
    header: Option<Header>,
    open: Vec<Open>,
    next_attribute: usize,
    values_received: u64,
    triangles_received: u64,
    finished: bool,
}

impl EventTrace {
    /// A trace that accepts every stage.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TraceOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// One line per event, in call order.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Order problems noticed while recording. Empty for a conforming codec.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    fn record(&mut self, event: String) {
        log::debug!("event: {event}");
        self.events.push(event);
    }

    fn violation(&mut self, message: String) {
        log::error!("protocol order violation: {message}");
        self.violations.push(message);
    }

    fn expect_open(&mut self, expected: Open, event: &str) {
        if self.open.last() != Some(&expected) {
            let open = self.open.last().copied();
            self.violation(format!("{event} while {open:?} is open, expected {expected:?}"));
        }
    }

    fn close(&mut self, expected: Open, event: &str) {
        self.expect_open(expected, event);
        if self.open.last() == Some(&expected) {
            self.open.pop();
        }
    }

    // After a data error a codec legitimately delivers less than declared.
    fn counts_checked(&self) -> bool {
        self.errors.is_empty()
    }

    fn vertex_count(&self) -> u64 {
        self.header.as_ref().map_or(0, Header::vertex_count)
    }
}

impl Diagnostics for EventTrace {
    fn on_warning(&mut self, warning: ParseWarning) {
        self.record(format!("warning {warning}"));
        self.warnings.push(warning);
    }

    fn on_error(&mut self, error: ParseError) {
        self.record(format!("error {error}"));
        self.errors.push(error);
    }
}

impl ParserEvents for EventTrace {
    fn on_start(&mut self) {
        if !self.events.is_empty() {
            self.violation("on_start is not the first call".to_owned());
        }
        self.record("start".to_owned());
        self.open.push(Open::Session);
    }

    fn on_version_received(&mut self, version: FormatVersion) -> Option<&mut dyn HeaderEvents> {
        self.expect_open(Open::Session, "on_version_received");
        self.record(format!("version {version}"));
        if self.options.header {
            Some(self)
        } else {
            None
        }
    }

    fn on_finish(&mut self) {
        self.close(Open::Session, "on_finish");
        if !self.open.is_empty() {
            let open = self.open.clone();
            self.violation(format!("on_finish with unfinished stages {open:?}"));
        }
        if self.finished {
            self.violation("on_finish called twice".to_owned());
        }
        self.finished = true;
        self.record("finish".to_owned());
    }
}

impl HeaderEvents for EventTrace {
    fn on_header_parsed(&mut self, header: &Header) -> Option<&mut dyn BodyEvents> {
        if self.header.is_some() {
            self.violation("on_header_parsed called twice".to_owned());
        }
        self.record(format!(
            "header vertices={} triangles={}/{} attributes={}",
            header.vertex_count(),
            header.triangles().triangle_count(),
            header.triangles().index_size_bits(),
            header.attributes_in_order().len()
        ));
        self.header = Some(header.clone());
        if self.options.body { Some(self) } else { None }
    }
}

impl BodyEvents for EventTrace {
    fn on_attributes_non_interleaved(&mut self) -> Option<&mut dyn AttributesEvents> {
        self.expect_open(Open::Session, "on_attributes_non_interleaved");
        self.record("vertices-non-interleaved".to_owned());
        if self.options.vertices {
            self.open.push(Open::Attributes);
            self.next_attribute = 0;
            Some(self)
        } else {
            None
        }
    }

    fn on_triangles(&mut self) -> Option<&mut dyn TrianglesEvents> {
        self.expect_open(Open::Session, "on_triangles");
        self.record("triangles".to_owned());
        if self.options.triangles {
            self.open.push(Open::Triangles);
            self.triangles_received = 0;
            Some(self)
        } else {
            None
        }
    }

    fn on_meta(&mut self, schema: &SchemaIdentifier) -> Option<&mut dyn MetaEvents> {
        self.expect_open(Open::Session, "on_meta");
        self.record(format!("meta {schema}"));
        if self.options.metadata { Some(self) } else { None }
    }
}

impl AttributesEvents for EventTrace {
    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Option<&mut dyn ValuesEvents> {
        self.expect_open(Open::Attributes, "on_data_attribute_start");
        let expected = self
            .header
            .as_ref()
            .and_then(|h| h.attributes_in_order().get(self.next_attribute))
            .map(|a| a.name().clone());
        if expected.as_ref() != Some(attribute.name()) {
            self.violation(format!(
                "attribute '{}' delivered, expected {expected:?}",
                attribute.name()
            ));
        }
        self.record(format!("attribute-start {attribute}"));
        self.open.push(Open::Attribute(self.next_attribute));
        self.next_attribute += 1;
        self.values_received = 0;
        if self.options.values { Some(self) } else { None }
    }

    fn on_data_attribute_value_finish(&mut self, attribute: &Attribute) {
        match self.open.last().copied() {
            Some(Open::Attribute(_)) => {
                self.open.pop();
            }
            other => self.violation(format!(
                "on_data_attribute_value_finish while {other:?} is open"
            )),
        }
        if self.counts_checked() && self.options.values && self.values_received != self.vertex_count() {
            let (received, expected) = (self.values_received, self.vertex_count());
            self.violation(format!(
                "attribute '{}' received {received} values, expected {expected}",
                attribute.name()
            ));
        }
        self.record(format!("attribute-finish {}", attribute.name()));
    }

    fn on_data_attributes_non_interleaved_finish(&mut self) {
        self.close(Open::Attributes, "on_data_attributes_non_interleaved_finish");
        let declared = self
            .header
            .as_ref()
            .map_or(0, |h| h.attributes_in_order().len());
        if self.counts_checked() && self.next_attribute != declared {
            let delivered = self.next_attribute;
            self.violation(format!(
                "{delivered} attributes delivered, header declares {declared}"
            ));
        }
        self.record("vertices-finish".to_owned());
    }
}

impl ValuesEvents for EventTrace {
    fn on_value(&mut self, value: &AttributeValue) {
        match self.open.last().copied() {
            Some(Open::Attribute(index)) => {
                let attribute = self
                    .header
                    .as_ref()
                    .and_then(|h| h.attributes_in_order().get(index))
                    .cloned();
                if let Some(attribute) = attribute
                    && let Err(e) = value.check_shape(&attribute)
                {
                    self.violation(e.to_string());
                }
            }
            other => self.violation(format!("on_value while {other:?} is open")),
        }
        self.values_received += 1;
        self.record(format!("value {value}"));
    }
}

impl TrianglesEvents for EventTrace {
    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        self.expect_open(Open::Triangles, "on_data_triangle");
        self.triangles_received += 1;
        self.record(format!("triangle {v0} {v1} {v2}"));
    }

    fn on_data_triangles_finish(&mut self) {
        self.close(Open::Triangles, "on_data_triangles_finish");
        let expected = self
            .header
            .as_ref()
            .map_or(0, |h| h.triangles().triangle_count());
        if self.counts_checked() && self.triangles_received != expected {
            let received = self.triangles_received;
            self.violation(format!("{received} triangles delivered, expected {expected}"));
        }
        self.record("triangles-finish".to_owned());
    }
}

impl MetaEvents for EventTrace {
    fn on_meta_data(&mut self, schema: &SchemaIdentifier, data: &[u8]) {
        self.record(format!("meta-data {schema} {} octets", data.len()));
    }
}
