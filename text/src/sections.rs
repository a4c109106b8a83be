//! Body sections.
//!
//! ```text
//! vertices-noninterleaved
//! attribute "<name>"
//! <value line> * vertex count
//! ...
//! end
//! triangles
//! <v0> <v1> <v2> * triangle count
//! end
//! metadata <schema> <major> <minor> <line count>
//! <base64 line> * line count
//! end
//! ```
//!
//! A data error inside a section skips the rest of it; parsing resumes at
//! the next section.

use std::io::BufRead;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;

use smf_core::diagnostic::{ParseError, ParseWarning};
use smf_core::layout::{Attribute, ComponentType, Header, TriangleBlock};
use smf_core::protocol::{
    AttributeValue, AttributesEvents, BodyEvents, Diagnostics, MetaEvents, TrianglesEvents,
    ValuesEvents,
};

use crate::header::{number, schema_identifier};
use crate::lines::{LineReader, is_end};

pub const SECTION_VERTICES: &str = "vertices-noninterleaved";
pub const SECTION_TRIANGLES: &str = "triangles";
pub const SECTION_METADATA: &str = "metadata";

/// Longest base64 line written in a metadata section.
pub const METADATA_LINE_LENGTH: usize = 72;

/// Whether the body loop can go on after a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// How a section stopped early. The error has already been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abort {
    /// Skip to the section's `end`.
    Skip,
    /// The section's `end` was read while more data was expected.
    Closed,
    /// Nothing more can be read.
    Eof,
}

fn recover<R, D>(lines: &mut LineReader<R>, receiver: &mut D, abort: Abort) -> Flow
where
    R: BufRead,
    D: Diagnostics + ?Sized,
{
    match abort {
        Abort::Closed => Flow::Continue,
        Abort::Eof => Flow::Stop,
        Abort::Skip => match lines.skip_until_end() {
            Ok(()) => Flow::Continue,
            Err(e) => {
                receiver.on_error(e);
                Flow::Stop
            }
        },
    }
}

fn finish<R, D>(lines: &mut LineReader<R>, receiver: &mut D, result: Result<(), Abort>) -> Flow
where
    R: BufRead,
    D: Diagnostics + ?Sized,
{
    match result {
        Ok(()) => Flow::Continue,
        Err(abort) => recover(lines, receiver, abort),
    }
}

fn next<R, D>(lines: &mut LineReader<R>, receiver: &mut D) -> Result<Vec<String>, Abort>
where
    R: BufRead,
    D: Diagnostics + ?Sized,
{
    lines.require_tokens().map_err(|e| {
        receiver.on_error(e);
        Abort::Eof
    })
}

fn report<D: Diagnostics + ?Sized>(receiver: &mut D, error: ParseError, abort: Abort) -> Abort {
    log::debug!("{error}");
    receiver.on_error(error);
    abort
}

/// Skip an unrecognized section, with a warning.
pub fn skip_unknown<R: BufRead>(lines: &mut LineReader<R>, tokens: &[String], body: &mut dyn BodyEvents) -> Flow {
    let message = format!(
        "Unrecognized section '{}'; expected one of: {SECTION_METADATA} | {SECTION_TRIANGLES} | {SECTION_VERTICES}",
        tokens[0]
    );
    log::warn!("{}: {message}", lines.position());
    body.on_warning(ParseWarning::new(lines.position(), message));
    recover(lines, body, Abort::Skip)
}

/// Report a section that may appear only once, and skip it.
pub fn skip_repeated<R: BufRead>(lines: &mut LineReader<R>, tokens: &[String], body: &mut dyn BodyEvents) -> Flow {
    let error = lines.error(format!("Section '{}' already specified", tokens[0]));
    let abort = report(body, error, Abort::Skip);
    recover(lines, body, abort)
}

fn expect_bare<R: BufRead>(lines: &LineReader<R>, tokens: &[String]) -> Result<(), ParseError> {
    if tokens.len() == 1 {
        Ok(())
    } else {
        Err(lines.error(format!(
            "Malformed '{}' section; expected '{}', got '{}'",
            tokens[0],
            tokens[0],
            tokens.join(" ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Vertices
// ---------------------------------------------------------------------------

pub fn vertices<R: BufRead>(
    lines: &mut LineReader<R>,
    header: &Header,
    tokens: &[String],
    body: &mut dyn BodyEvents,
) -> Flow {
    if let Err(e) = expect_bare(lines, tokens) {
        let abort = report(body, e, Abort::Skip);
        return recover(lines, body, abort);
    }
    let Some(receiver) = body.on_attributes_non_interleaved() else {
        log::debug!("vertex data declined, skipping");
        return recover(lines, body, Abort::Skip);
    };

    let result = attribute_columns(lines, header, receiver);
    let flow = finish(lines, receiver, result);
    receiver.on_data_attributes_non_interleaved_finish();
    flow
}

fn attribute_columns<R: BufRead>(
    lines: &mut LineReader<R>,
    header: &Header,
    receiver: &mut dyn AttributesEvents,
) -> Result<(), Abort> {
    let declared = header.attributes_in_order();
    let mut next_index = 0;

    loop {
        let tokens = next(lines, receiver)?;
        if is_end(&tokens) {
            break;
        }

        let attribute = attribute_command(lines, header, next_index, &tokens)
            .map_err(|e| report(receiver, e, Abort::Skip))?;
        next_index += 1;

        let result = match receiver.on_data_attribute_start(attribute) {
            Some(values) => attribute_values(lines, header.vertex_count(), attribute, values),
            None => skip_values(lines, header.vertex_count(), attribute, receiver),
        };
        receiver.on_data_attribute_value_finish(attribute);
        result?;
    }

    for attribute in &declared[next_index..] {
        receiver.on_error(lines.error(format!(
            "No data specified for attribute '{}'",
            attribute.name()
        )));
    }
    Ok(())
}

/// Resolve `attribute "<name>"`. Attributes must follow header order.
fn attribute_command<'h, R: BufRead>(
    lines: &LineReader<R>,
    header: &'h Header,
    next_index: usize,
    tokens: &[String],
) -> Result<&'h Attribute, ParseError> {
    let declared = header.attributes_in_order();
    let got = tokens.join(" ");

    let [command, name] = tokens else {
        return Err(lines.error(format!(
            "Malformed 'attribute' command; expected 'attribute <name>', got '{got}'"
        )));
    };
    if command != "attribute" {
        return Err(lines.error(format!(
            "Unrecognized command '{command}'; expected 'attribute <name>' or 'end'"
        )));
    }

    let Some(position) = declared.iter().position(|a| a.name().as_str() == name) else {
        let known: Vec<&str> = declared.iter().map(|a| a.name().as_str()).collect();
        return Err(lines.error(format!(
            "Unknown attribute. Expected one of: {}, got '{got}'",
            known.join(" ")
        )));
    };
    if position < next_index {
        let remaining: Vec<&str> = declared[next_index..].iter().map(|a| a.name().as_str()).collect();
        return Err(lines.error(format!(
            "Attribute already specified. Expected one of: {}, got '{got}'",
            remaining.join(" ")
        )));
    }
    if position > next_index {
        return Err(lines.error(format!(
            "Attribute out of order. Expected '{}', got '{got}'",
            declared[next_index].name()
        )));
    }
    Ok(&declared[position])
}

fn too_few_values(attribute: &Attribute, expected: u64, received: u64) -> String {
    format!(
        "Too few values for attribute '{}'; expected {expected}, got {received}",
        attribute.name()
    )
}

fn attribute_values<R: BufRead>(
    lines: &mut LineReader<R>,
    vertex_count: u64,
    attribute: &Attribute,
    receiver: &mut dyn ValuesEvents,
) -> Result<(), Abort> {
    for received in 0..vertex_count {
        let tokens = next(lines, receiver)?;
        if is_end(&tokens) {
            let error = lines.error(too_few_values(attribute, vertex_count, received));
            return Err(report(receiver, error, Abort::Closed));
        }
        let value = parse_value(lines, attribute, &tokens).map_err(|e| report(receiver, e, Abort::Skip))?;
        receiver.on_value(&value);
    }
    Ok(())
}

fn skip_values<R, D>(lines: &mut LineReader<R>, vertex_count: u64, attribute: &Attribute, receiver: &mut D) -> Result<(), Abort>
where
    R: BufRead,
    D: Diagnostics + ?Sized,
{
    for received in 0..vertex_count {
        let tokens = next(lines, receiver)?;
        if is_end(&tokens) {
            let error = lines.error(too_few_values(attribute, vertex_count, received));
            return Err(report(receiver, error, Abort::Closed));
        }
    }
    Ok(())
}

fn value_syntax(attribute: &Attribute) -> String {
    vec![format!("<{}>", attribute.component_type().name()); attribute.component_count() as usize].join(" ")
}

fn components<R, T>(lines: &LineReader<R>, tokens: &[String]) -> Result<Vec<T>, ParseError>
where
    R: BufRead,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    tokens.iter().map(|t| number(lines, "component", t)).collect()
}

/// Parse one value line for `attribute`.
pub fn parse_value<R: BufRead>(
    lines: &LineReader<R>,
    attribute: &Attribute,
    tokens: &[String],
) -> Result<AttributeValue, ParseError> {
    let count = attribute.component_count() as usize;
    if tokens.len() != count {
        return Err(lines.error(format!(
            "Cannot parse {count} element vector; expected '{}', got '{}'",
            value_syntax(attribute),
            tokens.join(" ")
        )));
    }

    let value = match attribute.component_type() {
        ComponentType::SignedInteger => AttributeValue::signed(&components::<R, i64>(lines, tokens)?),
        ComponentType::UnsignedInteger => {
            AttributeValue::unsigned(&components::<R, u64>(lines, tokens)?)
        }
        ComponentType::Float => AttributeValue::float(&components::<R, f64>(lines, tokens)?),
    }
    .map_err(|e| lines.error(e.to_string()))?;
    value
        .check_range(attribute)
        .map_err(|e| lines.error(e.to_string()))?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Triangles
// ---------------------------------------------------------------------------

pub fn triangles<R: BufRead>(
    lines: &mut LineReader<R>,
    header: &Header,
    tokens: &[String],
    body: &mut dyn BodyEvents,
) -> Flow {
    if let Err(e) = expect_bare(lines, tokens) {
        let abort = report(body, e, Abort::Skip);
        return recover(lines, body, abort);
    }
    let Some(receiver) = body.on_triangles() else {
        log::debug!("triangle data declined, skipping");
        return recover(lines, body, Abort::Skip);
    };

    let result = triangle_lines(lines, header.triangles(), receiver);
    let flow = finish(lines, receiver, result);
    receiver.on_data_triangles_finish();
    flow
}

fn triangle_lines<R: BufRead>(
    lines: &mut LineReader<R>,
    triangles: TriangleBlock,
    receiver: &mut dyn TrianglesEvents,
) -> Result<(), Abort> {
    let expected = triangles.triangle_count();
    for received in 0..expected {
        let tokens = next(lines, receiver)?;
        if is_end(&tokens) {
            let error = lines.error(format!(
                "Too few triangles; expected {expected}, got {received}"
            ));
            return Err(report(receiver, error, Abort::Closed));
        }
        let [v0, v1, v2] = parse_triangle(lines, triangles, &tokens).map_err(|e| report(receiver, e, Abort::Skip))?;
        receiver.on_data_triangle(v0, v1, v2);
    }

    let tokens = next(lines, receiver)?;
    if !is_end(&tokens) {
        let error = lines.error(format!("Too many triangles; expected {expected}"));
        return Err(report(receiver, error, Abort::Skip));
    }
    Ok(())
}

fn parse_triangle<R: BufRead>(
    lines: &LineReader<R>,
    triangles: TriangleBlock,
    tokens: &[String],
) -> Result<[u64; 3], ParseError> {
    let [v0, v1, v2] = tokens else {
        return Err(lines.error(format!(
            "Cannot parse triangle; expected '<v0> <v1> <v2>', got '{}'",
            tokens.join(" ")
        )));
    };
    let indices = [
        number(lines, "triangle index", v0)?,
        number(lines, "triangle index", v1)?,
        number(lines, "triangle index", v2)?,
    ];
    if let Some(&index) = indices.iter().find(|&&v| v > triangles.max_index()) {
        return Err(lines.error(format!(
            "Triangle index {index} does not fit in {} bits",
            triangles.index_size_bits()
        )));
    }
    Ok(indices)
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

pub fn metadata<R: BufRead>(lines: &mut LineReader<R>, tokens: &[String], body: &mut dyn BodyEvents) -> Flow {
    let parsed = match tokens {
        [_, name, major, minor, count] => schema_identifier(lines, name, major, minor)
            .and_then(|schema| Ok((schema, number::<R, u64>(lines, "metadata line count", count)?))),
        _ => Err(lines.error(format!(
            "Malformed 'metadata' section; expected 'metadata <schema> <major> <minor> <line-count>', got '{}'",
            tokens.join(" ")
        ))),
    };
    let (schema, line_count) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            let abort = report(body, e, Abort::Skip);
            return recover(lines, body, abort);
        }
    };

    let Some(receiver) = body.on_meta(&schema) else {
        log::debug!("metadata {schema} declined, skipping");
        return recover(lines, body, Abort::Skip);
    };
    let result = metadata_lines(lines, line_count, receiver)
        .map(|data| receiver.on_meta_data(&schema, &data));
    finish(lines, receiver, result)
}

fn metadata_lines<R: BufRead>(
    lines: &mut LineReader<R>,
    line_count: u64,
    receiver: &mut dyn MetaEvents,
) -> Result<Vec<u8>, Abort> {
    let mut encoded = String::new();
    for received in 0..line_count {
        let tokens = next(lines, receiver)?;
        if is_end(&tokens) {
            let error = lines.error(format!(
                "Too few metadata lines; expected {line_count}, got {received}"
            ));
            return Err(report(receiver, error, Abort::Closed));
        }
        let [line] = tokens.as_slice() else {
            let error = lines.error(format!("Malformed base64 line '{}'", tokens.join(" ")));
            return Err(report(receiver, error, Abort::Skip));
        };
        encoded.push_str(line);
    }

    let tokens = next(lines, receiver)?;
    if !is_end(&tokens) {
        let error = lines.error(format!("Too many metadata lines; expected {line_count}"));
        return Err(report(receiver, error, Abort::Skip));
    }

    URL_SAFE.decode(encoded.as_bytes()).map_err(|e| {
        let error = lines.error("Cannot decode base64 metadata").with_cause(e);
        report(receiver, error, Abort::Closed)
    })
}

/// Encode metadata as the lines of a `metadata` section.
pub fn metadata_to_lines(data: &[u8]) -> Vec<String> {
    let encoded = URL_SAFE.encode(data);
    encoded
        .as_bytes()
        .chunks(METADATA_LINE_LENGTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use smf_core::layout::AttributeName;

    fn reader(text: &str) -> LineReader<&[u8]> {
        LineReader::new(text.as_bytes(), None)
    }

    fn attribute(kind: ComponentType, count: u32, bits: u32) -> Attribute {
        Attribute::new(AttributeName::new("a").unwrap(), kind, count, bits).unwrap()
    }

    fn tokens(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    #[rstest]
    #[case::float3(ComponentType::Float, 3, 32, "0.5 -1 1e3")]
    #[case::signed2(ComponentType::SignedInteger, 2, 8, "-128 127")]
    #[case::unsigned1(ComponentType::UnsignedInteger, 1, 16, "65535")]
    #[case::nan(ComponentType::Float, 1, 64, "NaN")]
    fn test_parse_value(#[case] kind: ComponentType, #[case] count: u32, #[case] bits: u32, #[case] line: &str) {
        let lines = reader("");
        let value = parse_value(&lines, &attribute(kind, count, bits), &tokens(line)).unwrap();
        assert_eq!(value.component_type(), kind);
        assert_eq!(value.component_count(), count);
    }

    #[rstest]
    #[case::wrong_count(ComponentType::Float, 3, 32, "1 2")]
    #[case::not_a_number(ComponentType::Float, 1, 32, "one")]
    #[case::negative_unsigned(ComponentType::UnsignedInteger, 1, 32, "-1")]
    #[case::out_of_range(ComponentType::UnsignedInteger, 1, 8, "256")]
    #[case::signed_out_of_range(ComponentType::SignedInteger, 1, 8, "-129")]
    fn test_parse_value_rejects(
        #[case] kind: ComponentType,
        #[case] count: u32,
        #[case] bits: u32,
        #[case] line: &str,
    ) {
        let lines = reader("");
        assert!(parse_value(&lines, &attribute(kind, count, bits), &tokens(line)).is_err());
    }

    #[test]
    fn test_parse_triangle_index_size() {
        let lines = reader("");
        let block = TriangleBlock::new(1, 8).unwrap();
        assert_eq!(parse_triangle(&lines, block, &tokens("0 1 255")).unwrap(), [0, 1, 255]);
        let error = parse_triangle(&lines, block, &tokens("0 1 256")).unwrap_err();
        assert_eq!(error.message, "Triangle index 256 does not fit in 8 bits");
    }

    #[test]
    fn test_metadata_lines_wrap() {
        let data: Vec<u8> = (0..=255).collect();
        let lines = metadata_to_lines(&data);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= METADATA_LINE_LENGTH));
        let joined: String = lines.concat();
        assert_eq!(URL_SAFE.decode(joined).unwrap(), data);
        assert!(metadata_to_lines(&[]).is_empty());
    }
}
