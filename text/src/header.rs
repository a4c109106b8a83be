//! Header commands.
//!
//! ```text
//! schema <name> <major> <minor>
//! vertices <count>
//! triangles <count> <index-size-bits>
//! coordinates <right> <up> <forward> <winding>
//! attribute "<name>" <component-type> <count> <bits>
//! end
//! ```

use std::io::BufRead;
use std::str::FromStr;

use smf_core::diagnostic::{ParseError, ParseWarning};
use smf_core::layout::{
    Attribute, AttributeName, ComponentType, CoordinateSystem, Header, HeaderBuilder,
    SchemaIdentifier, SchemaName, TriangleBlock,
};
use smf_core::protocol::HeaderEvents;

use crate::lines::LineReader;

const HEADER_COMMANDS: &str = "attribute | coordinates | end | schema | triangles | vertices";

#[derive(Default)]
struct Seen {
    vertices: bool,
    triangles: bool,
    coordinates: bool,
}

/// Read header commands up to `end`.
///
/// Every problem is reported to `receiver`; a header is returned only if
/// there were none.
pub fn parse_header<R: BufRead>(lines: &mut LineReader<R>, receiver: &mut dyn HeaderEvents) -> Option<Header> {
    let mut builder = Header::builder();
    let mut seen = Seen::default();
    let mut failed = false;

    loop {
        let tokens = match lines.require_tokens() {
            Ok(tokens) => tokens,
            Err(e) => {
                receiver.on_error(e);
                return None;
            }
        };

        let result = match tokens[0].as_str() {
            "end" if tokens.len() == 1 => break,
            "end" => Err(malformed(lines, "end", "end", &tokens)),
            "schema" => command_schema(lines, &mut builder, &tokens),
            "vertices" => {
                seen.vertices = true;
                command_vertices(lines, &mut builder, &tokens)
            }
            "triangles" => {
                seen.triangles = true;
                command_triangles(lines, &mut builder, &tokens)
            }
            "coordinates" => {
                seen.coordinates = true;
                command_coordinates(lines, &mut builder, &tokens)
            }
            "attribute" => command_attribute(lines, &mut builder, &tokens),
            other => {
                let message = format!(
                    "Unrecognized command '{other}'; expected one of: {HEADER_COMMANDS}"
                );
                log::warn!("{}: {message}", lines.position());
                receiver.on_warning(ParseWarning::new(lines.position(), message));
                Ok(())
            }
        };

        if let Err(e) = result {
            receiver.on_error(e);
            failed = true;
        }
    }

    if !seen.vertices {
        receiver.on_error(lines.error("No vertex count was specified"));
        failed = true;
    }
    if !seen.triangles {
        receiver.on_error(lines.error("No triangle count was specified"));
        failed = true;
    }
    if !seen.coordinates {
        receiver.on_warning(ParseWarning::new(
            lines.position(),
            format!(
                "No coordinate system was specified; assuming {}",
                CoordinateSystem::default()
            ),
        ));
    }
    if failed {
        return None;
    }

    match builder.build() {
        Ok(header) => {
            log::debug!(
                "header: {} vertices, {} triangles, {} attributes",
                header.vertex_count(),
                header.triangles().triangle_count(),
                header.attributes_in_order().len()
            );
            Some(header)
        }
        Err(e) => {
            receiver.on_error(lines.error(e.to_string()));
            None
        }
    }
}

fn malformed<R>(lines: &LineReader<R>, command: &str, syntax: &str, tokens: &[String]) -> ParseError
where
    R: BufRead,
{
    lines.error(format!(
        "Malformed '{command}' command; expected '{syntax}', got '{}'",
        tokens.join(" ")
    ))
}

/// Parse a numeric token, naming the field in the error.
pub(crate) fn number<R, T>(lines: &LineReader<R>, field: &str, token: &str) -> Result<T, ParseError>
where
    R: BufRead,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    token.parse().map_err(|e: T::Err| {
        lines
            .error(format!("Cannot parse {field} '{token}'"))
            .with_cause(e)
    })
}

pub(crate) fn schema_identifier<R: BufRead>(
    lines: &LineReader<R>,
    name: &str,
    major: &str,
    minor: &str,
) -> Result<SchemaIdentifier, ParseError> {
    let name = SchemaName::new(name).map_err(|e| lines.error(e.to_string()))?;
    let major = number(lines, "schema major version", major)?;
    let minor = number(lines, "schema minor version", minor)?;
    Ok(SchemaIdentifier::new(name, major, minor))
}

fn command_schema<R: BufRead>(
    lines: &LineReader<R>,
    builder: &mut HeaderBuilder,
    tokens: &[String],
) -> Result<(), ParseError> {
    let [_, name, major, minor] = tokens else {
        return Err(malformed(lines, "schema", "schema <name> <major> <minor>", tokens));
    };
    builder.set_schema_identifier(Some(schema_identifier(lines, name, major, minor)?));
    Ok(())
}

fn command_vertices<R: BufRead>(
    lines: &LineReader<R>,
    builder: &mut HeaderBuilder,
    tokens: &[String],
) -> Result<(), ParseError> {
    let [_, count] = tokens else {
        return Err(malformed(lines, "vertices", "vertices <count>", tokens));
    };
    builder.set_vertex_count(number(lines, "vertex count", count)?);
    Ok(())
}

fn command_triangles<R: BufRead>(
    lines: &LineReader<R>,
    builder: &mut HeaderBuilder,
    tokens: &[String],
) -> Result<(), ParseError> {
    let [_, count, bits] = tokens else {
        return Err(malformed(
            lines,
            "triangles",
            "triangles <count> <index-size-bits>",
            tokens,
        ));
    };
    let count = number(lines, "triangle count", count)?;
    let bits = number(lines, "triangle index size", bits)?;
    let triangles = TriangleBlock::new(count, bits).map_err(|e| lines.error(e.to_string()))?;
    builder.set_triangles(triangles);
    Ok(())
}

fn command_coordinates<R: BufRead>(
    lines: &LineReader<R>,
    builder: &mut HeaderBuilder,
    tokens: &[String],
) -> Result<(), ParseError> {
    let args: Vec<&str> = tokens[1..].iter().map(String::as_str).collect();
    let coordinates = CoordinateSystem::from_tokens(&args).map_err(|e| {
        lines.error(format!(
            "{e}; expected 'coordinates <right> <up> <forward> <winding>'"
        ))
    })?;
    builder.set_coordinate_system(coordinates);
    Ok(())
}

fn command_attribute<R: BufRead>(
    lines: &LineReader<R>,
    builder: &mut HeaderBuilder,
    tokens: &[String],
) -> Result<(), ParseError> {
    let [_, name, kind, count, bits] = tokens else {
        return Err(malformed(
            lines,
            "attribute",
            "attribute <name> <component-type> <component-count> <component-size>",
            tokens,
        ));
    };
    let name = AttributeName::new(name.as_str()).map_err(|e| lines.error(e.to_string()))?;
    let kind = ComponentType::from_name(kind).map_err(|e| lines.error(e.to_string()))?;
    let count = number(lines, "component count", count)?;
    let bits = number(lines, "component size", bits)?;
    let attribute = Attribute::new(name, kind, count, bits).map_err(|e| lines.error(e.to_string()))?;
    builder.push_attribute(attribute);
    Ok(())
}
