//! Validated names for attributes and schemas.

use std::fmt;

use crate::error::LayoutError;

/// Maximum length in characters of attribute and schema names.
pub const MAXIMUM_NAME_CHARACTERS: usize = 64;

/// The name of a vertex attribute.
///
/// Names are 1 to 64 characters long; each character is alphabetic, a
/// digit, `_`, `-` or `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeName(String);

impl AttributeName {
    /// Validate and wrap an attribute name.
    pub fn new(name: impl Into<String>) -> Result<Self, LayoutError> {
        let name = name.into();
        if Self::is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(LayoutError::InvalidAttributeName(name))
        }
    }

    /// Check whether `name` is a valid attribute name.
    pub fn is_valid(name: &str) -> bool {
        let count = name.chars().count();
        (1..=MAXIMUM_NAME_CHARACTERS).contains(&count)
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AttributeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The name of a schema, such as `com.example.mesh`.
///
/// A dotted sequence of segments, each starting with an alphabetic character
/// followed by alphanumerics or `_`, at most 64 characters in total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaName(String);

impl SchemaName {
    /// Validate and wrap a schema name.
    pub fn new(name: impl Into<String>) -> Result<Self, LayoutError> {
        let name = name.into();
        if Self::is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(LayoutError::InvalidSchemaName(name))
        }
    }

    /// Check whether `name` is a valid schema name.
    pub fn is_valid(name: &str) -> bool {
        if name.chars().count() > MAXIMUM_NAME_CHARACTERS {
            return false;
        }
        name.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_alphabetic() => {
                    chars.all(|c| c.is_alphanumeric() || c == '_')
                }
                _ => false,
            }
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::simple("position")]
    #[case::dotted("uv.0")]
    #[case::dashed("bone-weights")]
    #[case::single("x")]
    #[case::digits("0123")]
    fn test_attribute_name_valid(#[case] name: &str) {
        assert_eq!(AttributeName::new(name).unwrap().as_str(), name);
    }

    #[rstest]
    #[case::empty("")]
    #[case::space("a b")]
    #[case::quote("a\"b")]
    #[case::slash("a/b")]
    fn test_attribute_name_invalid(#[case] name: &str) {
        assert!(matches!(
            AttributeName::new(name),
            Err(LayoutError::InvalidAttributeName(_))
        ));
    }

    #[test]
    fn test_attribute_name_length_limit() {
        assert!(AttributeName::new("a".repeat(64)).is_ok());
        assert!(AttributeName::new("a".repeat(65)).is_err());
    }

    #[rstest]
    #[case::single("mesh", true)]
    #[case::dotted("com.example.mesh", true)]
    #[case::underscore("com.example.mesh_v2", true)]
    #[case::leading_digit("com.1example", false)]
    #[case::empty_segment("com..example", false)]
    #[case::trailing_dot("com.example.", false)]
    #[case::empty("", false)]
    #[case::dash("com.ex-ample", false)]
    fn test_schema_name_validity(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(SchemaName::is_valid(name), valid);
        assert_eq!(SchemaName::new(name).is_ok(), valid);
    }

    #[test]
    fn test_schema_name_length_limit() {
        assert!(SchemaName::new("a".repeat(64)).is_ok());
        assert!(SchemaName::new("a".repeat(65)).is_err());
    }
}
