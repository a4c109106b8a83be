use std::fmt;

use crate::layout::SchemaName;

/// Identifies the schema a mesh or metadata block claims to follow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaIdentifier {
    name: SchemaName,
    version_major: u32,
    version_minor: u32,
}

impl SchemaIdentifier {
    pub fn new(name: SchemaName, version_major: u32, version_minor: u32) -> Self {
        Self {
            name,
            version_major,
            version_minor,
        }
    }

    pub fn name(&self) -> &SchemaName {
        &self.name
    }

    pub fn version_major(&self) -> u32 {
        self.version_major
    }

    pub fn version_minor(&self) -> u32 {
        self.version_minor
    }
}

impl fmt::Display for SchemaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}",
            self.name, self.version_major, self.version_minor
        )
    }
}

/// Version of a file format, ordered by major then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(FormatVersion::new(1, 9) < FormatVersion::new(2, 0));
        assert!(FormatVersion::new(2, 1) > FormatVersion::new(2, 0));
        assert_eq!(FormatVersion::new(2, 0).to_string(), "2.0");
    }

    #[test]
    fn test_schema_display() {
        let id = SchemaIdentifier::new(SchemaName::new("com.example").unwrap(), 1, 2);
        assert_eq!(id.to_string(), "com.example 1.2");
    }
}
