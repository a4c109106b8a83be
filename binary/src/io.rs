//! Offset-tracking readers and writers for big-endian structures.

use std::io::{self, Read, Write};
use std::sync::Arc;

use smf_core::diagnostic::{LexicalPosition, ParseError};

/// Sections, and the data inside them, start at multiples of this.
pub const ALIGNMENT: u64 = 16;

/// Round `size` up to the next multiple of [`ALIGNMENT`].
pub fn align(size: u64) -> Option<u64> {
    size.checked_add(ALIGNMENT - 1).map(|s| s & !(ALIGNMENT - 1))
}

/// Octets needed after `size` octets to reach alignment.
pub fn padding(size: u64) -> u64 {
    (ALIGNMENT - size % ALIGNMENT) % ALIGNMENT
}

/// A reader that knows its absolute offset, so every error can say where
/// it happened.
pub struct BinaryReader<R> {
    inner: R,
    offset: u64,
    source: Option<Arc<str>>,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(inner: R, source: Option<Arc<str>>) -> Self {
        Self {
            inner,
            offset: 0,
            source,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn position_at(&self, offset: u64) -> LexicalPosition {
        LexicalPosition::at_offset(self.source.clone(), offset)
    }

    /// An error at the current offset.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.offset, message)
    }

    pub fn error_at(&self, offset: u64, message: impl Into<String>) -> ParseError {
        ParseError::new(self.position_at(offset), message)
    }

    fn io_error(&self, e: io::Error) -> ParseError {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            self.error("Unexpected EOF")
        } else {
            self.error("I/O error").with_cause(e)
        }
    }

    pub fn read_exact(&mut self, buffer: &mut [u8]) -> Result<(), ParseError> {
        match self.inner.read_exact(buffer) {
            Ok(()) => {
                self.offset += buffer.len() as u64;
                Ok(())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut buffer = [0; N];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_array().map(u32::from_be_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64, ParseError> {
        self.read_array().map(u64::from_be_bytes)
    }

    /// Read `length` octets.
    ///
    /// The buffer grows as data arrives, so a corrupt length fails with
    /// `Unexpected EOF` instead of a huge allocation.
    pub fn read_bytes(&mut self, length: u64) -> Result<Vec<u8>, ParseError> {
        let mut data = Vec::new();
        let mut limited = (&mut self.inner).take(length);
        let result = limited.read_to_end(&mut data);
        self.offset += data.len() as u64;
        match result {
            Ok(n) if n as u64 == length => Ok(data),
            Ok(_) => Err(self.error("Unexpected EOF")),
            Err(e) => Err(self.io_error(e)),
        }
    }

    pub fn skip(&mut self, count: u64) -> Result<(), ParseError> {
        let mut limited = (&mut self.inner).take(count);
        let result = io::copy(&mut limited, &mut io::sink());
        match result {
            Ok(n) => {
                self.offset += n;
                if n == count {
                    Ok(())
                } else {
                    Err(self.error("Unexpected EOF"))
                }
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Skip forward to the absolute `offset`.
    pub fn skip_to(&mut self, offset: u64) -> Result<(), ParseError> {
        if offset < self.offset {
            return Err(self.error(format!(
                "Read past the end of the enclosing section at offset {offset}"
            )));
        }
        self.skip(offset - self.offset)
    }
}

/// A writer that counts the octets it has written.
pub struct BinaryWriter<W> {
    inner: W,
    offset: u64,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> io::Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Write zeros up to the next aligned offset.
    pub fn pad(&mut self) -> io::Result<()> {
        let count = padding(self.offset) as usize;
        self.write_all(&[0; ALIGNMENT as usize][..count])
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 16)]
    #[case(16, 16)]
    #[case(17, 32)]
    fn test_align(#[case] size: u64, #[case] aligned: u64) {
        assert_eq!(align(size), Some(aligned));
        assert_eq!(size + padding(size), aligned);
    }

    #[test]
    fn test_align_overflow() {
        assert_eq!(align(u64::MAX), None);
    }

    #[test]
    fn test_reader_tracks_offset() {
        let data: Vec<u8> = (0..40).collect();
        let mut reader = BinaryReader::new(data.as_slice(), Some("mesh.smfb".into()));
        assert_eq!(reader.read_u32().unwrap(), 0x0001_0203);
        assert_eq!(reader.read_u64().unwrap(), 0x0405_0607_0809_0a0b);
        reader.skip_to(16).unwrap();
        assert_eq!(reader.read_bytes(4).unwrap(), [16, 17, 18, 19]);
        assert_eq!(reader.offset(), 20);

        let error = reader.skip_to(8).unwrap_err();
        assert_eq!(error.position.column, 20);
    }

    #[test]
    fn test_reader_eof() {
        let data = [1u8, 2, 3];
        let mut reader = BinaryReader::new(&data[..], None);
        let error = reader.read_u32().unwrap_err();
        assert_eq!(error.message, "Unexpected EOF");

        let mut reader = BinaryReader::new(&data[..], None);
        assert_eq!(reader.skip(8).unwrap_err().message, "Unexpected EOF");
        assert_eq!(reader.offset(), 3);

        let mut reader = BinaryReader::new(&data[..], None);
        assert!(reader.read_bytes(u64::MAX).is_err());
    }

    #[test]
    fn test_writer_pads() {
        let mut out = Vec::new();
        let mut writer = BinaryWriter::new(&mut out);
        writer.write_u32(7).unwrap();
        writer.pad().unwrap();
        assert_eq!(writer.offset(), 16);
        writer.pad().unwrap();
        assert_eq!(writer.offset(), 16);
        writer.write_u64(1).unwrap();
        assert_eq!(out.len(), 24);
        assert_eq!(&out[..4], &[0, 0, 0, 7]);
    }
}
