//! Sequence boundary scanning over line-delimited text
//!
//! The scanner walks a [`ByteCursor`] one row at a time, locating newline
//! delimiters with `memchr` and parsing the leading sequence id of a row when
//! asked. It never inspects row contents beyond the id token; boundary
//! detection is the whole job.

use std::io::Read;

use memchr::memchr;

use crate::cursor::ByteCursor;
use crate::error::{Result, ScanError};

/// Byte that separates rows of the input
pub const ROW_DELIMITER: u8 = b'\n';

/// UTF-8 byte order mark
const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// A line-oriented scanner over a buffered byte stream
///
/// All offsets reported by the scanner are absolute byte offsets into the
/// input, continuous across buffer refills.
pub struct LineScanner<R: Read> {
    /// Cursor over the buffered input
    cursor: ByteCursor<R>,

    /// Reusable storage for symbolic key bytes
    key_buf: Vec<u8>,
}

impl<R: Read> LineScanner<R> {
    /// Creates a new scanner over a reader with the given buffer capacity
    ///
    /// A capacity below the length of a byte order mark is raised to it, so
    /// the mark can always be judged on a full window.
    pub fn new(inner: R, buffer_size: usize) -> Self {
        Self {
            cursor: ByteCursor::new(inner, buffer_size.max(BOM.len())),
            key_buf: Vec::new(),
        }
    }

    /// Loads the first window and positions the scanner at the first content
    /// byte
    ///
    /// A leading UTF-8 byte order mark is skipped when present, regardless
    /// of how the source splits its reads.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::EmptyInput`] if the input holds zero bytes of
    /// content once the byte order mark is accounted for, or
    /// [`ScanError::Read`] if the underlying reader fails.
    pub fn prime(&mut self) -> Result<()> {
        // A short first read must not hide the mark
        self.cursor.fill_to(BOM.len())?;
        if self.cursor.is_done() {
            return Err(ScanError::EmptyInput {
                offset: self.cursor.file_offset(),
            }
            .into());
        }
        if self.cursor.remaining_slice().starts_with(&BOM) {
            self.cursor.consume(BOM.len())?;
        }
        if self.cursor.is_done() {
            return Err(ScanError::EmptyInput {
                offset: self.cursor.file_offset(),
            }
            .into());
        }
        Ok(())
    }

    /// Advances the scanner past the next row delimiter
    ///
    /// On success the scanner is positioned at the first byte of the next
    /// row, so [`file_offset`] reports that row's starting offset.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A delimiter was crossed
    /// * `Ok(false)` - End of stream was reached without a delimiter; the
    ///   bytes walked over belong to a final unterminated row
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] if the underlying reader fails.
    ///
    /// [`file_offset`]: LineScanner::file_offset
    pub fn skip_to_next_line(&mut self) -> Result<bool> {
        loop {
            if self.cursor.is_done() {
                return Ok(false);
            }
            if let Some(i) = memchr(ROW_DELIMITER, self.cursor.remaining_slice()) {
                self.cursor.consume(i + 1)?;
                return Ok(true);
            }
            let n = self.cursor.remaining();
            self.cursor.consume(n)?;
        }
    }

    /// Parses a decimal sequence id at the scanner position
    ///
    /// Consumes ASCII digits up to, but not including, the first non-digit
    /// byte. Accumulation wraps on overflow rather than failing; ids are
    /// opaque grouping labels, not quantities.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(id))` - At least one digit was consumed and a terminator
    ///   was seen
    /// * `Ok(None)` - The position does not hold a digit, or end of stream
    ///   arrived before any terminator
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] if the underlying reader fails.
    pub fn read_numeric_id(&mut self) -> Result<Option<u64>> {
        let mut id: u64 = 0;
        let mut found = false;
        while let Some(byte) = self.cursor.peek() {
            if !byte.is_ascii_digit() {
                return Ok(found.then_some(id));
            }
            found = true;
            id = id.wrapping_mul(10).wrapping_add(u64::from(byte - b'0'));
            self.cursor.advance()?;
        }
        Ok(None)
    }

    /// Parses a symbolic sequence id at the scanner position
    ///
    /// Accumulates bytes up to, but not including, the first ASCII whitespace
    /// byte, then resolves the token to an id through `resolve`. A token that
    /// is not valid UTF-8 yields `None`, the same as any other malformed id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(id))` - A non-empty token was resolved
    /// * `Ok(None)` - The position holds whitespace, the token is not UTF-8,
    ///   or end of stream arrived before any whitespace
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] if the underlying reader fails.
    pub fn read_symbolic_id(&mut self, resolve: impl Fn(&str) -> u64) -> Result<Option<u64>> {
        self.key_buf.clear();
        while let Some(byte) = self.cursor.peek() {
            if byte.is_ascii_whitespace() {
                if self.key_buf.is_empty() {
                    return Ok(None);
                }
                return Ok(match std::str::from_utf8(&self.key_buf) {
                    Ok(key) => Some(resolve(key)),
                    Err(_) => None,
                });
            }
            self.key_buf.push(byte);
            self.cursor.advance()?;
        }
        Ok(None)
    }

    /// Returns the byte at the scanner position without consuming it
    #[must_use]
    pub fn peek_byte(&self) -> Option<u8> {
        self.cursor.peek()
    }

    /// Returns the absolute byte offset of the scanner position
    #[must_use]
    pub fn file_offset(&self) -> u64 {
        self.cursor.file_offset()
    }

    /// Returns the absolute byte offset one past the last byte read so far
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.cursor.end_offset()
    }

    /// Returns `true` once the input is exhausted
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;
    use anyhow::Result;
    use std::io::Cursor;

    fn scanner(data: &[u8], buffer_size: usize) -> LineScanner<Cursor<Vec<u8>>> {
        LineScanner::new(Cursor::new(data.to_vec()), buffer_size)
    }

    /// Hands out one byte per `read` call, like a slow socket
    struct OneByteReader(Cursor<Vec<u8>>);

    impl Read for OneByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_prime_empty_input() {
        let mut scan = scanner(b"", 16);
        let err = scan.prime().unwrap_err();
        assert!(matches!(err, Error::ScanError(ScanError::EmptyInput { offset: 0 })));
    }

    #[test]
    fn test_prime_bom_only_input() {
        let mut scan = scanner(&[0xEF, 0xBB, 0xBF], 16);
        let err = scan.prime().unwrap_err();
        assert!(matches!(err, Error::ScanError(ScanError::EmptyInput { offset: 3 })));
    }

    #[test]
    fn test_prime_skips_bom() -> Result<()> {
        let mut scan = scanner(b"\xEF\xBB\xBFabc\n", 16);
        scan.prime()?;
        assert_eq!(scan.file_offset(), 3);
        assert_eq!(scan.peek_byte(), Some(b'a'));
        Ok(())
    }

    #[test]
    fn test_prime_skips_bom_arriving_byte_by_byte() -> Result<()> {
        let reader = OneByteReader(Cursor::new(b"\xEF\xBB\xBFabc\n".to_vec()));
        let mut scan = LineScanner::new(reader, 16);
        scan.prime()?;
        assert_eq!(scan.file_offset(), 3);
        assert_eq!(scan.peek_byte(), Some(b'a'));
        Ok(())
    }

    #[test]
    fn test_prime_bom_only_arriving_byte_by_byte() {
        let reader = OneByteReader(Cursor::new(vec![0xEF, 0xBB, 0xBF]));
        let mut scan = LineScanner::new(reader, 16);
        let err = scan.prime().unwrap_err();
        assert!(matches!(err, Error::ScanError(ScanError::EmptyInput { offset: 3 })));
    }

    #[test]
    fn test_prime_skips_bom_with_tiny_buffer() -> Result<()> {
        let mut scan = scanner(b"\xEF\xBB\xBFx\n", 1);
        scan.prime()?;
        assert_eq!(scan.file_offset(), 3);
        assert_eq!(scan.peek_byte(), Some(b'x'));
        assert!(scan.skip_to_next_line()?);
        assert_eq!(scan.file_offset(), 5);
        Ok(())
    }

    #[test]
    fn test_bom_bytes_midstream_are_content() -> Result<()> {
        let mut scan = scanner(b"a\n\xEF\xBB\xBF\n", 16);
        scan.prime()?;
        assert_eq!(scan.file_offset(), 0);
        assert!(scan.skip_to_next_line()?);
        assert_eq!(scan.file_offset(), 2);
        assert!(scan.skip_to_next_line()?);
        assert_eq!(scan.file_offset(), 6);
        Ok(())
    }

    #[test]
    fn test_skip_lines_across_refills() -> Result<()> {
        let mut scan = scanner(b"one\ntwo\nthree\n", 2);
        scan.prime()?;
        let mut starts = vec![scan.file_offset()];
        while scan.skip_to_next_line()? {
            starts.push(scan.file_offset());
        }
        assert_eq!(starts, vec![0, 4, 8, 14]);
        assert!(scan.is_done());
        assert_eq!(scan.end_offset(), 14);
        Ok(())
    }

    #[test]
    fn test_trailing_fragment_reaches_eof() -> Result<()> {
        let mut scan = scanner(b"a\nb", 16);
        scan.prime()?;
        assert!(scan.skip_to_next_line()?);
        assert!(!scan.skip_to_next_line()?);
        assert_eq!(scan.file_offset(), 3);
        assert_eq!(scan.end_offset(), 3);
        Ok(())
    }

    #[test]
    fn test_numeric_id_stops_at_terminator() -> Result<()> {
        let mut scan = scanner(b"123 payload\n", 16);
        scan.prime()?;
        assert_eq!(scan.read_numeric_id()?, Some(123));
        assert_eq!(scan.peek_byte(), Some(b' '));
        assert_eq!(scan.file_offset(), 3);
        Ok(())
    }

    #[test]
    fn test_numeric_id_requires_leading_digit() -> Result<()> {
        let mut scan = scanner(b"abc 1\n", 16);
        scan.prime()?;
        assert_eq!(scan.read_numeric_id()?, None);
        assert_eq!(scan.file_offset(), 0);
        Ok(())
    }

    #[test]
    fn test_numeric_id_unterminated_at_eof() -> Result<()> {
        let mut scan = scanner(b"42", 16);
        scan.prime()?;
        assert_eq!(scan.read_numeric_id()?, None);
        assert!(scan.is_done());
        Ok(())
    }

    #[test]
    fn test_numeric_id_spans_refills() -> Result<()> {
        let mut scan = scanner(b"987654321\t", 1);
        scan.prime()?;
        assert_eq!(scan.read_numeric_id()?, Some(987_654_321));
        assert_eq!(scan.peek_byte(), Some(b'\t'));
        Ok(())
    }

    #[test]
    fn test_numeric_id_wraps_instead_of_overflowing() -> Result<()> {
        let mut scan = scanner(b"99999999999999999999999999 x\n", 16);
        scan.prime()?;
        assert!(scan.read_numeric_id()?.is_some());
        assert_eq!(scan.peek_byte(), Some(b' '));
        Ok(())
    }

    #[test]
    fn test_symbolic_id_resolves_token() -> Result<()> {
        let mut scan = scanner(b"alpha 1 2\n", 4);
        scan.prime()?;
        let id = scan.read_symbolic_id(|key| {
            assert_eq!(key, "alpha");
            7
        })?;
        assert_eq!(id, Some(7));
        assert_eq!(scan.peek_byte(), Some(b' '));
        Ok(())
    }

    #[test]
    fn test_symbolic_id_rejects_leading_whitespace() -> Result<()> {
        let mut scan = scanner(b" alpha\n", 16);
        scan.prime()?;
        assert_eq!(scan.read_symbolic_id(|_| 0)?, None);
        assert_eq!(scan.file_offset(), 0);
        Ok(())
    }

    #[test]
    fn test_symbolic_id_unterminated_at_eof() -> Result<()> {
        let mut scan = scanner(b"alpha", 16);
        scan.prime()?;
        assert_eq!(scan.read_symbolic_id(|_| 0)?, None);
        assert!(scan.is_done());
        Ok(())
    }

    #[test]
    fn test_symbolic_id_invalid_utf8_is_malformed() -> Result<()> {
        let mut scan = scanner(b"\xFF\xFE tail\n", 16);
        scan.prime()?;
        assert_eq!(scan.read_symbolic_id(|_| 0)?, None);
        Ok(())
    }
}
