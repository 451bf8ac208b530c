//! Buffered forward-only cursor over a byte stream
//!
//! The cursor owns a fixed-size buffer that it refills from any source
//! implementing [`Read`], replacing the buffered window wholesale on each
//! refill. It tracks the absolute file offset of the window so that consumers
//! observe a single continuous offset space across refills, without ever
//! touching raw buffer indices themselves.

use std::io::Read;

use crate::error::{Result, ScanError};

/// A forward-only cursor over a buffered byte stream
///
/// The cursor presents the stream as a sliding window of bytes together with
/// an absolute offset. Consumption is strictly forward: bytes can be peeked,
/// advanced over, or consumed in bulk, and the window refills itself from the
/// underlying reader whenever it is exhausted. There is no seeking and no
/// backtracking.
pub struct ByteCursor<R: Read> {
    /// The source reader for corpus data
    inner: R,

    /// Reusable storage for the buffered window
    buffer: Vec<u8>,

    /// Length of valid data in the buffer
    len: usize,

    /// Current position in the buffer
    pos: usize,

    /// Absolute file offset of the first buffered byte
    buffer_offset: u64,

    /// Absolute file offset one past the last byte read from the source
    end_offset: u64,

    /// Whether the source has reported end of stream
    done: bool,
}

impl<R: Read> ByteCursor<R> {
    /// Creates a new cursor over a reader with the given buffer capacity
    ///
    /// The cursor starts with an empty window; the first call to [`refill`]
    /// loads the initial bytes.
    ///
    /// # Arguments
    ///
    /// * `inner` - The source to read corpus bytes from
    /// * `capacity` - The size of the internal buffer in bytes
    ///
    /// [`refill`]: ByteCursor::refill
    pub fn new(inner: R, capacity: usize) -> Self {
        // A zero-sized buffer would report any input as empty
        let capacity = capacity.max(1);
        Self {
            inner,
            buffer: vec![0; capacity],
            len: 0,
            pos: 0,
            buffer_offset: 0,
            end_offset: 0,
            done: false,
        }
    }

    /// Replaces the buffered window with the next bytes from the source
    ///
    /// A read of zero bytes marks the cursor as done without disturbing the
    /// offsets. Otherwise the new window starts where the previous one ended,
    /// so [`file_offset`] remains continuous across refills.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] carrying the absolute offset if the
    /// underlying reader fails.
    ///
    /// [`file_offset`]: ByteCursor::file_offset
    pub fn refill(&mut self) -> Result<()> {
        debug_assert_eq!(self.pos, self.len, "refill with unconsumed bytes");
        if self.done {
            return Ok(());
        }
        match self.inner.read(&mut self.buffer) {
            Ok(0) => {
                self.done = true;
                Ok(())
            }
            Ok(n) => {
                self.buffer_offset = self.end_offset;
                self.end_offset += n as u64;
                self.len = n;
                self.pos = 0;
                Ok(())
            }
            Err(source) => Err(ScanError::Read {
                offset: self.end_offset,
                source,
            }
            .into()),
        }
    }

    /// Tops the window up to at least `min` buffered bytes
    ///
    /// Unconsumed bytes are compacted to the front of the buffer, then more
    /// input is read until the window holds `min` bytes or the source ends.
    /// The cursor position and [`file_offset`] are unaffected, so a prefix
    /// check against the window sees the same bytes however the source
    /// splits its reads.
    ///
    /// `min` must not exceed the buffer capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] carrying the absolute offset if the
    /// underlying reader fails.
    ///
    /// [`file_offset`]: ByteCursor::file_offset
    pub fn fill_to(&mut self, min: usize) -> Result<()> {
        debug_assert!(min <= self.buffer.len(), "fill_to beyond the buffer");
        if self.remaining() >= min || self.done {
            return Ok(());
        }
        if self.pos > 0 {
            self.buffer.copy_within(self.pos..self.len, 0);
            self.buffer_offset += self.pos as u64;
            self.len -= self.pos;
            self.pos = 0;
        }
        while self.len < min {
            match self.inner.read(&mut self.buffer[self.len..]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => {
                    self.len += n;
                    self.end_offset += n as u64;
                }
                Err(source) => {
                    return Err(ScanError::Read {
                        offset: self.end_offset,
                        source,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Returns the absolute file offset of the cursor position
    #[must_use]
    pub fn file_offset(&self) -> u64 {
        self.buffer_offset + self.pos as u64
    }

    /// Returns the absolute file offset one past the last byte read so far
    ///
    /// Once the cursor is done this is the total length of the input.
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }

    /// Returns `true` once the input is exhausted
    ///
    /// True when the source has reported end of stream and every buffered
    /// byte has been consumed. A done cursor never yields another byte.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done && self.pos == self.len
    }

    /// Returns the number of unconsumed bytes in the current window
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.len - self.pos
    }

    /// Returns the unconsumed bytes of the current window
    ///
    /// The slice is only valid until the next consuming call; it never spans
    /// a refill boundary.
    #[must_use]
    pub fn remaining_slice(&self) -> &[u8] {
        &self.buffer[self.pos..self.len]
    }

    /// Returns the byte at the cursor position without consuming it
    ///
    /// Returns `None` when the window is exhausted, which after a refill
    /// attempt means end of stream.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        if self.pos < self.len {
            Some(self.buffer[self.pos])
        } else {
            None
        }
    }

    /// Consumes a single byte, refilling the window if it becomes exhausted
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] if a refill is triggered and the
    /// underlying reader fails.
    pub fn advance(&mut self) -> Result<()> {
        debug_assert!(self.pos < self.len, "advance past the buffered window");
        self.pos += 1;
        if self.pos == self.len {
            self.refill()?;
        }
        Ok(())
    }

    /// Consumes `n` bytes from the current window, refilling if it becomes
    /// exhausted
    ///
    /// `n` must not exceed [`remaining`]; bulk consumption never crosses a
    /// refill boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] if a refill is triggered and the
    /// underlying reader fails.
    ///
    /// [`remaining`]: ByteCursor::remaining
    pub fn consume(&mut self, n: usize) -> Result<()> {
        debug_assert!(n <= self.remaining(), "consume past the buffered window");
        self.pos += n;
        if self.pos == self.len {
            self.refill()?;
        }
        Ok(())
    }
}
