//! Single-pass corpus indexing
//!
//! The indexer drives one forward scan over a line-delimited input and
//! produces a [`ChunkIndex`] describing every sequence it saw. Two grouping
//! modes exist and are selected once, from the first content byte:
//!
//! 1. Line mode: every row is its own sequence, keyed by its zero-based line
//!    index. Chosen when the caller skips sequence ids or when the first
//!    content byte is the stream prefix marker.
//! 2. Id-grouped mode: maximal runs of consecutive rows that share a leading
//!    sequence id become one sequence each. Ids are decimal numbers or
//!    symbolic tokens, depending on the corpus.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use textseq::{IndexerBuilder, KeyRegistry};
//!
//! let data = b"alpha 1 2\nalpha 3\nbeta 4\n";
//! let corpus = KeyRegistry::symbolic();
//! let index = IndexerBuilder::default()
//!     .chunk_size(1024)
//!     .build(Cursor::new(data.to_vec()))
//!     .index(&corpus)
//!     .unwrap();
//!
//! assert_eq!(index.num_sequences(), 2);
//! assert_eq!(corpus.num_keys(), 2);
//! ```

use std::io::Read;

use crate::corpus::Corpus;
use crate::error::{Result, ScanError};
use crate::index::ChunkIndex;
use crate::scanner::LineScanner;

/// Default byte budget for a single chunk (32 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 32 * 1024 * 1024;

/// Default capacity of the scan buffer (2 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Default marker byte for rows that carry no sequence id
///
/// Rows of an id-free input open directly with a named stream, so an input
/// whose first content byte is this marker is indexed in line mode.
pub const DEFAULT_STREAM_PREFIX: u8 = b'|';

/// Key parsing strategy for id-grouped mode
enum KeyResolver<'a, C> {
    /// Keys are decimal numbers that map to themselves
    Numeric,
    /// Keys are tokens resolved through the corpus
    Symbolic(&'a C),
}

impl<'a, C: Corpus> KeyResolver<'a, C> {
    fn for_corpus(corpus: &'a C) -> Self {
        if corpus.is_numeric_keys() {
            Self::Numeric
        } else {
            Self::Symbolic(corpus)
        }
    }

    fn read_id<R: Read>(&self, scanner: &mut LineScanner<R>) -> Result<Option<u64>> {
        match self {
            Self::Numeric => scanner.read_numeric_id(),
            Self::Symbolic(corpus) => scanner.read_symbolic_id(|key| corpus.key_to_id(key)),
        }
    }
}

/// A builder for creating configured [`Indexer`] instances
///
/// The builder provides a fluent interface over the pass parameters. Every
/// parameter has a default, so `IndexerBuilder::default().build(reader)` is
/// equivalent to [`Indexer::new`].
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use textseq::IndexerBuilder;
///
/// let indexer = IndexerBuilder::default()
///     .chunk_size(64 * 1024)
///     .buffer_size(8 * 1024)
///     .track_first_samples(true)
///     .build(Cursor::new(b"|row\n".to_vec()));
/// ```
#[derive(Default)]
pub struct IndexerBuilder {
    /// Byte budget for a single chunk
    chunk_size: Option<u64>,
    /// Capacity of the scan buffer
    buffer_size: Option<usize>,
    /// Marker byte identifying id-free rows
    stream_prefix: Option<u8>,
    /// Whether to force line mode regardless of input contents
    skip_sequence_ids: Option<bool>,
    /// Whether the input is the primary one
    primary: Option<bool>,
    /// Whether to record cumulative row counts per sequence
    track_first_samples: Option<bool>,
    /// Expected total input size in bytes
    size_hint: Option<u64>,
}

impl IndexerBuilder {
    /// Sets the byte budget for a single chunk
    ///
    /// A chunk is closed once appending another sequence would push it past
    /// the budget. A single sequence larger than the budget still gets a
    /// chunk to itself.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Sets the capacity of the scan buffer
    ///
    /// The pass holds exactly one buffer of this size regardless of input
    /// length. Sizes below the 3-byte length of a byte order mark are
    /// raised to it.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Sets the marker byte that identifies id-free rows
    #[must_use]
    pub fn stream_prefix(mut self, stream_prefix: u8) -> Self {
        self.stream_prefix = Some(stream_prefix);
        self
    }

    /// Forces line mode, ignoring any leading id tokens in the input
    #[must_use]
    pub fn skip_sequence_ids(mut self, skip: bool) -> Self {
        self.skip_sequence_ids = Some(skip);
        self
    }

    /// Declares whether the input is the primary one
    ///
    /// Non-primary indices additionally maintain a key to location mapping so
    /// sequences can be found by the keys of another input.
    #[must_use]
    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Enables recording the cumulative row count at which each sequence
    /// begins within its chunk
    #[must_use]
    pub fn track_first_samples(mut self, track: bool) -> Self {
        self.track_first_samples = Some(track);
        self
    }

    /// Provides the expected total input size in bytes
    ///
    /// Used to pre-size the chunk vector; a hint only, never a limit.
    #[must_use]
    pub fn size_hint(mut self, size_hint: u64) -> Self {
        self.size_hint = Some(size_hint);
        self
    }

    /// Builds an [`Indexer`] over the provided reader with the configured
    /// settings, falling back to defaults for anything left unset
    pub fn build<R: Read>(self, inner: R) -> Indexer<R> {
        let buffer_size = self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        Indexer {
            scanner: LineScanner::new(inner, buffer_size),
            index: ChunkIndex::new(
                chunk_size,
                self.primary.unwrap_or(true),
                self.track_first_samples.unwrap_or(false),
            ),
            stream_prefix: self.stream_prefix.unwrap_or(DEFAULT_STREAM_PREFIX),
            skip_sequence_ids: self.skip_sequence_ids.unwrap_or(false),
            size_hint: self.size_hint.unwrap_or(0),
        }
    }
}

/// A single-pass indexer over a line-delimited input
///
/// The indexer consumes itself to run the pass: [`index`] either completes
/// and hands the finished [`ChunkIndex`] over by value, or fails and drops
/// all partial state with it. There is no way to observe a half-built index.
///
/// [`index`]: Indexer::index
pub struct Indexer<R: Read> {
    /// Scanner over the buffered input
    scanner: LineScanner<R>,

    /// Index under construction
    index: ChunkIndex,

    /// Marker byte identifying id-free rows
    stream_prefix: u8,

    /// Whether to force line mode regardless of input contents
    skip_sequence_ids: bool,

    /// Expected total input size in bytes
    size_hint: u64,
}

impl<R: Read> Indexer<R> {
    /// Creates an indexer over a reader with default settings
    pub fn new(inner: R) -> Self {
        IndexerBuilder::default().build(inner)
    }

    /// Runs the pass and returns the finished index
    ///
    /// The grouping mode is selected once from the first content byte, then
    /// the whole input is scanned front to back. The final row needs no
    /// trailing delimiter; a trailing fragment is indexed like any other row.
    ///
    /// # Errors
    ///
    /// * [`ScanError::EmptyInput`] - The input holds no content
    /// * [`ScanError::SymbolicKeysUnavailable`] - The input has no sequence
    ///   ids, but the corpus expects symbolic keys
    /// * [`ScanError::MissingSequenceId`] - Id-grouped mode could not parse
    ///   an id on the first line
    /// * [`ScanError::Read`] - The underlying reader failed
    /// * [`crate::IndexError`] - A capacity ceiling of the index was reached
    pub fn index<C: Corpus>(mut self, corpus: C) -> Result<ChunkIndex> {
        self.index.reserve(self.size_hint);
        self.scanner.prime()?;

        let offset = self.scanner.file_offset();
        if self.skip_sequence_ids || self.scanner.peek_byte() == Some(self.stream_prefix) {
            if !corpus.is_numeric_keys() {
                return Err(ScanError::SymbolicKeysUnavailable { offset }.into());
            }
            self.index.set_has_sequence_ids(false);
            self.index_lines()?;
        } else {
            let resolver = KeyResolver::for_corpus(&corpus);
            self.index_grouped(&resolver)?;
        }
        Ok(self.index)
    }

    /// Indexes every row as its own single-sample sequence
    fn index_lines(&mut self) -> Result<()> {
        let mut line_start = self.scanner.file_offset();
        let mut lines: u64 = 0;
        while self.scanner.skip_to_next_line()? {
            let line_end = self.scanner.file_offset();
            self.index.add_sequence(lines, 1, line_start, line_end)?;
            line_start = line_end;
            lines += 1;
        }
        // Unterminated trailing bytes form one final row
        if line_start < self.scanner.end_offset() {
            self.index
                .add_sequence(lines, 1, line_start, self.scanner.end_offset())?;
        }
        Ok(())
    }

    /// Indexes maximal runs of rows sharing a leading sequence id
    ///
    /// Only the very first row must carry a parsable id. A later row whose id
    /// cannot be parsed is folded into the sequence being accumulated rather
    /// than treated as a boundary.
    fn index_grouped<C: Corpus>(&mut self, resolver: &KeyResolver<'_, C>) -> Result<()> {
        let offset = self.scanner.file_offset();
        let Some(mut previous_key) = resolver.read_id(&mut self.scanner)? else {
            return Err(ScanError::MissingSequenceId { offset }.into());
        };

        let mut sequence_start = offset;
        let mut num_samples: u32 = 0;
        while !self.scanner.is_done() {
            self.scanner.skip_to_next_line()?;
            let offset = self.scanner.file_offset();
            num_samples += 1;

            if !self.scanner.is_done() {
                if let Some(key) = resolver.read_id(&mut self.scanner)? {
                    if key != previous_key {
                        self.index
                            .add_sequence(previous_key, num_samples, sequence_start, offset)?;
                        previous_key = key;
                        sequence_start = offset;
                        num_samples = 0;
                    }
                }
            }
        }
        self.index.add_sequence(
            previous_key,
            num_samples,
            sequence_start,
            self.scanner.end_offset(),
        )?;
        Ok(())
    }
}
