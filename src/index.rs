//! In-memory index of sequences grouped into chunks
//!
//! The index is the artifact of an indexing pass: a vector of chunk
//! descriptors, each holding the descriptors of the sequences whose bytes
//! fall inside it. Chunks are packed online against a byte budget; only the
//! last chunk is ever open for appending, and sealed chunks are never touched
//! again. The index lives entirely in memory and is rebuilt per run.

use std::collections::HashMap;

use crate::error::{IndexError, Result};

/// Maximum representable chunk id, reserved as an invalid-id sentinel
///
/// An indexing pass fails with [`IndexError::ChunkOverflow`] rather than
/// assign this id to a chunk.
pub const MAX_CHUNK_ID: u32 = u32::MAX;

/// Descriptor of a single sequence within a chunk
///
/// A sequence is a contiguous byte range of the input holding one or more
/// rows. Descriptors record where those bytes sit relative to the owning
/// chunk; together with the chunk's file offset this recovers the absolute
/// position without storing it twice.
#[derive(Debug, Clone, Copy)]
pub struct SequenceDescriptor {
    /// Key identifying the sequence (line index or resolved id)
    key: u64,

    /// Number of rows composing the sequence
    num_samples: u32,

    /// Total size of the sequence in bytes
    byte_size: u64,

    /// Offset of the first byte relative to the owning chunk's file offset
    offset_in_chunk: u64,
}

impl SequenceDescriptor {
    /// Returns the key identifying this sequence
    ///
    /// In line mode this is the zero-based line index; in id-grouped mode it
    /// is the numeric id read from the input or resolved through the corpus.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Returns the number of rows composing this sequence
    #[must_use]
    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    /// Returns the size of this sequence in bytes
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Returns the offset of this sequence relative to its chunk's start
    #[must_use]
    pub fn offset_in_chunk(&self) -> u64 {
        self.offset_in_chunk
    }
}

/// Descriptor of a contiguous run of sequences bounded by the chunk budget
#[derive(Debug, Clone)]
pub struct ChunkDescriptor {
    /// Zero-based chunk id, strictly increasing across the index
    id: u32,

    /// Absolute file offset of the chunk's first byte
    file_offset: u64,

    /// Total size of the chunk's sequences in bytes
    byte_size: u64,

    /// Total number of rows across the chunk's sequences
    num_samples: u64,

    /// Descriptors of the sequences in this chunk, in file order
    sequences: Vec<SequenceDescriptor>,

    /// Cumulative row count at which each sequence begins, parallel to
    /// `sequences`; populated only when sample tracking is enabled
    first_sample_offsets: Vec<u32>,
}

impl ChunkDescriptor {
    fn new(id: u32) -> Self {
        Self {
            id,
            file_offset: 0,
            byte_size: 0,
            num_samples: 0,
            sequences: Vec::new(),
            first_sample_offsets: Vec::new(),
        }
    }

    /// Releases the append slack once the chunk stops receiving sequences
    fn seal(&mut self) {
        self.sequences.shrink_to_fit();
    }

    /// Returns the zero-based id of this chunk
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the absolute file offset of the chunk's first byte
    ///
    /// The offset is taken from the chunk's first sequence, so leading bytes
    /// that belong to no sequence (a byte order mark) are never counted.
    #[must_use]
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Returns the total size of the chunk's sequences in bytes
    ///
    /// At most one sequence larger than the chunk budget can make this
    /// exceed the budget, and only when it sits alone in the chunk.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Returns the number of sequences in this chunk
    #[must_use]
    pub fn num_sequences(&self) -> u32 {
        self.sequences.len() as u32
    }

    /// Returns the total number of rows across the chunk's sequences
    #[must_use]
    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    /// Returns the descriptors of the sequences in this chunk, in file order
    #[must_use]
    pub fn sequences(&self) -> &[SequenceDescriptor] {
        &self.sequences
    }

    /// Returns the cumulative row count at which each sequence begins
    ///
    /// Parallel to [`sequences`]; empty unless the pass enabled sample
    /// tracking.
    ///
    /// [`sequences`]: ChunkDescriptor::sequences
    #[must_use]
    pub fn first_sample_offsets(&self) -> &[u32] {
        &self.first_sample_offsets
    }
}

/// Location of a sequence within an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLocation {
    /// Id of the chunk holding the sequence
    pub chunk_id: u32,

    /// Position of the sequence within that chunk
    pub position: u32,
}

/// Complete index over a line-delimited corpus
///
/// A `ChunkIndex` maps every sequence of the input to a byte range, grouped
/// into chunks that respect a byte budget. It is produced by a single
/// [`Indexer`] pass, after which it is immutable and safe to share across
/// threads for read-only consumption.
///
/// [`Indexer`]: crate::Indexer
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use textseq::{Indexer, KeyRegistry};
///
/// fn main() -> textseq::Result<()> {
///     let data = b"0 first\n0 second\n1 third\n";
///     let corpus = KeyRegistry::numeric();
///     let index = Indexer::new(Cursor::new(data.to_vec())).index(&corpus)?;
///
///     assert_eq!(index.num_sequences(), 2);
///     assert_eq!(index.num_samples(), 3);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    /// Chunk descriptors in file order; never empty
    chunks: Vec<ChunkDescriptor>,

    /// Byte budget used to close chunks during the pass
    max_chunk_size: u64,

    /// Whether this index belongs to the primary input
    primary: bool,

    /// Whether to record cumulative row counts per sequence
    track_first_samples: bool,

    /// Whether sequence keys were read from the input
    has_sequence_ids: bool,

    /// Key to location mapping, maintained only for non-primary indices
    key_to_location: HashMap<u64, SequenceLocation>,
}

impl ChunkIndex {
    /// Creates an empty index holding one open chunk
    pub(crate) fn new(max_chunk_size: u64, primary: bool, track_first_samples: bool) -> Self {
        Self {
            chunks: vec![ChunkDescriptor::new(0)],
            max_chunk_size,
            primary,
            track_first_samples,
            has_sequence_ids: true,
            key_to_location: HashMap::new(),
        }
    }

    /// Pre-sizes the chunk vector for an input of the given byte length
    ///
    /// A hint only; the index grows regardless of what was reserved.
    pub(crate) fn reserve(&mut self, size_in_bytes: u64) {
        if self.max_chunk_size > 0 {
            let chunks = size_in_bytes.div_ceil(self.max_chunk_size);
            self.chunks.reserve(chunks as usize);
        }
    }

    pub(crate) fn set_has_sequence_ids(&mut self, has_sequence_ids: bool) {
        self.has_sequence_ids = has_sequence_ids;
    }

    /// Appends a sequence covering `[start_offset, end_offset)` to the index
    ///
    /// Rolls the open chunk over first when it is non-empty and the sequence
    /// would push it past the budget; the sequence that forced the rollover
    /// becomes the first member of the successor chunk. A chunk receiving its
    /// first sequence takes that sequence's start as its file offset.
    ///
    /// # Errors
    ///
    /// * [`IndexError::ChunkOverflow`] - A rollover would exhaust the chunk
    ///   id space
    /// * [`IndexError::SequenceOverflow`] - The open chunk holds more
    ///   sequences than a position can address (non-primary indices only)
    pub(crate) fn add_sequence(
        &mut self,
        key: u64,
        num_samples: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Result<()> {
        debug_assert!(end_offset > start_offset, "sequence covers no bytes");
        let byte_size = end_offset - start_offset;

        let open = self
            .chunks
            .last()
            .expect("Index invariant: at least one chunk");
        if open.byte_size > 0 && open.byte_size + byte_size > self.max_chunk_size {
            let id = self.chunks.len();
            if id >= MAX_CHUNK_ID as usize {
                return Err(IndexError::ChunkOverflow {
                    offset: start_offset,
                    max: MAX_CHUNK_ID,
                }
                .into());
            }
            self.chunks
                .last_mut()
                .expect("Index invariant: at least one chunk")
                .seal();
            self.chunks.push(ChunkDescriptor::new(id as u32));
        }

        let chunk = self
            .chunks
            .last_mut()
            .expect("Index invariant: at least one chunk");
        if chunk.sequences.is_empty() {
            chunk.file_offset = start_offset;
        }

        if !self.primary {
            let Ok(position) = u32::try_from(chunk.sequences.len()) else {
                return Err(IndexError::SequenceOverflow {
                    offset: start_offset,
                    chunk_id: chunk.id,
                }
                .into());
            };
            self.key_to_location.insert(
                key,
                SequenceLocation {
                    chunk_id: chunk.id,
                    position,
                },
            );
        }

        if self.track_first_samples {
            chunk.first_sample_offsets.push(chunk.num_samples as u32);
        }
        chunk.sequences.push(SequenceDescriptor {
            key,
            num_samples,
            byte_size,
            offset_in_chunk: start_offset - chunk.file_offset,
        });
        chunk.byte_size += byte_size;
        chunk.num_samples += u64::from(num_samples);
        Ok(())
    }

    /// Returns the chunk descriptors in file order
    ///
    /// The slice is never empty; an input with few bytes still produces one
    /// chunk.
    #[must_use]
    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    /// Returns the byte budget the chunks were packed against
    #[must_use]
    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size
    }

    /// Returns whether this index belongs to the primary input
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Returns whether sequence keys were read from the input
    ///
    /// `false` means keys are synthetic line indices.
    #[must_use]
    pub fn has_sequence_ids(&self) -> bool {
        self.has_sequence_ids
    }

    /// Returns the total number of sequences in the index
    #[must_use]
    pub fn num_sequences(&self) -> u64 {
        self.chunks.iter().map(|c| c.sequences.len() as u64).sum()
    }

    /// Returns the total number of rows across all sequences
    #[must_use]
    pub fn num_samples(&self) -> u64 {
        self.chunks.iter().map(ChunkDescriptor::num_samples).sum()
    }

    /// Looks up the location of a sequence by key
    ///
    /// Populated only for non-primary indices; when the input repeats a key,
    /// the location refers to the last occurrence.
    #[must_use]
    pub fn locate(&self, key: u64) -> Option<SequenceLocation> {
        self.key_to_location.get(&key).copied()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_new_index_holds_one_open_chunk() {
        let index = ChunkIndex::new(1024, true, false);
        assert_eq!(index.chunks().len(), 1);
        assert_eq!(index.chunks()[0].num_sequences(), 0);
        assert_eq!(index.num_sequences(), 0);
        assert_eq!(index.num_samples(), 0);
    }

    #[test]
    fn test_rollover_on_budget() -> Result<()> {
        let mut index = ChunkIndex::new(10, true, false);
        index.add_sequence(0, 1, 0, 8)?;
        index.add_sequence(1, 1, 8, 16)?;

        let chunks = index.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id(), 0);
        assert_eq!(chunks[0].byte_size(), 8);
        assert_eq!(chunks[1].id(), 1);
        assert_eq!(chunks[1].file_offset(), 8);
        assert_eq!(chunks[1].sequences()[0].offset_in_chunk(), 0);
        Ok(())
    }

    #[test]
    fn test_exact_budget_fit_does_not_roll_over() -> Result<()> {
        let mut index = ChunkIndex::new(8, true, false);
        index.add_sequence(0, 1, 0, 4)?;
        index.add_sequence(1, 1, 4, 8)?;
        assert_eq!(index.chunks().len(), 1);
        assert_eq!(index.chunks()[0].byte_size(), 8);

        index.add_sequence(2, 1, 8, 12)?;
        assert_eq!(index.chunks().len(), 2);
        Ok(())
    }

    #[test]
    fn test_oversized_sequence_sits_alone() -> Result<()> {
        let mut index = ChunkIndex::new(4, true, false);
        index.add_sequence(0, 1, 0, 100)?;
        assert_eq!(index.chunks().len(), 1);
        assert_eq!(index.chunks()[0].byte_size(), 100);

        index.add_sequence(1, 1, 100, 102)?;
        index.add_sequence(2, 1, 102, 104)?;
        let chunks = index.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].byte_size(), 4);
        assert_eq!(chunks[1].num_sequences(), 2);
        Ok(())
    }

    #[test]
    fn test_budget_still_enforced_after_oversized_sequence() -> Result<()> {
        let mut index = ChunkIndex::new(4, true, false);
        index.add_sequence(0, 1, 0, 100)?;
        index.add_sequence(1, 1, 100, 103)?;
        index.add_sequence(2, 1, 103, 106)?;
        assert_eq!(index.chunks().len(), 3);
        Ok(())
    }

    #[test]
    fn test_no_chunk_smaller_than_largest_member() -> Result<()> {
        let mut index = ChunkIndex::new(16, true, false);
        let sizes = [6u64, 6, 20, 3, 3, 3, 3, 3, 40, 2];
        let mut offset = 0;
        for (key, size) in sizes.iter().enumerate() {
            index.add_sequence(key as u64, 1, offset, offset + size)?;
            offset += size;
        }
        for chunk in index.chunks() {
            let largest = chunk
                .sequences()
                .iter()
                .map(SequenceDescriptor::byte_size)
                .max()
                .unwrap();
            assert!(chunk.byte_size() >= largest);
        }
        Ok(())
    }

    #[test]
    fn test_chunk_offset_from_first_sequence() -> Result<()> {
        let mut index = ChunkIndex::new(1024, true, false);
        index.add_sequence(0, 1, 3, 5)?;
        let chunk = &index.chunks()[0];
        assert_eq!(chunk.file_offset(), 3);
        assert_eq!(chunk.sequences()[0].offset_in_chunk(), 0);
        assert_eq!(chunk.byte_size(), 2);
        Ok(())
    }

    #[test]
    fn test_members_tile_their_chunk() -> Result<()> {
        let mut index = ChunkIndex::new(10, true, false);
        let sizes = [4u64, 4, 4, 4, 4];
        let mut offset = 0;
        for (key, size) in sizes.iter().enumerate() {
            index.add_sequence(key as u64, 1, offset, offset + size)?;
            offset += size;
        }
        for chunk in index.chunks() {
            let mut expected = 0;
            for seq in chunk.sequences() {
                assert_eq!(seq.offset_in_chunk(), expected);
                expected += seq.byte_size();
            }
            assert_eq!(chunk.byte_size(), expected);
        }
        Ok(())
    }

    #[test]
    fn test_primary_index_skips_key_map() -> Result<()> {
        let mut index = ChunkIndex::new(1024, true, false);
        index.add_sequence(7, 1, 0, 4)?;
        assert!(index.is_primary());
        assert_eq!(index.locate(7), None);
        Ok(())
    }

    #[test]
    fn test_non_primary_lookup_keeps_last_occurrence() -> Result<()> {
        let mut index = ChunkIndex::new(6, false, false);
        index.add_sequence(5, 1, 0, 4)?;
        index.add_sequence(9, 1, 4, 8)?;
        index.add_sequence(5, 1, 8, 12)?;

        assert_eq!(
            index.locate(5),
            Some(SequenceLocation {
                chunk_id: 2,
                position: 0,
            })
        );
        assert_eq!(
            index.locate(9),
            Some(SequenceLocation {
                chunk_id: 1,
                position: 0,
            })
        );
        assert_eq!(index.locate(3), None);
        Ok(())
    }

    #[test]
    fn test_first_sample_offsets_accumulate() -> Result<()> {
        let mut index = ChunkIndex::new(10, true, true);
        index.add_sequence(0, 2, 0, 4)?;
        index.add_sequence(1, 3, 4, 8)?;
        index.add_sequence(2, 1, 8, 20)?;

        let chunks = index.chunks();
        assert_eq!(chunks[0].first_sample_offsets(), &[0, 2]);
        assert_eq!(chunks[1].first_sample_offsets(), &[0]);
        assert_eq!(chunks[0].num_samples(), 5);
        Ok(())
    }

    #[test]
    fn test_tracking_disabled_leaves_offsets_empty() -> Result<()> {
        let mut index = ChunkIndex::new(1024, true, false);
        index.add_sequence(0, 2, 0, 4)?;
        assert!(index.chunks()[0].first_sample_offsets().is_empty());
        Ok(())
    }

    #[test]
    fn test_summary_counts() -> Result<()> {
        let mut index = ChunkIndex::new(8, true, false);
        index.add_sequence(0, 2, 0, 6)?;
        index.add_sequence(1, 1, 6, 12)?;
        index.add_sequence(2, 4, 12, 14)?;
        assert_eq!(index.num_sequences(), 3);
        assert_eq!(index.num_samples(), 7);
        assert_eq!(index.max_chunk_size(), 8);
        Ok(())
    }
}
