/// Custom Result type for textseq operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the textseq library, encompassing all possible error
/// cases that can occur while indexing a corpus.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors that occur while scanning the input stream
    ScanError(#[from] ScanError),
    /// Errors raised by the index while placing sequences into chunks
    IndexError(#[from] IndexError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
}

/// Errors that can occur while scanning a corpus for sequence boundaries
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The underlying reader failed while refilling the scan buffer
    ///
    /// # Fields
    /// * `offset` - The absolute byte offset at which the read was attempted
    /// * `source` - The I/O error returned by the reader
    #[error("Failed to read input at byte offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The input contains no indexable content (zero bytes, or only a BOM)
    ///
    /// # Fields
    /// * `offset` - The absolute byte offset at which content would begin
    #[error("Input contains no indexable content past byte offset {offset}")]
    EmptyInput { offset: u64 },

    /// The first line of the input does not start with a parsable sequence id
    ///
    /// # Fields
    /// * `offset` - The absolute byte offset at which the id was expected
    #[error("Expected a sequence id at byte offset {offset}")]
    MissingSequenceId { offset: u64 },

    /// The input carries no sequence ids, but the corpus expects symbolic keys
    ///
    /// # Fields
    /// * `offset` - The absolute byte offset of the first content byte
    #[error(
        "Input at byte offset {offset} has no sequence ids, which requires a corpus with numeric keys"
    )]
    SymbolicKeysUnavailable { offset: u64 },
}

/// Errors that can occur while appending sequences to the chunk index
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// Opening another chunk would exceed the maximum representable chunk id
    ///
    /// # Fields
    /// * `offset` - The absolute byte offset of the sequence that forced the rollover
    /// * `max` - The maximum number of chunks the index can hold
    #[error("Exceeded maximum number of chunks ({max}) at byte offset {offset}")]
    ChunkOverflow { offset: u64, max: u32 },

    /// A chunk accumulated more sequences than its position type can address
    ///
    /// # Fields
    /// * `offset` - The absolute byte offset of the sequence that did not fit
    /// * `chunk_id` - The chunk whose sequence positions overflowed
    #[error(
        "Sequence position in chunk {chunk_id} exceeds the supported range at byte offset {offset}"
    )]
    SequenceOverflow { offset: u64, chunk_id: u32 },
}
