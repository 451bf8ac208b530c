//! Single-pass chunk indexing for line-delimited sequence corpora
//!
//! `textseq` scans a delimited text corpus once, front to back, and produces
//! an in-memory [`ChunkIndex`] mapping every logical sequence to a byte range
//! of the input. Sequences are grouped into chunks that respect a byte
//! budget, so downstream readers can load or process the corpus chunk by
//! chunk without re-scanning it.
//!
//! Sequences are either single rows (line mode) or maximal runs of
//! consecutive rows sharing a leading id (id-grouped mode, numeric or
//! symbolic keys). The mode is selected automatically from the first content
//! byte; see [`Indexer`] for the details.
//!
//! # Examples
//!
//! Index an in-memory corpus grouped by numeric ids:
//!
//! ```
//! use std::io::Cursor;
//! use textseq::{Indexer, KeyRegistry};
//!
//! fn main() -> textseq::Result<()> {
//!     let data = b"42 the first row\n42 the second row\n43 another\n";
//!     let corpus = KeyRegistry::numeric();
//!     let index = Indexer::new(Cursor::new(data.to_vec())).index(&corpus)?;
//!
//!     assert_eq!(index.num_sequences(), 2);
//!     for chunk in index.chunks() {
//!         for seq in chunk.sequences() {
//!             let start = (chunk.file_offset() + seq.offset_in_chunk()) as usize;
//!             let end = start + seq.byte_size() as usize;
//!             // [start, end) addresses this sequence's bytes in the input
//!             assert!(data[start..end].ends_with(b"\n"));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Index a file, pre-sizing the index from its length:
//!
//! ```no_run
//! use std::fs::File;
//! use textseq::{IndexerBuilder, KeyRegistry};
//!
//! fn main() -> textseq::Result<()> {
//!     let file = File::open("corpus.txt")?;
//!     let size_hint = file.metadata()?.len();
//!     let index = IndexerBuilder::default()
//!         .size_hint(size_hint)
//!         .build(file)
//!         .index(&KeyRegistry::numeric())?;
//!     println!(
//!         "{} sequences across {} chunks",
//!         index.num_sequences(),
//!         index.chunks().len()
//!     );
//!     Ok(())
//! }
//! ```

mod corpus;
mod cursor;
mod error;
mod index;
mod indexer;
mod scanner;

pub mod prelude;

pub use corpus::{Corpus, KeyRegistry};
pub use error::{Error, IndexError, Result, ScanError};
pub use index::{
    ChunkDescriptor, ChunkIndex, SequenceDescriptor, SequenceLocation, MAX_CHUNK_ID,
};
pub use indexer::{
    Indexer, IndexerBuilder, DEFAULT_BUFFER_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_STREAM_PREFIX,
};
