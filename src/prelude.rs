pub use super::{
    ChunkIndex, Corpus, Error, Indexer, IndexerBuilder, KeyRegistry, Result, SequenceLocation,
};
