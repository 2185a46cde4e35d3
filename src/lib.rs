//! semdex - cache-aware semantic search over a local document corpus.
//!
//! semdex scans a directory of text documents, embeds each one into a dense
//! unit-normalized vector, and answers free-text queries by exact
//! inner-product nearest-neighbor search. Embeddings are cached by content
//! hash, so rebuilding an unchanged corpus never touches the embedding
//! provider, and each result can be explained with a keyword-overlap
//! rationale independent of the vector score.
//!
//! # Quick start
//!
//! ```no_run
//! use semdex::{
//!     builder, cache::EmbeddingCache, corpus, data_dir::DataDir,
//!     embed::HashEmbedder, pipeline::QueryPipeline, search::Retriever,
//! };
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//!
//! // Index: scan -> reconcile with cache -> embed changed docs -> persist.
//! let metadata = corpus::scan_corpus(std::path::Path::new("docs")).unwrap();
//! metadata.save(&data_dir.metadata_path()).unwrap();
//! let mut cache = EmbeddingCache::load(&data_dir.cache_path());
//! let provider = HashEmbedder::default();
//! let (index, _report) =
//!     builder::build_index(&metadata, &mut cache, &provider).unwrap();
//! index
//!     .save(&data_dir.index_path(), &data_dir.id_map_path())
//!     .unwrap();
//!
//! // Query through the pipeline.
//! let pipeline = QueryPipeline::new(Retriever::new(
//!     index,
//!     metadata,
//!     Box::new(provider),
//! ));
//! for hit in pipeline.query("quantum physics basics", 5).unwrap() {
//!     println!("{} (score: {:.4})", hit.doc_id, hit.score);
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod cli;
pub mod corpus;
pub mod data_dir;
pub mod embed;
pub mod error;
pub mod explain;
pub mod index;
pub mod pipeline;
pub mod ranker;
pub mod search;

pub use cache::EmbeddingCache;
pub use corpus::{CorpusMetadata, DocumentMeta};
pub use data_dir::DataDir;
pub use embed::{EmbeddingProvider, HashEmbedder};
pub use error::{Error, Result};
pub use index::VectorIndex;
pub use pipeline::QueryPipeline;
pub use search::Retriever;
