use crate::{
    corpus::CorpusMetadata,
    embed::EmbeddingProvider,
    error::{Error, Result},
    index::VectorIndex,
};

/// A raw retrieval candidate; transient, produced per query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub doc_id: String,
    /// Inner product of unit vectors, in [-1, 1].
    pub score: f32,
    pub path: String,
}

/// Embeds queries and resolves nearest neighbors against a loaded index.
///
/// The index and metadata are read-only here; only an operator-triggered
/// rebuild replaces them, and never concurrently with readers.
pub struct Retriever {
    index: VectorIndex,
    metadata: CorpusMetadata,
    provider: Box<dyn EmbeddingProvider>,
}

impl Retriever {
    /// The provider must be the one the index was built with; mixing
    /// embedding spaces between build and query time is not detected.
    pub fn new(
        index: VectorIndex,
        metadata: CorpusMetadata,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            index,
            metadata,
            provider,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn metadata(&self) -> &CorpusMetadata {
        &self.metadata
    }

    /// Exact nearest-neighbor search over the whole index.
    ///
    /// Returns at most `top_k` candidates, score descending. A position the
    /// id map cannot resolve, or a resolved doc_id missing from corpus
    /// metadata, is a corrupt build artifact and fails the query.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchCandidate>> {
        if top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".into()));
        }

        let query_vector = self.provider.embed_query(query)?;
        let hits = self.index.search(&query_vector, top_k)?;

        let mut candidates = Vec::with_capacity(hits.len());
        for (position, score) in hits {
            let doc_id = self.index.doc_id(position)?;
            let meta =
                self.metadata.get(doc_id).ok_or_else(|| Error::NotFound {
                    kind: "document metadata",
                    name: doc_id.to_string(),
                })?;
            candidates.push(SearchCandidate {
                doc_id: doc_id.to_string(),
                score,
                path: meta.path.clone(),
            });
        }
        Ok(candidates)
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("documents", &self.index.len())
            .field("dimension", &self.index.dimension())
            .finish_non_exhaustive()
    }
}
