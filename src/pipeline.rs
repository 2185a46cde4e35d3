use serde::Serialize;

use crate::{
    corpus::CorpusMetadata,
    data_dir::DataDir,
    embed::EmbeddingProvider,
    error::{Error, Result},
    explain::round4,
    index::VectorIndex,
    ranker,
    search::Retriever,
};

/// Maximum number of characters in a result snippet.
pub const SNIPPET_MAX_CHARS: usize = 230;

/// Placeholder snippet for documents that vanished after indexing.
pub const MISSING_FILE_SNIPPET: &str = "[file not found]";

/// One entry of the pipeline's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub doc_id: String,
    /// Rounded to 4 decimals for presentation stability.
    pub score: f32,
    pub path: String,
    pub snippet: String,
}

/// Retriever -> Ranker -> snippet extraction; the sole entry point for
/// external callers (CLI, API). Explicitly constructed and owned; callers
/// invoke the explainer separately per result when they want a rationale.
#[derive(Debug)]
pub struct QueryPipeline {
    retriever: Retriever,
}

impl QueryPipeline {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Load all persisted artifacts and assemble the pipeline.
    ///
    /// Missing corpus metadata or index artifacts are fatal here: querying
    /// without a loaded index is meaningless.
    pub fn open(
        data_dir: &DataDir,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let metadata = CorpusMetadata::load(&data_dir.metadata_path())?;
        let index = VectorIndex::load(
            &data_dir.index_path(),
            &data_dir.id_map_path(),
        )?;
        Ok(Self::new(Retriever::new(index, metadata, provider)))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Embed, search, rerank, and attach snippets.
    ///
    /// An empty query is rejected as a client error. A document file that
    /// cannot be read gets the placeholder snippet; one missing document
    /// never aborts the whole query.
    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<QueryHit>> {
        if text.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let candidates = self.retriever.search(text, top_k)?;
        let ranked = ranker::rerank(candidates, top_k);

        Ok(ranked
            .into_iter()
            .map(|candidate| {
                let snippet = match std::fs::read_to_string(&candidate.path) {
                    Ok(text) => snippet(&text),
                    Err(_) => MISSING_FILE_SNIPPET.to_string(),
                };
                QueryHit {
                    doc_id: candidate.doc_id,
                    score: round4(candidate.score),
                    path: candidate.path,
                    snippet,
                }
            })
            .collect())
    }

    /// Full document text for a hit, for callers feeding the explainer.
    /// Unreadable files degrade to empty text, mirroring snippet handling.
    pub fn document_text(&self, hit: &QueryHit) -> String {
        std::fs::read_to_string(&hit.path).unwrap_or_default()
    }
}

/// First [`SNIPPET_MAX_CHARS`] characters with newlines collapsed to spaces.
fn snippet(text: &str) -> String {
    text.chars()
        .take(SNIPPET_MAX_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
