use std::{thread, time::Duration};

use tracing::{info, warn};

use crate::{
    cache::EmbeddingCache,
    corpus::{self, CorpusMetadata},
    embed::EmbeddingProvider,
    error::{Error, Result},
    index::VectorIndex,
};

/// Attempts made against the embedding provider before a build fails.
pub const EMBED_ATTEMPTS: usize = 3;

/// Delay between embedding attempts.
pub const EMBED_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Summary of one index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub total: usize,
    /// Documents whose cached embedding was reused.
    pub reused: usize,
    /// Documents embedded fresh through the provider.
    pub embedded: usize,
    pub dimension: usize,
}

/// Build a consistent (index, id-map) pair from corpus metadata.
///
/// Reconciles each document against the cache by content hash, batch-embeds
/// only the changed or missing ones, writes fresh vectors back to the cache,
/// and assembles the matrix in canonical metadata order. The resulting index
/// is not yet persisted; callers decide where it lands.
pub fn build_index(
    metadata: &CorpusMetadata,
    cache: &mut EmbeddingCache,
    provider: &dyn EmbeddingProvider,
) -> Result<(VectorIndex, BuildReport)> {
    let metas = metadata.ordered();
    let dimension = provider.dimension();
    let reconciled = cache.reconcile(&metas);

    // Partition in canonical order. A cached entry with a stale dimension
    // (provider changed since it was written) counts as a miss.
    let mut rows: Vec<(String, Option<Vec<f32>>)> =
        Vec::with_capacity(metas.len());
    let mut recompute: Vec<(usize, String)> = Vec::new();

    for (position, meta) in metas.iter().enumerate() {
        match reconciled.get(&meta.doc_id).and_then(Option::as_ref) {
            Some(entry) if entry.embedding.len() == dimension => {
                rows.push((meta.doc_id.clone(), Some(entry.embedding.clone())));
            }
            other => {
                if other.is_some() {
                    warn!(
                        doc = %meta.doc_id,
                        "cached embedding has a stale dimension; recomputing"
                    );
                }
                let raw = std::fs::read_to_string(&meta.path)?;
                recompute.push((position, corpus::normalize(&raw)));
                rows.push((meta.doc_id.clone(), None));
            }
        }
    }

    let reused = metas.len() - recompute.len();
    info!(
        total = metas.len(),
        reused,
        recompute = recompute.len(),
        "reconciled corpus against embedding cache"
    );

    if !recompute.is_empty() {
        let texts: Vec<String> =
            recompute.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = embed_with_retry(provider, &texts)?;
        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "provider returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        for ((position, _), embedding) in recompute.iter().zip(embeddings) {
            if embedding.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            let meta = metas[*position];
            cache.put(&meta.doc_id, embedding.clone(), &meta.content_hash)?;
            rows[*position].1 = Some(embedding);
        }
    }

    let assembled: Vec<(String, Vec<f32>)> = rows
        .into_iter()
        .map(|(doc_id, embedding)| {
            // Every row is either reused or freshly embedded by now.
            let embedding = embedding.ok_or_else(|| {
                Error::Embedding(format!("no embedding produced for {doc_id}"))
            })?;
            Ok((doc_id, embedding))
        })
        .collect::<Result<_>>()?;

    let index = VectorIndex::from_rows(dimension, assembled)?;
    let report = BuildReport {
        total: metas.len(),
        reused,
        embedded: recompute.len(),
        dimension,
    };
    Ok((index, report))
}

/// Call the provider with bounded retries; partial indexes are never valid,
/// so exhausting the attempts fails the whole build.
fn embed_with_retry(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let mut last_err = None;
    for attempt in 1..=EMBED_ATTEMPTS {
        match provider.embed_documents(texts) {
            Ok(embeddings) => return Ok(embeddings),
            Err(err) => {
                warn!(attempt, %err, "embedding attempt failed");
                last_err = Some(err);
                if attempt < EMBED_ATTEMPTS {
                    thread::sleep(EMBED_RETRY_DELAY);
                }
            }
        }
    }
    Err(Error::Embedding(format!(
        "provider failed after {EMBED_ATTEMPTS} attempts: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        corpus::scan_corpus,
        embed::{EmbeddingProvider, HashEmbedder},
    };

    /// Wraps the hash embedder and counts batch calls plus embedded texts.
    struct CountingProvider {
        inner: HashEmbedder,
        batch_calls: AtomicUsize,
        texts_embedded: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::new(32),
                batch_calls: AtomicUsize::new(0),
                texts_embedded: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingProvider for CountingProvider {
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_documents(texts)
        }

        fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
            self.inner.embed_query(query)
        }
    }

    /// Always fails, to exercise the retry path.
    struct FailingProvider;

    impl EmbeddingProvider for FailingProvider {
        fn dimension(&self) -> usize {
            8
        }

        fn embed_documents(&self, _: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::Embedding("backend unavailable".into()))
        }

        fn embed_query(&self, _: &str) -> Result<Vec<f32>> {
            Err(Error::Embedding("backend unavailable".into()))
        }
    }

    fn corpus_with(
        docs: &[(&str, &str)],
    ) -> (tempfile::TempDir, CorpusMetadata) {
        let tmp = tempfile::tempdir().unwrap();
        for (name, text) in docs {
            std::fs::write(tmp.path().join(name), text).unwrap();
        }
        let metadata = scan_corpus(tmp.path()).unwrap();
        (tmp, metadata)
    }

    #[test]
    fn first_build_embeds_everything_in_one_batch() {
        let (tmp, metadata) = corpus_with(&[
            ("a.txt", "alpha text"),
            ("b.txt", "beta text"),
        ]);
        let mut cache = EmbeddingCache::load(&tmp.path().join("cache.json"));
        let provider = CountingProvider::new();

        let (index, report) =
            build_index(&metadata, &mut cache, &provider).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(report.reused, 0);
        assert_eq!(report.embedded, 2);
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn unchanged_rebuild_makes_no_provider_calls() {
        let (tmp, metadata) = corpus_with(&[("a.txt", "alpha text")]);
        let cache_path = tmp.path().join("cache.json");
        let provider = CountingProvider::new();

        let mut cache = EmbeddingCache::load(&cache_path);
        build_index(&metadata, &mut cache, &provider).unwrap();

        let mut cache = EmbeddingCache::load(&cache_path);
        let (index, report) =
            build_index(&metadata, &mut cache, &provider).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(report.reused, 1);
        assert_eq!(report.embedded, 0);
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn editing_one_document_recomputes_only_that_document() {
        let (tmp, metadata) = corpus_with(&[
            ("a.txt", "alpha text"),
            ("b.txt", "beta text"),
        ]);
        let cache_path = tmp.path().join("cache.json");
        let provider = CountingProvider::new();

        let mut cache = EmbeddingCache::load(&cache_path);
        build_index(&metadata, &mut cache, &provider).unwrap();
        let untouched = cache.get("b.txt").unwrap().clone();

        std::fs::write(tmp.path().join("a.txt"), "alpha rewritten").unwrap();
        let metadata = scan_corpus(tmp.path()).unwrap();

        let mut cache = EmbeddingCache::load(&cache_path);
        let (_, report) =
            build_index(&metadata, &mut cache, &provider).unwrap();

        assert_eq!(report.reused, 1);
        assert_eq!(report.embedded, 1);
        assert_eq!(provider.texts_embedded.load(Ordering::SeqCst), 3);
        assert_eq!(cache.get("b.txt").unwrap(), &untouched);
        assert_eq!(
            cache.get("a.txt").unwrap().content_hash,
            metadata.get("a.txt").unwrap().content_hash
        );
    }

    #[test]
    fn index_order_matches_metadata_order() {
        let (tmp, metadata) = corpus_with(&[
            ("c.txt", "gamma text"),
            ("a.txt", "alpha text"),
            ("b.txt", "beta text"),
        ]);
        let mut cache = EmbeddingCache::load(&tmp.path().join("cache.json"));
        let provider = CountingProvider::new();

        let (index, _) =
            build_index(&metadata, &mut cache, &provider).unwrap();

        assert_eq!(index.doc_id(0).unwrap(), "a.txt");
        assert_eq!(index.doc_id(1).unwrap(), "b.txt");
        assert_eq!(index.doc_id(2).unwrap(), "c.txt");
    }

    #[test]
    fn stale_dimension_cache_entry_is_recomputed() {
        let (tmp, metadata) = corpus_with(&[("a.txt", "alpha text")]);
        let cache_path = tmp.path().join("cache.json");

        let mut cache = EmbeddingCache::load(&cache_path);
        let hash = &metadata.get("a.txt").unwrap().content_hash;
        // Entry with the right hash but the wrong dimension.
        cache.put("a.txt", vec![1.0, 0.0], hash).unwrap();

        let provider = CountingProvider::new();
        let (index, report) =
            build_index(&metadata, &mut cache, &provider).unwrap();

        assert_eq!(index.dimension(), provider.dimension());
        assert_eq!(report.embedded, 1);
        assert_eq!(
            cache.get("a.txt").unwrap().embedding.len(),
            provider.dimension()
        );
    }

    #[test]
    fn provider_failure_fails_the_build() {
        let (tmp, metadata) = corpus_with(&[("a.txt", "alpha text")]);
        let mut cache = EmbeddingCache::load(&tmp.path().join("cache.json"));

        let err = build_index(&metadata, &mut cache, &FailingProvider);
        assert!(matches!(err, Err(Error::Embedding(_))));
        assert!(cache.is_empty(), "no partial cache writes on failure");
    }

    #[test]
    fn empty_corpus_builds_empty_index() {
        let tmp = tempfile::tempdir().unwrap();
        let metadata = scan_corpus(tmp.path()).unwrap();
        let mut cache = EmbeddingCache::load(&tmp.path().join("cache.json"));
        let provider = CountingProvider::new();

        let (index, report) =
            build_index(&metadata, &mut cache, &provider).unwrap();
        assert!(index.is_empty());
        assert_eq!(report.total, 0);
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 0);
    }
}
