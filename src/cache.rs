use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{corpus::DocumentMeta, error::Result};

/// One cached embedding, keyed by document and validated by content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub doc_id: String,
    pub embedding: Vec<f32>,
    pub content_hash: String,
    /// Epoch seconds at the time the entry was written.
    pub updated_at: u64,
}

/// Whole-file JSON embedding cache.
///
/// Every write persists the full cache synchronously; writes only happen at
/// build time, so the write amplification is acceptable at this scale. Not
/// safe for concurrent writers: builds must be serialized.
#[derive(Debug)]
pub struct EmbeddingCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl EmbeddingCache {
    /// Load the cache from disk. Never fails: a missing, unparseable, or
    /// mixed-dimension file degrades to an empty cache, since the embedding
    /// provider remains the source of truth.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => {
                    if mixed_dimensions(&entries) {
                        warn!(
                            path = %path.display(),
                            "cache holds mixed embedding dimensions; \
                             treating as empty"
                        );
                        BTreeMap::new()
                    } else {
                        entries
                    }
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        %err,
                        "cache file is corrupt; treating as empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn get(&self, doc_id: &str) -> Option<&CacheEntry> {
        self.entries.get(doc_id)
    }

    /// Upsert an entry, stamping the current time, and persist immediately.
    pub fn put(
        &mut self,
        doc_id: &str,
        embedding: Vec<f32>,
        content_hash: &str,
    ) -> Result<()> {
        self.entries.insert(
            doc_id.to_string(),
            CacheEntry {
                doc_id: doc_id.to_string(),
                embedding,
                content_hash: content_hash.to_string(),
                updated_at: epoch_seconds(),
            },
        );
        self.save()
    }

    /// For each meta, return the cached entry iff present and its stored
    /// hash equals the meta's current hash; `None` means "must recompute."
    ///
    /// This is the single source of truth for hit/miss decisions: always by
    /// content hash, never by identifier alone, so edited content is never
    /// served stale.
    pub fn reconcile(
        &self,
        metas: &[&DocumentMeta],
    ) -> BTreeMap<String, Option<CacheEntry>> {
        metas
            .iter()
            .map(|meta| {
                let hit = self
                    .get(&meta.doc_id)
                    .filter(|entry| entry.content_hash == meta.content_hash)
                    .cloned();
                (meta.doc_id.clone(), hit)
            })
            .collect()
    }

    /// Reset to empty and persist immediately.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

fn mixed_dimensions(entries: &BTreeMap<String, CacheEntry>) -> bool {
    let mut dims = entries.values().map(|e| e.embedding.len());
    match dims.next() {
        Some(first) => dims.any(|d| d != first),
        None => false,
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
