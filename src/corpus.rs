use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Per-document corpus metadata, created once per corpus snapshot.
///
/// `content_hash` is the blake3 hex digest of the normalized text, and is
/// the sole input to the cache's reuse-vs-recompute decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Path relative to the scanned corpus root; unique by construction.
    pub doc_id: String,
    /// Absolute path to the source file.
    pub path: String,
    pub content_hash: String,
    /// Character count of the normalized text.
    pub length: usize,
}

/// The corpus metadata store: doc_id -> [`DocumentMeta`].
///
/// Iteration order over the backing map (doc_id ascending) is the canonical
/// position order for index construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusMetadata {
    docs: BTreeMap<String, DocumentMeta>,
}

impl CorpusMetadata {
    /// Load the metadata store. A missing file is fatal: the corpus must be
    /// scanned before anything downstream can run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound {
                kind: "metadata file",
                name: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(path)?;
        let docs: BTreeMap<String, DocumentMeta> = serde_json::from_str(&raw)?;
        Ok(Self { docs })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.docs)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn get(&self, doc_id: &str) -> Option<&DocumentMeta> {
        self.docs.get(doc_id)
    }

    /// Documents in canonical position order (doc_id ascending).
    pub fn ordered(&self) -> Vec<&DocumentMeta> {
        self.docs.values().collect()
    }

    pub fn insert(&mut self, meta: DocumentMeta) {
        self.docs.insert(meta.doc_id.clone(), meta);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// File extensions eligible for scanning.
const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt"];

/// Normalize document text for hashing and embedding: strip HTML tags,
/// lowercase, collapse all whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    let stripped = strip_html(text);
    let lower = stripped.to_lowercase();
    lower.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace HTML tags with spaces so adjacent words do not fuse.
fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Hex digest of a text's content, used to detect changes cheaply.
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Walk `root` and build corpus metadata for every non-hidden `.md`/`.txt`
/// file with non-empty normalized text.
///
/// Files are visited in sorted relative-path order, which matches the
/// canonical order of the resulting [`CorpusMetadata`].
pub fn scan_corpus(root: &Path) -> Result<CorpusMetadata> {
    let canonical_root = root.canonicalize().map_err(|_| Error::NotFound {
        kind: "corpus directory",
        name: root.display().to_string(),
    })?;

    let mut files = Vec::new();
    collect_files(&canonical_root, &canonical_root, &mut files)?;
    files.sort();

    let mut metadata = CorpusMetadata::default();
    for (relative, absolute) in files {
        let raw = std::fs::read_to_string(&absolute)?;
        let text = normalize(&raw);
        if text.is_empty() {
            debug!(doc = %relative, "skipping empty document");
            continue;
        }
        metadata.insert(DocumentMeta {
            doc_id: relative,
            path: absolute.display().to_string(),
            content_hash: content_hash(&text),
            length: text.chars().count(),
        });
    }

    Ok(metadata)
}

fn collect_files(
    root: &Path,
    current: &Path,
    results: &mut Vec<(String, std::path::PathBuf)>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files and directories.
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            collect_files(root, &path, results)?;
        } else if file_type.is_file() && is_supported(&path) {
            let abs = path.canonicalize()?;
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();
            results.push((relative, abs));
        }
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_html_and_case() {
        let text = "Hello <b>World</b>\n\n  FOO";
        assert_eq!(normalize(text), "hello world foo");
    }

    #[test]
    fn normalize_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  \n\t "), "");
        assert_eq!(normalize("<div></div>"), "");
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn scan_builds_sorted_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("z.txt"), "zebra text").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "apple text").unwrap();
        std::fs::write(tmp.path().join("skip.png"), "binary").unwrap();

        let metadata = scan_corpus(tmp.path()).unwrap();
        let ids: Vec<_> =
            metadata.ordered().iter().map(|m| m.doc_id.clone()).collect();
        assert_eq!(ids, vec!["a.txt", "z.txt"]);
    }

    #[test]
    fn scan_skips_empty_documents() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("empty.txt"), "   \n ").unwrap();
        std::fs::write(tmp.path().join("full.txt"), "content").unwrap();

        let metadata = scan_corpus(tmp.path()).unwrap();
        assert_eq!(metadata.len(), 1);
        assert!(metadata.get("full.txt").is_some());
    }

    #[test]
    fn scan_skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".hidden.txt"), "secret").unwrap();
        let sub = tmp.path().join(".git");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("notes.md"), "git").unwrap();
        std::fs::write(tmp.path().join("seen.md"), "visible").unwrap();

        let metadata = scan_corpus(tmp.path()).unwrap();
        assert_eq!(metadata.len(), 1);
        assert!(metadata.get("seen.md").is_some());
    }

    #[test]
    fn scan_recurses_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("deep.md"), "deep text").unwrap();

        let metadata = scan_corpus(tmp.path()).unwrap();
        assert_eq!(metadata.len(), 1);
        let meta = metadata.get("sub/deep.md").unwrap();
        assert_eq!(meta.content_hash, content_hash("deep text"));
        assert_eq!(meta.length, "deep text".chars().count());
    }

    #[test]
    fn metadata_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("doc.txt"), "some words").unwrap();

        let metadata = scan_corpus(tmp.path()).unwrap();
        let path = tmp.path().join("metadata.json");
        metadata.save(&path).unwrap();

        let restored = CorpusMetadata::load(&path).unwrap();
        assert_eq!(metadata, restored);
    }

    #[test]
    fn load_missing_metadata_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = CorpusMetadata::load(&tmp.path().join("nope.json"));
        assert!(matches!(
            err,
            Err(crate::error::Error::NotFound { .. })
        ));
    }
}
