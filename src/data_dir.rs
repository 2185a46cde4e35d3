use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The SEMDEX_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/semdex/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("SEMDEX_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("semdex")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Corpus metadata store, produced by `scan` and read by `build`.
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join("metadata.json")
    }

    /// Whole-file JSON embedding cache.
    pub fn cache_path(&self) -> PathBuf {
        self.root.join("embeddings_cache.json")
    }

    /// Binary inner-product index over all document embeddings.
    pub fn index_path(&self) -> PathBuf {
        self.root.join("vector_index.bin")
    }

    /// Position -> doc_id map; always written right after the index.
    pub fn id_map_path(&self) -> PathBuf {
        self.root.join("id_map.json")
    }
}
