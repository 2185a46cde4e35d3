use std::{collections::BTreeMap, path::Path};

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Header size: 4 bytes row count + 4 bytes dimension.
const HEADER_SIZE: usize = 8;

/// Exact inner-product nearest-neighbor index.
///
/// Binary index file format:
/// - 4 bytes: row count N (u32 LE)
/// - 4 bytes: embedding dimension D (u32 LE)
/// - N * D * 4 bytes: f32 LE values in row-major order
///
/// The id map is persisted separately as JSON (position string -> doc_id)
/// and must always have exactly N entries. Both files are rebuilt and
/// written together; queries treat the pair as read-only.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major N x D matrix.
    vectors: Vec<f32>,
    /// Position i -> doc_id; same length as the matrix has rows.
    id_map: Vec<String>,
}

impl VectorIndex {
    /// Build an index from `(doc_id, embedding)` rows in position order.
    pub fn from_rows(
        dimension: usize,
        rows: Vec<(String, Vec<f32>)>,
    ) -> Result<Self> {
        let mut vectors = Vec::with_capacity(rows.len() * dimension);
        let mut id_map = Vec::with_capacity(rows.len());
        for (doc_id, embedding) in rows {
            if embedding.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            vectors.extend_from_slice(&embedding);
            id_map.push(doc_id);
        }
        Ok(Self {
            dimension,
            vectors,
            id_map,
        })
    }

    pub fn len(&self) -> usize {
        self.id_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Resolve an index position to its document identifier.
    pub fn doc_id(&self, position: usize) -> Result<&str> {
        self.id_map
            .get(position)
            .map(String::as_str)
            .ok_or(Error::IdMapMismatch { position })
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Exact nearest-neighbor search by inner product over every row.
    ///
    /// Returns at most `top_k` `(position, score)` pairs, score descending.
    /// With unit-normalized vectors this is cosine similarity in [-1, 1].
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .into_par_iter()
            .map(|position| {
                let score = self
                    .row(position)
                    .iter()
                    .zip(query)
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (position, score)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Persist the index, then the id map.
    ///
    /// No rollback is attempted on a crash between the two writes; the
    /// builder always rewrites both files on the next successful build.
    pub fn save(&self, index_path: &Path, id_map_path: &Path) -> Result<()> {
        let mut bytes =
            Vec::with_capacity(HEADER_SIZE + self.vectors.len() * 4);
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.vectors));
        std::fs::write(index_path, bytes)?;

        let id_map: BTreeMap<String, &str> = self
            .id_map
            .iter()
            .enumerate()
            .map(|(i, doc_id)| (i.to_string(), doc_id.as_str()))
            .collect();
        std::fs::write(id_map_path, serde_json::to_string_pretty(&id_map)?)?;
        Ok(())
    }

    /// Load a previously persisted index/id-map pair.
    ///
    /// Absent files mean the index was never built ([`Error::IndexNotReady`]);
    /// a structural mismatch between the two files is a corrupt build
    /// artifact and fatal.
    pub fn load(index_path: &Path, id_map_path: &Path) -> Result<Self> {
        if !index_path.exists() || !id_map_path.exists() {
            return Err(Error::IndexNotReady);
        }

        let bytes = std::fs::read(index_path)?;
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Config(format!(
                "index file too short: {} bytes",
                bytes.len()
            )));
        }
        let rows =
            u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let dimension =
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let expected_len = HEADER_SIZE + rows * dimension * 4;
        if bytes.len() != expected_len {
            return Err(Error::Config(format!(
                "index file length {} does not match header ({rows} x {dimension})",
                bytes.len()
            )));
        }
        let vectors: Vec<f32> =
            bytemuck::cast_slice(&bytes[HEADER_SIZE..]).to_vec();

        let raw = std::fs::read_to_string(id_map_path)?;
        let stored: BTreeMap<String, String> = serde_json::from_str(&raw)?;
        if stored.len() != rows {
            return Err(Error::Config(format!(
                "id map has {} entries but index has {rows} rows",
                stored.len()
            )));
        }
        let mut id_map = Vec::with_capacity(rows);
        for position in 0..rows {
            let doc_id = stored
                .get(&position.to_string())
                .ok_or(Error::IdMapMismatch { position })?;
            id_map.push(doc_id.clone());
        }

        Ok(Self {
            dimension,
            vectors,
            id_map,
        })
    }
}
