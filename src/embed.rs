use crate::{error::Result, explain};

/// Default dimension of the built-in feature-hashing provider.
pub const DEFAULT_DIMENSION: usize = 256;

/// Text -> fixed-length unit-normalized vector.
///
/// The index must be built and queried through the same provider; the
/// embedding spaces of different providers are not comparable.
pub trait EmbeddingProvider {
    /// Output dimension, fixed for the provider's lifetime.
    fn dimension(&self) -> usize;

    /// Embed a batch of document texts, one vector per input in order.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    fn embed_query(&self, query: &str) -> Result<Vec<f32>>;
}

/// Deterministic feature-hashing embedder.
///
/// Each token is FNV-1a hashed into one of `dimension` signed buckets and
/// the bucket histogram is L2-normalized. Fully offline and reproducible;
/// texts sharing vocabulary produce vectors with high inner product.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be positive");
        Self { dimension }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in explain::tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            // Sign bit from the upper hash half decorrelates buckets.
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        Ok(self.embed(query))
    }
}

/// Scale a vector to unit length; the zero vector is left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
