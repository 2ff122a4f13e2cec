/*
Embedding provider boundary.

The pretrained encoder (a CLIP-style model mapping text and images into one
shared space) is an external collaborator. The core only depends on the
`EmbeddingProvider` trait below; the process constructs one provider at
startup and injects it into the `Explorer`.

`HashEmbedder` is the deterministic stand-in used by tests, fixtures and
development runs: it hashes the input together with each component index to
produce stable values, then L2-normalises. It carries no semantics.
*/

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{CoreResult, RetrievalError};
use crate::vector;

/// Converts text or raw image bytes into vectors of a fixed dimension.
///
/// Implementations must return vectors in the same space and with the same
/// normalisation convention as the vectors stored in the index.
pub trait EmbeddingProvider: Send + Sync {
    /// Embedding dimension (e.g. 512 for CLIP ViT-B/32).
    fn dimension(&self) -> usize;

    /// Embed a text query.
    fn embed_text(&self, text: &str) -> CoreResult<Vec<f32>>;

    /// Embed an encoded image (PNG, JPEG, ...).
    fn embed_image(&self, image: &[u8]) -> CoreResult<Vec<f32>>;

    /// Short model name for diagnostics.
    fn model_name(&self) -> &str;
}

/// Dimension of CLIP ViT-B/32 embeddings.
pub const CLIP_DIM: usize = 512;

/// Deterministic, fast embedder for tests and development.
#[derive(Clone, Debug)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn deterministic_embedding<T: Hash + ?Sized>(&self, domain: &str, input: &T) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            domain.hash(&mut hasher);
            input.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            // Map u64 -> [0,1] -> [-1,1]
            let v = (h as f64) / (u64::MAX as f64);
            out.push(((v * 2.0) - 1.0) as f32);
        }
        out
    }

    fn finish(&self, raw: Vec<f32>) -> CoreResult<Vec<f32>> {
        vector::normalized(&raw)
            .ok_or_else(|| RetrievalError::Embedding("hash embedding collapsed to zero".into()))
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(CLIP_DIM)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_text(&self, text: &str) -> CoreResult<Vec<f32>> {
        // Whitespace-collapsed so trivially different spellings share a vector.
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            return Err(RetrievalError::InvalidInput("query text is empty".into()));
        }
        self.finish(self.deterministic_embedding("text", cleaned.as_str()))
    }

    fn embed_image(&self, image: &[u8]) -> CoreResult<Vec<f32>> {
        if image.is_empty() {
            return Err(RetrievalError::InvalidInput("image payload is empty".into()));
        }
        self.finish(self.deterministic_embedding("image", image))
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}
