//! Text embeddings for the training store.
//!
//! Two embedders are available: the OpenAI-compatible `/embeddings` endpoint
//! (see [`crate::llm::openai::OpenAiEmbedder`]) when an embedding model is
//! configured, and a local feature-hashing embedder that needs no network.

use crate::error::AssistantResult;
use async_trait::async_trait;

/// Dimension of vectors produced by [`HashingEmbedder`].
pub const HASHING_DIMENSIONS: usize = 384;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>>;

    /// Identifier stored next to each vector.
    fn name(&self) -> &str;
}

/// Local embedder: FNV-1a hashed unigrams and bigrams, L2-normalised.
///
/// Deterministic across runs and platforms, so vectors persisted in a store
/// file stay comparable.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(HASHING_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dimensions];

        let unigrams = tokens.iter().map(|t| fnv1a(t.as_bytes()));
        let bigrams = tokens
            .windows(2)
            .map(|w| fnv1a(format!("{} {}", w[0], w[1]).as_bytes()));

        for hash in unigrams.chain(bigrams) {
            let bucket = (hash % self.dimensions as u64) as usize;
            // Top bit picks the sign so collisions partially cancel out
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(PRIME)
    })
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
