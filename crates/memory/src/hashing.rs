//! Offline embedder based on feature hashing.
//!
//! Each lowercase word is hashed (FNV-1a) into one of `dimensions` buckets
//! with a hash-derived sign, then the vector is L2-normalized. Texts sharing
//! words land close together under cosine similarity, which is enough for
//! the in-memory backend and for tests that must not touch the network.

use async_trait::async_trait;
use chatrecall_core::error::ProviderError;
use chatrecall_core::index::Embedder;

use crate::vector::normalize;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;

    #[tokio::test]
    async fn shared_words_score_higher() {
        let embedder = HashingEmbedder::new(128);
        let vectors = embedder
            .embed(&[
                "Созвон по проекту в пятницу".to_string(),
                "Когда созвон по проекту?".to_string(),
                "Купить молоко и хлеб".to_string(),
            ])
            .await
            .unwrap();

        let related = cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
    }

    #[tokio::test]
    async fn vectors_are_unit_length_and_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_one("Hello, World").await.unwrap();
        let b = embedder.embed_one("hello world").await.unwrap();
        assert_eq!(a.len(), 256);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn punctuation_only_text_is_the_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        let v = embedder.embed_one("?!...").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
