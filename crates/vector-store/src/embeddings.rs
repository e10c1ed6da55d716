use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use std::time::Duration;

/// Text to vector model. Implementations must return vectors of one fixed dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier recorded in logs.
    fn model_id(&self) -> &str;

    /// Output dimension, when known before the first call.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// Run `embedder.embed` with an optional deadline; timing out counts as an embedder failure.
pub async fn embed_with_timeout(
    embedder: &dyn Embedder,
    text: &str,
    timeout: Option<Duration>,
) -> Result<Vec<f32>> {
    let Some(limit) = timeout else {
        return embedder.embed(text).await;
    };
    match tokio::time::timeout(limit, embedder.embed(text)).await {
        Ok(result) => result,
        Err(_) => Err(VectorStoreError::EmbedderFailure(format!(
            "{} timed out after {}ms",
            embedder.model_id(),
            limit.as_millis()
        ))),
    }
}

/// Deterministic offline embedder: hashes the text into a seeded unit vector.
///
/// Identical text maps to identical vectors, distinct text to unrelated ones. Useful for
/// tests and for running the pipeline without a model server.
#[derive(Clone, Debug)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub const MODEL_ID: &'static str = "stub";
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(stub_embed(text, self.dimension))
    }

    fn model_id(&self) -> &str {
        Self::MODEL_ID
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0])
        }

        fn model_id(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn stub_is_deterministic_and_normalized() {
        let embedder = StubEmbedder::new(16);
        let a = embedder.embed("alpha beta").await.unwrap();
        let b = embedder.embed("alpha beta").await.unwrap();
        let c = embedder.embed("gamma delta").await.unwrap();

        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert_eq!(embedder.dimension(), Some(16));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_embedder_failure() {
        let err = embed_with_timeout(&SlowEmbedder, "text", Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::EmbedderFailure(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn no_timeout_passes_through() {
        let vector = embed_with_timeout(&StubEmbedder::new(4), "text", None)
            .await
            .unwrap();
        assert_eq!(vector.len(), 4);
    }
}
