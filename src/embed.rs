//! Text → fixed-length feature vectors.
//!
//! The dataset only needs something that turns a title into a vector of
//! `f32`; any `Fn(&str) -> Vec<f32>` qualifies. [`HashingEmbedder`] is the
//! built-in choice used by the command line runner.

const FNV1A64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Default number of hash buckets.
pub const DEFAULT_DIM: usize = 768;

/// Turns a title into a fixed-length numeric vector.
pub trait Embedder {
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Length of every vector `embed` returns, when known up front.
    fn dim(&self) -> Option<usize> {
        None
    }
}

impl<F> Embedder for F
where
    F: Fn(&str) -> Vec<f32>,
{
    fn embed(&self, text: &str) -> Vec<f32> {
        self(text)
    }
}

/// Bag-of-words feature hashing: every lowercase alphanumeric token adds
/// one to bucket `fnv1a(token) % dim`, and the result is L2-normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    /// `dim` must be positive.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut features = vec![0.0f32; self.dim];
        for token in tokens(text) {
            let bucket = (fnv1a_64(&token) % self.dim as u64) as usize;
            features[bucket] += 1.0;
        }

        let norm = features.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            features.iter_mut().for_each(|v| *v /= norm);
        }
        features
    }

    fn dim(&self) -> Option<usize> {
        Some(self.dim)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Stable across platforms and releases, unlike `DefaultHasher`.
fn fnv1a_64(input: &str) -> u64 {
    let mut hash = FNV1A64_OFFSET;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV1A64_PRIME);
    }
    hash
}
