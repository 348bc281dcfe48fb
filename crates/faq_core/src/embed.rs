use crate::error::Result;

pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier stored with a collection so queries use a matching model.
    fn name(&self) -> String;
}

impl EmbeddingProvider for Box<dyn EmbeddingProvider> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// Bag-of-tokens embedding: FNV-1a hashes each lowercase alphanumeric token
/// into one of `dim` buckets, then L2-normalises.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut h: u64 = 1469598103934665603;
            for b in token.as_bytes() {
                h ^= *b as u64;
                h = h.wrapping_mul(1099511628211);
            }
            v[(h as usize) % self.dim] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }

        Ok(v)
    }

    fn name(&self) -> String {
        format!("hash-{}", self.dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::cosine_similarity;

    #[test]
    fn same_tokens_embed_identically() {
        let p = HashEmbeddingProvider::new(64);
        let a = p.embed("How do I reset my password?").unwrap();
        let b = p.embed("how do i RESET my password").unwrap();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn output_is_unit_length() {
        let p = HashEmbeddingProvider::default();
        let v = p.embed("shipping to Canada").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_eq!(v.len(), crate::config::DEFAULT_EMBEDDING_DIM);
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let p = HashEmbeddingProvider::new(4);
        let v = p.embed("  ?! ").unwrap();
        assert_eq!(v.len(), 8);
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(p.name(), "hash-8");
    }
}
