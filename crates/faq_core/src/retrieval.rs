use tracing::{debug, info};

use crate::config::RetrieverConfig;
use crate::confidence::ScoreClassifier;
use crate::embed::{EmbeddingProvider, HashEmbeddingProvider};
use crate::error::{FaqError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::minilm_embed::MiniLmEmbeddingProvider;
use crate::model::{FaqEntry, IndexStats, QueryResult};

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

/// Embeds queries, asks the index for neighbours and labels each one.
pub struct FaqRetriever<E, I> {
    embedder: E,
    index: I,
    classifier: ScoreClassifier,
}

impl FaqRetriever<Box<dyn EmbeddingProvider>, FlatIndex> {
    /// Opens the configured collection with the configured embedder.
    pub fn open(config: &RetrieverConfig) -> Result<Self> {
        let embedder: Box<dyn EmbeddingProvider> = match &config.model_dir {
            Some(dir) => Box::new(MiniLmEmbeddingProvider::load(dir)?),
            None => Box::new(HashEmbeddingProvider::default()),
        };
        let index = FlatIndex::open(config.index_dir(), &config.collection_name)?;
        Ok(Self::new(embedder, index))
    }
}

impl<E, I> FaqRetriever<E, I>
where
    E: EmbeddingProvider,
    I: VectorIndex,
{
    pub fn new(embedder: E, index: I) -> Self {
        Self {
            embedder,
            index,
            classifier: ScoreClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: ScoreClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Embeds every question and adds the batch to the index.
    pub fn add_faqs(&mut self, faqs: &[FaqEntry]) -> Result<usize> {
        let embeddings = faqs
            .iter()
            .map(|faq| self.embedder.embed(&faq.question))
            .collect::<Result<Vec<_>>>()?;
        self.index.add(faqs, embeddings, &self.embedder.name())?;
        info!(count = faqs.len(), "added faqs to {}", self.index.name());
        Ok(faqs.len())
    }

    /// Up to `top_k` results, most similar first, in the index's order.
    /// Fails when the collection was built with a different embedder.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        let current = self.embedder.name();
        if let Some(built_with) = self.index.embedder() {
            if built_with != current {
                return Err(FaqError::EmbedderMismatch {
                    built_with: built_with.to_string(),
                    current,
                });
            }
        }

        let query = query.trim();
        let query_embedding = self.embedder.embed(query)?;
        let neighbors = self.index.query(&query_embedding, top_k)?;
        debug!(query, top_k, found = neighbors.len(), "retrieved");

        Ok(neighbors
            .into_iter()
            .map(|n| {
                let score = 1.0 - n.distance;
                QueryResult {
                    id: n.entry.id,
                    question: n.entry.question,
                    answer: n.entry.answer,
                    score,
                    confidence: self.classifier.classify(score),
                }
            })
            .collect())
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_faqs: self.index.count(),
            collection_name: self.index.name().to_string(),
        }
    }

    /// Clears the collection ahead of a full re-index.
    pub fn reset(&mut self) -> Result<()> {
        self.index.reset()
    }
}
