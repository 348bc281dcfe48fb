pub mod confidence;
pub mod config;
pub mod embed;
pub mod error;
pub mod eval;
pub mod index;
pub mod minilm_embed;
pub mod model;
pub mod retrieval;
pub mod storage;

pub use confidence::{classify, ScoreClassifier, HIGH_THRESHOLD, MEDIUM_THRESHOLD};
pub use config::{
    RetrieverConfig, DEFAULT_COLLECTION, DEFAULT_DATA_DIR, DEFAULT_EMBEDDING_DIM,
    DEFAULT_MODEL_ID, DEFAULT_TOP_K, SAMPLE_QUERY,
};
pub use embed::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{FaqError, Result};
pub use eval::{evaluate_cases, load_eval_cases, CaseExpectation, EvalCase, EvalOutcome, EvalSummary};
pub use index::{FlatIndex, VectorIndex};
pub use minilm_embed::MiniLmEmbeddingProvider;
pub use model::{
    CollectionMeta, Confidence, FaqEntry, IndexRecord, IndexStats, Neighbor, QueryResult,
};
pub use retrieval::{cosine_similarity, FaqRetriever};
pub use storage::{load_faqs_json, load_records_jsonl, save_records_jsonl};
