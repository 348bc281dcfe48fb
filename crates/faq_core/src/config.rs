use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_COLLECTION: &str = "faq_collection";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_FAQ_FILE: &str = "faqs.json";
pub const DEFAULT_INDEX_DIR: &str = "vector_index";
pub const DEFAULT_MODEL_ID: &str = "paraphrase-multilingual-MiniLM-L12-v2";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const SAMPLE_QUERY: &str = "How do I reset my password?";

/// Where the FAQ source, the index and the embedding model live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    pub data_dir: PathBuf,
    pub collection_name: String,
    /// Hugging Face style model directory. `None` selects the hash embedder.
    pub model_dir: Option<PathBuf>,
    /// Overrides `<data_dir>/faqs.json`.
    pub faq_path: Option<PathBuf>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            collection_name: DEFAULT_COLLECTION.to_string(),
            model_dir: None,
            faq_path: None,
        }
    }
}

impl RetrieverConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn faq_path(&self) -> PathBuf {
        self.faq_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_FAQ_FILE))
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_INDEX_DIR)
    }
}
