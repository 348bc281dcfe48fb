use std::path::PathBuf;

use clap::Args;
use faq_core::{RetrieverConfig, DEFAULT_COLLECTION, DEFAULT_DATA_DIR};
use tracing_subscriber::EnvFilter;

/// Index location options shared by `faq` and `faq-setup`.
#[derive(Debug, Clone, Args)]
pub struct IndexArgs {
    /// Directory holding faqs.json and the vector index
    #[arg(long, env = "FAQ_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[arg(long, env = "FAQ_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Sentence encoder directory (config.json, model.safetensors, tokenizer.json).
    /// Without it a token-hashing embedder is used.
    #[arg(long, env = "FAQ_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

impl IndexArgs {
    pub fn to_config(&self, faq_path: Option<PathBuf>) -> RetrieverConfig {
        RetrieverConfig {
            data_dir: self.data_dir.clone(),
            collection_name: self.collection.clone(),
            model_dir: self.model_dir.clone(),
            faq_path,
        }
    }
}

/// Logs go to stderr so stdout only carries results.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
