use std::path::Path;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::embed::EmbeddingProvider;
use crate::error::{FaqError, Result};
use crate::storage::read_json;

// ---------------------------------------------------------------------------
// Config (read from the model directory's config.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct BertConfig {
    hidden_size: usize,
    intermediate_size: usize,
    num_attention_heads: usize,
    num_hidden_layers: usize,
    vocab_size: usize,
    max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    layer_norm_eps: f64,
}

fn default_type_vocab_size() -> usize {
    2
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl BertConfig {
    fn head_dim(&self) -> Result<usize> {
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            return Err(FaqError::InvalidModel(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        Ok(self.hidden_size / self.num_attention_heads)
    }
}

// ---------------------------------------------------------------------------
// Layer norm (with bias)
// ---------------------------------------------------------------------------

struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    fn load(vb: VarBuilder, hidden_size: usize, eps: f64) -> Result<Self> {
        let weight = vb.get(hidden_size, "weight")?;
        let bias = vb.get(hidden_size, "bias")?;
        Ok(Self { weight, bias, eps })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x_dtype = x.dtype();
        let x = x.to_dtype(DType::F32)?;
        let mean = x.mean_keepdim(candle_core::D::Minus1)?;
        let diff = x.broadcast_sub(&mean)?;
        let var = diff.sqr()?.mean_keepdim(candle_core::D::Minus1)?;
        let std = (var + self.eps)?.sqrt()?;
        let normed = diff.broadcast_div(&std)?;
        let out = normed
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)?;
        Ok(out.to_dtype(x_dtype)?)
    }
}

// ---------------------------------------------------------------------------
// Self-attention
// ---------------------------------------------------------------------------

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    output_norm: LayerNorm,
    num_heads: usize,
    head_dim: usize,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        let h = config.hidden_size;
        let attn_vb = vb.pp("attention");

        let query = candle_nn::linear(h, h, attn_vb.pp("self").pp("query"))?;
        let key = candle_nn::linear(h, h, attn_vb.pp("self").pp("key"))?;
        let value = candle_nn::linear(h, h, attn_vb.pp("self").pp("value"))?;
        let output = candle_nn::linear(h, h, attn_vb.pp("output").pp("dense"))?;
        let output_norm = LayerNorm::load(
            attn_vb.pp("output").pp("LayerNorm"),
            h,
            config.layer_norm_eps,
        )?;

        Ok(Self {
            query,
            key,
            value,
            output,
            output_norm,
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim()?,
        })
    }

    fn split_heads(&self, t: Tensor, batch: usize, seq_len: usize) -> Result<Tensor> {
        Ok(t.reshape((batch, seq_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?)
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;

        let q = self.split_heads(self.query.forward(x)?, batch, seq_len)?;
        let k = self.split_heads(self.key.forward(x)?, batch, seq_len)?;
        let v = self.split_heads(self.value.forward(x)?, batch, seq_len)?;

        let scale = (self.head_dim as f64).sqrt();
        let weights = q.matmul(&k.t()?)?.affine(1.0 / scale, 0.0)?;
        let weights = candle_nn::ops::softmax(&weights, candle_core::D::Minus1)?;
        let attn = weights.matmul(&v)?.transpose(1, 2)?.contiguous()?.reshape((
            batch,
            seq_len,
            self.num_heads * self.head_dim,
        ))?;

        let attn = self.output.forward(&attn)?;
        self.output_norm.forward(&(x + attn)?)
    }
}

// ---------------------------------------------------------------------------
// FFN (up + GELU + down) + post-norm
// ---------------------------------------------------------------------------

struct FeedForward {
    up: Linear,
    down: Linear,
    output_norm: LayerNorm,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        let up = candle_nn::linear(
            config.hidden_size,
            config.intermediate_size,
            vb.pp("intermediate").pp("dense"),
        )?;
        let down = candle_nn::linear(
            config.intermediate_size,
            config.hidden_size,
            vb.pp("output").pp("dense"),
        )?;
        let output_norm = LayerNorm::load(
            vb.pp("output").pp("LayerNorm"),
            config.hidden_size,
            config.layer_norm_eps,
        )?;
        Ok(Self {
            up,
            down,
            output_norm,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.up.forward(x)?.gelu_erf()?;
        let h = self.down.forward(&h)?;
        self.output_norm.forward(&(x + h)?)
    }
}

struct EncoderLayer {
    attention: SelfAttention,
    ffn: FeedForward,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        Ok(Self {
            attention: SelfAttention::load(vb.clone(), config)?,
            ffn: FeedForward::load(vb, config)?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.attention.forward(x)?;
        self.ffn.forward(&x)
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

struct SentenceEncoder {
    word_embeddings: Tensor,
    position_embeddings: Tensor,
    token_type_embeddings: Tensor,
    embedding_norm: LayerNorm,
    layers: Vec<EncoderLayer>,
    max_positions: usize,
}

impl SentenceEncoder {
    fn load(weights: &Path, config: &BertConfig, device: &Device) -> Result<Self> {
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? };
        // Plain BertModel exports have no prefix; full checkpoints nest under `bert.`.
        let vb = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            vb.pp("bert")
        } else {
            vb
        };

        let emb_vb = vb.pp("embeddings");
        let word_embeddings = emb_vb
            .pp("word_embeddings")
            .get((config.vocab_size, config.hidden_size), "weight")?;
        let position_embeddings = emb_vb.pp("position_embeddings").get(
            (config.max_position_embeddings, config.hidden_size),
            "weight",
        )?;
        let token_type_embeddings = emb_vb
            .pp("token_type_embeddings")
            .get((config.type_vocab_size, config.hidden_size), "weight")?;
        let embedding_norm = LayerNorm::load(
            emb_vb.pp("LayerNorm"),
            config.hidden_size,
            config.layer_norm_eps,
        )?;

        let layers = (0..config.num_hidden_layers)
            .map(|i| EncoderLayer::load(vb.pp("encoder").pp("layer").pp(i.to_string()), config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            embedding_norm,
            layers,
            max_positions: config.max_position_embeddings,
        })
    }

    fn forward(&self, token_ids: &[u32]) -> Result<Vec<f32>> {
        let device = self.word_embeddings.device();
        let seq_len = token_ids.len();

        let ids = Tensor::new(token_ids, device)?;
        let word_emb = self.word_embeddings.index_select(&ids, 0)?;

        let position_ids: Vec<u32> = (0..seq_len as u32).collect();
        let position_ids = Tensor::new(position_ids.as_slice(), device)?;
        let pos_emb = self.position_embeddings.index_select(&position_ids, 0)?;

        let token_type_ids = Tensor::zeros(seq_len, DType::U32, device)?;
        let type_emb = self
            .token_type_embeddings
            .index_select(&token_type_ids, 0)?;

        let mut hidden = ((word_emb + pos_emb)? + type_emb)?;
        hidden = self.embedding_norm.forward(&hidden)?.unsqueeze(0)?;

        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        // Mean pooling over tokens, then L2 normalisation.
        let pooled = hidden.mean(1)?.squeeze(0)?;
        let norm: f32 = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar()?;
        let pooled = if norm > 0.0 {
            pooled.affine(1.0 / norm as f64, 0.0)?
        } else {
            pooled
        };

        Ok(pooled.to_vec1::<f32>()?)
    }
}

// ---------------------------------------------------------------------------
// Public provider
// ---------------------------------------------------------------------------

/// BERT-family sentence encoder (MiniLM and friends) on CPU.
///
/// Loads a Hugging Face style directory holding `config.json`,
/// `model.safetensors` and `tokenizer.json`.
pub struct MiniLmEmbeddingProvider {
    encoder: SentenceEncoder,
    tokenizer: tokenizers::Tokenizer,
    name: String,
    dim: usize,
}

impl MiniLmEmbeddingProvider {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let config: BertConfig = read_json(&model_dir.join("config.json"))?;
        let weights = model_dir.join("model.safetensors");
        if !weights.exists() {
            return Err(FaqError::InvalidModel(format!(
                "missing {}",
                weights.display()
            )));
        }

        info!(
            model = %model_dir.display(),
            layers = config.num_hidden_layers,
            hidden = config.hidden_size,
            "loading sentence encoder"
        );
        let encoder = SentenceEncoder::load(&weights, &config, &Device::Cpu)?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| FaqError::Tokenizer(format!("{}: {e}", tokenizer_path.display())))?;

        let name = model_dir
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| crate::config::DEFAULT_MODEL_ID.to_string());

        Ok(Self {
            encoder,
            tokenizer,
            name,
            dim: config.hidden_size,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| FaqError::Tokenizer(e.to_string()))?;
        let ids = truncate_ids(encoding.get_ids(), self.encoder.max_positions);
        debug!(tokens = ids.len(), "encoding");
        self.encoder.forward(&ids)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Keeps the first `max - 1` ids and the final (separator) id.
fn truncate_ids(ids: &[u32], max: usize) -> Vec<u32> {
    if ids.len() <= max || max == 0 {
        return ids.to_vec();
    }
    let mut out = ids[..max - 1].to_vec();
    if let Some(last) = ids.last() {
        out.push(*last);
    }
    out
}
