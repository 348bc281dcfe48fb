use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{FaqError, Result};
use crate::model::{CollectionMeta, FaqEntry, IndexRecord, Neighbor};
use crate::retrieval::cosine_similarity;
use crate::storage::{load_records_jsonl, read_json, save_records_jsonl, write_json};

/// Nearest-neighbour store over question embeddings.
pub trait VectorIndex {
    fn name(&self) -> &str;

    fn count(&self) -> usize;

    /// Name of the embedder the collection was built with, once populated.
    fn embedder(&self) -> Option<&str>;

    fn add(&mut self, entries: &[FaqEntry], embeddings: Vec<Vec<f32>>, embedder: &str)
        -> Result<()>;

    /// Up to `n` neighbours ordered by ascending cosine distance.
    fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<Neighbor>>;

    /// Drops every record in the collection.
    fn reset(&mut self) -> Result<()>;
}

/// Exhaustive cosine index persisted as `<dir>/<name>.jsonl` plus
/// `<dir>/<name>.meta.json`.
#[derive(Debug)]
pub struct FlatIndex {
    name: String,
    dir: Option<PathBuf>,
    meta: Option<CollectionMeta>,
    records: Vec<IndexRecord>,
}

impl FlatIndex {
    /// Opens the collection `name` under `dir`, creating the directory when
    /// missing. An absent collection opens empty.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        validate_name(name)?;
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| FaqError::io(&dir, e))?;

        let mut index = Self {
            name: name.to_string(),
            dir: Some(dir),
            meta: None,
            records: Vec::new(),
        };

        if let Some(meta_path) = index.meta_path().filter(|p| p.exists()) {
            index.meta = Some(read_json(&meta_path)?);
        }
        if let Some(records_path) = index.records_path().filter(|p| p.exists()) {
            index.records = load_records_jsonl(&records_path)?;
        }

        info!(
            collection = %index.name,
            records = index.records.len(),
            "opened collection"
        );
        Ok(index)
    }

    /// A collection that is never written to disk.
    pub fn in_memory(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            dir: None,
            meta: None,
            records: Vec::new(),
        })
    }

    pub fn dimension(&self) -> Option<usize> {
        self.meta.as_ref().map(|m| m.dimension)
    }

    fn records_path(&self) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("{}.jsonl", self.name)))
    }

    fn meta_path(&self) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("{}.meta.json", self.name)))
    }

    fn persist(&self, records: &[IndexRecord], meta: &CollectionMeta) -> Result<()> {
        if let (Some(records_path), Some(meta_path)) = (self.records_path(), self.meta_path()) {
            save_records_jsonl(&records_path, records)?;
            write_json(&meta_path, meta)?;
        }
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self) -> usize {
        self.records.len()
    }

    fn embedder(&self) -> Option<&str> {
        self.meta.as_ref().map(|m| m.embedder.as_str())
    }

    fn add(
        &mut self,
        entries: &[FaqEntry],
        embeddings: Vec<Vec<f32>>,
        embedder: &str,
    ) -> Result<()> {
        if entries.len() != embeddings.len() {
            return Err(FaqError::BatchMismatch {
                entries: entries.len(),
                embeddings: embeddings.len(),
            });
        }
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(built_with) = self.embedder() {
            if built_with != embedder {
                return Err(FaqError::EmbedderMismatch {
                    built_with: built_with.to_string(),
                    current: embedder.to_string(),
                });
            }
        }

        let expected = self.dimension().unwrap_or(embeddings[0].len());
        let mut seen: HashSet<&str> = self.records.iter().map(|r| r.entry.id.as_str()).collect();
        for (entry, embedding) in entries.iter().zip(&embeddings) {
            if embedding.len() != expected {
                return Err(FaqError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(FaqError::DuplicateId(entry.id.clone()));
            }
        }

        let meta = self.meta.clone().unwrap_or_else(|| CollectionMeta {
            name: self.name.clone(),
            dimension: expected,
            embedder: embedder.to_string(),
            created_at: Utc::now(),
        });

        let mut records = self.records.clone();
        for (entry, embedding) in entries.iter().zip(embeddings) {
            debug!(id = %entry.id, "indexing faq");
            records.push(IndexRecord {
                entry: entry.clone(),
                embedding,
            });
        }

        // Memory only changes once the collection is on disk.
        self.persist(&records, &meta)?;
        self.records = records;
        self.meta = Some(meta);
        info!(collection = %self.name, added = entries.len(), total = self.records.len(), "added faqs");
        Ok(())
    }

    fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<Neighbor>> {
        if n == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension() {
            if embedding.len() != expected {
                return Err(FaqError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut scored: Vec<(&IndexRecord, f32)> = self
            .records
            .iter()
            .map(|r| (r, 1.0 - cosine_similarity(embedding, &r.embedding)))
            .collect();

        // Stable sort: equal distances keep insertion order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(n)
            .map(|(record, distance)| Neighbor {
                entry: record.entry.clone(),
                distance,
            })
            .collect())
    }

    fn reset(&mut self) -> Result<()> {
        self.records.clear();
        self.meta = None;
        for path in [self.records_path(), self.meta_path()].into_iter().flatten() {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(FaqError::io(&path, e)),
            }
        }
        info!(collection = %self.name, "cleared collection");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(FaqError::InvalidCollection(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> FaqEntry {
        FaqEntry {
            id: id.to_string(),
            question: format!("question {id}"),
            answer: format!("answer {id}"),
        }
    }

    fn seeded() -> FlatIndex {
        let mut index = FlatIndex::in_memory("faqs").unwrap();
        index
            .add(
                &[entry("x"), entry("y"), entry("xy")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
                "test",
            )
            .unwrap();
        index
    }

    #[test]
    fn query_orders_by_ascending_distance() {
        let index = seeded();
        let hits = index.query(&[1.0, 0.1], 3).unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.entry.id.as_str()).collect();
        assert_eq!(ids, ["x", "xy", "y"]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(hits[0].distance < 0.01);
    }

    #[test]
    fn query_caps_at_n_and_collection_size() {
        let index = seeded();
        assert_eq!(index.query(&[1.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.query(&[1.0, 0.0], 10).unwrap().len(), 3);
        assert!(index.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn opposite_vector_has_distance_two() {
        let index = seeded();
        let hits = index.query(&[-1.0, 0.0], 3).unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.entry.id.as_str()).collect();
        assert_eq!(ids, ["y", "xy", "x"]);
        assert!((hits[2].distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut index = seeded();
        let err = index
            .add(&[entry("y")], vec![vec![0.5, 0.5]], "test")
            .unwrap_err();
        assert!(matches!(err, FaqError::DuplicateId(id) if id == "y"));
        assert_eq!(index.count(), 3);

        let mut fresh = FlatIndex::in_memory("faqs").unwrap();
        let err = fresh
            .add(&[entry("a"), entry("a")], vec![vec![1.0], vec![1.0]], "test")
            .unwrap_err();
        assert!(matches!(err, FaqError::DuplicateId(_)));
        assert_eq!(fresh.count(), 0);
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut index = seeded();
        let err = index
            .add(&[entry("z")], vec![vec![1.0, 0.0, 0.0]], "test")
            .unwrap_err();
        assert!(matches!(
            err,
            FaqError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(matches!(
            index.query(&[1.0], 1),
            Err(FaqError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_batch_mismatch() {
        let mut index = FlatIndex::in_memory("faqs").unwrap();
        let err = index.add(&[entry("a")], Vec::new(), "test").unwrap_err();
        assert!(matches!(err, FaqError::BatchMismatch { .. }));
    }

    #[test]
    fn persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("nested/index");
        {
            let mut index = FlatIndex::open(&index_dir, "faq_collection").unwrap();
            assert_eq!(index.count(), 0);
            index
                .add(&[entry("a"), entry("b")], vec![vec![1.0, 0.0], vec![0.0, 1.0]], "hash-2")
                .unwrap();
        }

        let reopened = FlatIndex::open(&index_dir, "faq_collection").unwrap();
        assert_eq!(reopened.count(), 2);
        assert_eq!(reopened.dimension(), Some(2));
        assert_eq!(reopened.embedder(), Some("hash-2"));
        assert_eq!(reopened.query(&[0.0, 1.0], 1).unwrap()[0].entry.id, "b");

        let other = FlatIndex::open(&index_dir, "other").unwrap();
        assert_eq!(other.count(), 0);
    }

    #[test]
    fn reset_clears_disk_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = FlatIndex::open(dir.path(), "faqs").unwrap();
        index.add(&[entry("a")], vec![vec![1.0, 0.0]], "test").unwrap();
        index.reset().unwrap();
        assert_eq!(index.count(), 0);
        assert_eq!(index.embedder(), None);

        // A reset collection accepts a new dimension.
        index.add(&[entry("a")], vec![vec![1.0, 0.0, 0.0]], "test").unwrap();
        drop(index);
        let reopened = FlatIndex::open(dir.path(), "faqs").unwrap();
        assert_eq!(reopened.dimension(), Some(3));
    }

    #[test]
    fn rejects_other_embedder_on_add() {
        let mut index = seeded();
        let err = index
            .add(&[entry("z")], vec![vec![0.0, 1.0]], "other")
            .unwrap_err();
        assert!(matches!(
            err,
            FaqError::EmbedderMismatch { ref built_with, ref current }
                if built_with == "test" && current == "other"
        ));
        assert_eq!(index.count(), 3);
    }

    #[test]
    fn failed_write_leaves_collection_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let mut index = FlatIndex::open(&index_dir, "faqs").unwrap();
        index.add(&[entry("a")], vec![vec![1.0, 0.0]], "test").unwrap();

        fs::remove_dir_all(&index_dir).unwrap();
        let err = index
            .add(&[entry("b")], vec![vec![0.0, 1.0]], "test")
            .unwrap_err();
        assert!(matches!(err, FaqError::Io { .. }));
        assert_eq!(index.count(), 1);

        // The unpersisted id is not remembered as a duplicate.
        fs::create_dir_all(&index_dir).unwrap();
        index.add(&[entry("b")], vec![vec![0.0, 1.0]], "test").unwrap();
        assert_eq!(index.count(), 2);
        let reopened = FlatIndex::open(&index_dir, "faqs").unwrap();
        assert_eq!(reopened.count(), 2);
    }

    #[test]
    fn rejects_bad_collection_names() {
        assert!(FlatIndex::in_memory("").is_err());
        assert!(FlatIndex::in_memory("../escape").is_err());
        assert!(FlatIndex::in_memory(".hidden").is_err());
        assert!(FlatIndex::in_memory("faq_collection-v2.1").is_ok());
    }
}
