use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// Discrete confidence bucket for a similarity score.
///
/// Variants are declared lowest first so the derived ordering follows
/// confidence: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub score: f32,
    pub confidence: Confidence,
}

/// One persisted row of a collection: the entry plus its question embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(flatten)]
    pub entry: FaqEntry,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub entry: FaqEntry,
    /// Cosine distance, `1 - cosine_similarity`.
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub name: String,
    pub dimension: usize,
    pub embedder: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_faqs: usize,
    pub collection_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_serializes_uppercase() {
        let json = serde_json::to_string(&Confidence::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        let back: Confidence = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(back, Confidence::High);
    }

    #[test]
    fn confidence_orders_by_level() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert_eq!(Confidence::Low.to_string(), "LOW");
    }

    #[test]
    fn index_record_flattens_entry() {
        let record = IndexRecord {
            entry: FaqEntry {
                id: "faq_1".into(),
                question: "q".into(),
                answer: "a".into(),
            },
            embedding: vec![0.5, 0.5],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "faq_1");
        assert_eq!(value["embedding"].as_array().unwrap().len(), 2);
    }
}
