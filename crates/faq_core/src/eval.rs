use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::embed::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::model::{Confidence, QueryResult};
use crate::retrieval::FaqRetriever;
use crate::storage::read_json;

/// A labelled query. Unset expectations are not checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    pub question: String,
    #[serde(default)]
    pub expected_faq_id: Option<String>,
    #[serde(default)]
    pub expected_confidence: Option<Confidence>,
    #[serde(default)]
    pub min_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub case_id: String,
    pub passed: bool,
    pub actual_faq_id: Option<String>,
    pub actual_confidence: Option<Confidence>,
    pub score: Option<f32>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<EvalOutcome>,
}

pub fn load_eval_cases(path: &Path) -> Result<Vec<EvalCase>> {
    read_json(path)
}

pub struct CaseExpectation;

impl CaseExpectation {
    /// Checks the best result against a case. With no result only a case
    /// without expectations passes.
    pub fn matches(case: &EvalCase, best: Option<&QueryResult>) -> bool {
        let Some(best) = best else {
            return case.expected_faq_id.is_none()
                && case.expected_confidence.is_none()
                && case.min_score.is_none();
        };

        if let Some(expected) = &case.expected_faq_id {
            if &best.id != expected {
                return false;
            }
        }

        if let Some(expected) = case.expected_confidence {
            if best.confidence != expected {
                return false;
            }
        }

        if let Some(min) = case.min_score {
            if best.score < min {
                return false;
            }
        }

        true
    }
}

pub fn evaluate_cases<E, I>(
    retriever: &FaqRetriever<E, I>,
    cases: &[EvalCase],
    top_k: usize,
) -> Result<EvalSummary>
where
    E: EmbeddingProvider,
    I: VectorIndex,
{
    let mut outcomes = Vec::with_capacity(cases.len());

    for case in cases {
        let start = Instant::now();
        let results = retriever.retrieve(&case.question, top_k.max(1))?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let best = results.first();
        outcomes.push(EvalOutcome {
            case_id: case.case_id.clone(),
            passed: CaseExpectation::matches(case, best),
            actual_faq_id: best.map(|r| r.id.clone()),
            actual_confidence: best.map(|r| r.confidence),
            score: best.map(|r| r.score),
            latency_ms,
        });
    }

    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    let failed = total.saturating_sub(passed);
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };

    Ok(EvalSummary {
        total,
        passed,
        failed,
        pass_rate,
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;
    use crate::index::FlatIndex;
    use crate::model::FaqEntry;

    fn retriever() -> FaqRetriever<HashEmbeddingProvider, FlatIndex> {
        let mut r = FaqRetriever::new(
            HashEmbeddingProvider::new(256),
            FlatIndex::in_memory("eval").unwrap(),
        );
        r.add_faqs(&[
            FaqEntry {
                id: "pw".into(),
                question: "How do I reset my password?".into(),
                answer: "Use the reset link.".into(),
            },
            FaqEntry {
                id: "ship".into(),
                question: "Do you ship internationally?".into(),
                answer: "Yes, to 40 countries.".into(),
            },
        ])
        .unwrap();
        r
    }

    fn case(id: &str, question: &str) -> EvalCase {
        EvalCase {
            case_id: id.into(),
            question: question.into(),
            expected_faq_id: None,
            expected_confidence: None,
            min_score: None,
        }
    }

    #[test]
    fn summarises_pass_and_fail() {
        let r = retriever();
        let cases = vec![
            EvalCase {
                expected_faq_id: Some("pw".into()),
                expected_confidence: Some(Confidence::High),
                ..case("c1", "How do I reset my password?")
            },
            EvalCase {
                expected_faq_id: Some("pw".into()),
                ..case("c2", "Do you ship internationally?")
            },
            EvalCase {
                min_score: Some(0.99),
                ..case("c3", "ship")
            },
        ];

        let summary = evaluate_cases(&r, &cases, 3).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        assert!((summary.pass_rate - 1.0 / 3.0).abs() < 1e-6);
        assert!(summary.outcomes[0].passed);
        assert_eq!(summary.outcomes[1].actual_faq_id.as_deref(), Some("ship"));
    }

    #[test]
    fn no_results_only_passes_without_expectations() {
        let empty = FaqRetriever::new(
            HashEmbeddingProvider::new(16),
            FlatIndex::in_memory("empty").unwrap(),
        );
        let cases = vec![
            case("open", "anything"),
            EvalCase {
                expected_faq_id: Some("pw".into()),
                ..case("strict", "anything")
            },
        ];
        let summary = evaluate_cases(&empty, &cases, 3).unwrap();
        assert!(summary.outcomes[0].passed);
        assert!(!summary.outcomes[1].passed);
        assert_eq!(summary.outcomes[1].score, None);
    }

    #[test]
    fn cases_parse_with_optional_fields() {
        let cases: Vec<EvalCase> = serde_json::from_str(
            r#"[{"case_id":"a","question":"q","expected_confidence":"MEDIUM"}]"#,
        )
        .unwrap();
        assert_eq!(cases[0].expected_confidence, Some(Confidence::Medium));
        assert!(cases[0].expected_faq_id.is_none());
    }

    #[test]
    fn empty_case_list() {
        let summary = evaluate_cases(&retriever(), &[], 3).unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.pass_rate, 0.0);
    }
}
