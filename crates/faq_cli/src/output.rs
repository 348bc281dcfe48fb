use std::io::{self, Write};

use clap::ValueEnum;
use faq_core::{EvalSummary, IndexStats, QueryResult};
use serde::Serialize;

const ANSWER_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// First `max` characters of `answer`, with `...` when cut.
pub fn preview(answer: &str, max: usize) -> String {
    match answer.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &answer[..cut]),
        None => answer.to_string(),
    }
}

pub fn write_results<W: Write>(out: &mut W, results: &[QueryResult]) -> io::Result<()> {
    let Some(best) = results.first() else {
        writeln!(out, "No relevant FAQs found.")?;
        return writeln!(out);
    };

    writeln!(out, "Top {} Matching FAQs:", results.len())?;
    writeln!(out)?;
    for (i, result) in results.iter().enumerate() {
        writeln!(
            out,
            "{}. [ID: {}] Score: {:.4} | Confidence: {}",
            i + 1,
            result.id,
            result.score,
            result.confidence
        )?;
        writeln!(out, "   Q: {}", result.question)?;
        writeln!(out, "   A: {}", preview(&result.answer, ANSWER_PREVIEW_CHARS))?;
        writeln!(out)?;
    }

    writeln!(out, "BEST MATCHING ANSWER:")?;
    writeln!(
        out,
        "Confidence: {} (Score: {:.4})",
        best.confidence, best.score
    )?;
    writeln!(out)?;
    writeln!(out, "Q: {}", best.question)?;
    writeln!(out)?;
    writeln!(out, "A: {}", best.answer)?;
    writeln!(out)
}

#[derive(Serialize)]
struct JsonResponse<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a IndexStats>,
    results: &'a [QueryResult],
}

pub fn write_results_json<W: Write>(
    out: &mut W,
    query: &str,
    stats: Option<&IndexStats>,
    results: &[QueryResult],
) -> io::Result<()> {
    let response = JsonResponse {
        query,
        stats,
        results,
    };
    serde_json::to_writer_pretty(&mut *out, &response)?;
    writeln!(out)
}

pub fn write_eval_text<W: Write>(out: &mut W, summary: &EvalSummary) -> io::Result<()> {
    for o in &summary.outcomes {
        writeln!(
            out,
            "case={} passed={} faq_id={} confidence={} score={} latency={:.1}ms",
            o.case_id,
            o.passed,
            o.actual_faq_id.as_deref().unwrap_or("null"),
            o.actual_confidence
                .map(|c| c.as_str())
                .unwrap_or("null"),
            o.score
                .map(|s| format!("{s:.4}"))
                .unwrap_or_else(|| "null".to_string()),
            o.latency_ms
        )?;
    }
    writeln!(
        out,
        "total={} passed={} failed={} pass_rate={:.4}",
        summary.total, summary.passed, summary.failed, summary.pass_rate
    )
}
