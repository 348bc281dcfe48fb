use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use faq_cli::output::{write_eval_text, write_results, write_results_json, OutputFormat};
use faq_cli::settings::{init_tracing, IndexArgs};
use faq_core::{
    evaluate_cases, load_eval_cases, EmbeddingProvider, FaqRetriever, VectorIndex, DEFAULT_TOP_K,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "faq", version, about = "FAQ Retrieval Assistant")]
struct Cli {
    /// Your question
    query: Vec<String>,

    /// Start interactive mode (text output only)
    #[arg(short, long, conflicts_with = "format")]
    interactive: bool,

    /// Number of results to retrieve
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Score a JSON array of labelled cases against the index
    #[arg(long, value_name = "PATH")]
    eval: Option<PathBuf>,

    #[command(flatten)]
    index: IndexArgs,
}

fn interactive_mode<E, I>(retriever: &FaqRetriever<E, I>, top_k: usize) -> Result<()>
where
    E: EmbeddingProvider,
    I: VectorIndex,
{
    println!("FAQ RETRIEVAL ASSISTANT - Interactive Mode");
    println!("Type your question (or 'quit' to exit)\n");

    let mut rl = DefaultEditor::new()?;
    let mut stdout = io::stdout();

    loop {
        let line = match rl.readline("Your question: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let query = line.trim();
        if matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("\nGoodbye!\n");
            break;
        }
        if query.is_empty() {
            continue;
        }

        rl.add_history_entry(query).ok();
        let results = retriever.retrieve(query, top_k)?;
        write_results(&mut stdout, &results)?;
        stdout.flush()?;
    }

    Ok(())
}

fn run_eval<E, I>(
    retriever: &FaqRetriever<E, I>,
    cases: &Path,
    top_k: usize,
    format: OutputFormat,
) -> Result<()>
where
    E: EmbeddingProvider,
    I: VectorIndex,
{
    let cases = load_eval_cases(cases)?;
    let summary = evaluate_cases(retriever, &cases, top_k)?;
    let mut stdout = io::stdout();
    match format {
        OutputFormat::Text => write_eval_text(&mut stdout, &summary)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &summary)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if !cli.interactive && cli.query.is_empty() && cli.eval.is_none() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let text = cli.format == OutputFormat::Text;
    if text {
        println!("\nLoading FAQ Retrieval System...");
    }
    let config = cli.index.to_config(None);
    debug!(?config, "opening retriever");
    let retriever = FaqRetriever::open(&config)
        .with_context(|| format!("open index in {}", config.index_dir().display()))?;
    let stats = retriever.stats();
    if text {
        println!("Ready! Loaded {} FAQs from database\n", stats.total_faqs);
    }

    if let Some(cases) = &cli.eval {
        return run_eval(&retriever, cases, cli.top_k, cli.format);
    }

    if cli.interactive {
        return interactive_mode(&retriever, cli.top_k);
    }

    let query = cli.query.join(" ");
    let results = retriever.retrieve(&query, cli.top_k)?;
    let mut stdout = io::stdout();
    match cli.format {
        OutputFormat::Text => write_results(&mut stdout, &results)?,
        OutputFormat::Json => write_results_json(&mut stdout, &query, Some(&stats), &results)?,
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn parses_defaults() {
        let cli = Cli::try_parse_from(["faq", "how", "do", "I", "reset"]).expect("parse");
        assert_eq!(cli.query, vec!["how", "do", "I", "reset"]);
        assert_eq!(cli.top_k, 3);
        assert!(!cli.interactive);
        assert!(cli.eval.is_none());
    }

    #[test]
    fn parses_interactive_and_top_k() {
        let cli = Cli::try_parse_from(["faq", "-i", "--top-k", "5"]).expect("parse");
        assert!(cli.interactive);
        assert_eq!(cli.top_k, 5);
        assert!(cli.query.is_empty());
    }

    #[test]
    fn interactive_rejects_explicit_format() {
        let err = Cli::try_parse_from(["faq", "-i", "--format", "json"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_non_numeric_top_k() {
        assert!(Cli::try_parse_from(["faq", "--top-k", "many", "q"]).is_err());
    }
}
