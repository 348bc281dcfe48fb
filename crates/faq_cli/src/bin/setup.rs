use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use faq_cli::output::preview;
use faq_cli::settings::{init_tracing, IndexArgs};
use faq_core::{load_faqs_json, FaqRetriever, SAMPLE_QUERY};

/// Rebuilds the vector index from the FAQ source file.
#[derive(Debug, Parser)]
#[command(name = "faq-setup", version, about = "Populate the FAQ vector index")]
struct Cli {
    /// FAQ JSON file (defaults to <data-dir>/faqs.json)
    #[arg(long, value_name = "PATH")]
    faqs: Option<PathBuf>,

    #[command(flatten)]
    index: IndexArgs,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = cli.index.to_config(cli.faqs);
    let faq_path = config.faq_path();

    println!("Setting up FAQ Retrieval System...");

    println!("\n1. Loading FAQs from {}", faq_path.display());
    let faqs = load_faqs_json(&faq_path)?;
    println!("   Loaded {} FAQs", faqs.len());

    println!("\n2. Opening vector index in {}", config.index_dir().display());
    let mut retriever = FaqRetriever::open(&config).context("open retriever")?;
    if retriever.stats().total_faqs > 0 {
        retriever.reset()?;
        println!("   Cleared existing collection");
    }

    println!("\n3. Adding FAQs to {}", config.collection_name);
    let added = retriever.add_faqs(&faqs).context("index faqs")?;
    println!("   Added {added} FAQs");

    let stats = retriever.stats();
    println!("\nSetup complete! {} FAQs indexed", stats.total_faqs);

    println!("\n4. Testing with sample query...");
    let results = retriever.retrieve(SAMPLE_QUERY, 3)?;
    match results.first() {
        Some(top) => {
            println!("\nTop result:");
            println!("  Q: {}", top.question);
            println!("  A: {}", preview(&top.answer, 100));
            println!("  Score: {:.3}", top.score);
            println!("  Confidence: {}", top.confidence);
        }
        None => println!("\nNo relevant FAQs found."),
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
