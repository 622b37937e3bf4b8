//! Framegraph CLI - Command-line interface for the annotation graph engine

use clap::{Parser, Subcommand};
use framegraph::corpus::Corpus;
use framegraph::{Sentence, max_constituents_for_nodes, max_constituents_smc};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "framegraph")]
#[command(version = "0.1.0")]
#[command(about = "Frame-semantic annotation graph engine")]
#[command(long_about = r#"
Framegraph reads annotated corpus files, giving you:
  • Validation of the sentence markup and its cross-references
  • Lossless re-serialization of whole corpora
  • Annotation statistics per sentence and corpus
  • Projection of word sets onto maximal constituents

Example usage:
  framegraph validate --corpus corpus.xml
  framegraph roundtrip --corpus corpus.xml --output out.xml
  framegraph stats --corpus corpus.xml --json
  framegraph project --corpus corpus.xml --sentence s42 --nodes s42_3,s42_4
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse every sentence of a corpus and report problems
    Validate {
        /// Path to the corpus file
        #[arg(short, long)]
        corpus: PathBuf,
    },

    /// Parse and re-serialize a corpus sentence by sentence
    Roundtrip {
        /// Path to the corpus file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show annotation statistics
    Stats {
        /// Path to the corpus file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Emit JSON instead of text
        #[arg(short, long)]
        json: bool,
    },

    /// Project a set of word nodes onto maximal constituents
    Project {
        /// Path to the corpus file
        #[arg(short, long)]
        corpus: PathBuf,

        /// ID of the sentence to project in
        #[arg(short, long)]
        sentence: String,

        /// Comma-separated node IDs
        #[arg(short, long)]
        nodes: String,

        /// Use the recursive classification with single-missing-child absorption
        #[arg(long)]
        smc: bool,

        /// Skip terminals with empty words
        #[arg(long)]
        ignore_empty_terminals: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Validate { corpus } => {
            let corpus = Corpus::open(&corpus)?;
            println!("🔍 Validating {} sentences...", corpus.len());

            let mut failures = 0;
            for (i, result) in corpus.sentences().enumerate() {
                match result {
                    Ok(sentence) => {
                        for frame in sentence.frames() {
                            if frame.target_id().is_none() {
                                println!(
                                    "⚠️  {}: frame {} has no target",
                                    sentence.id(),
                                    frame.id()
                                );
                            }
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        println!("❌ Sentence #{}: {}", i + 1, e);
                    }
                }
            }

            if failures == 0 {
                println!("✅ All sentences parse cleanly.");
            } else {
                anyhow::bail!("{failures} of {} sentences failed to parse", corpus.len());
            }
        }

        Commands::Roundtrip { corpus, output } => {
            let corpus = Corpus::open(&corpus)?;
            println!("🔁 Re-serializing {} sentences...", corpus.len());

            let mut out = String::new();
            for result in corpus.sentences() {
                out.push_str(&result?.to_markup());
            }
            match output {
                Some(path) => {
                    fs::write(&path, out)?;
                    println!("✅ Written to {:?}", path);
                }
                None => print!("{out}"),
            }
        }

        Commands::Stats { corpus, json } => {
            let corpus = Corpus::open(&corpus)?;
            let mut all = Vec::new();
            for result in corpus.sentences() {
                match result {
                    Ok(sentence) => all.push(sentence.stats()),
                    Err(e) => tracing::error!("skipping unparseable sentence: {e}"),
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                println!("📊 Framegraph statistics ({} sentences)", all.len());
                println!("------------------------------------");
                for stats in &all {
                    println!("{stats}");
                }
                let frames: usize = all.iter().map(|s| s.frames).sum();
                let fes: usize = all.iter().map(|s| s.frame_elements).sum();
                println!("------------------------------------");
                println!("Total: {} frames, {} frame elements", frames, fes);
            }
        }

        Commands::Project {
            corpus,
            sentence,
            nodes,
            smc,
            ignore_empty_terminals,
        } => {
            let corpus = Corpus::open(&corpus)?;
            let found: Option<Sentence> = corpus
                .sentences()
                .filter_map(|r| r.ok())
                .find(|s| s.id() == sentence);
            let Some(sent) = found else {
                anyhow::bail!("no sentence with ID {sentence}");
            };

            let node_ids: Vec<String> = nodes.split(',').map(|n| n.trim().to_string()).collect();
            let constituents = if smc {
                max_constituents_smc(&sent, &node_ids, true, ignore_empty_terminals, None)
            } else {
                max_constituents_for_nodes(&sent, &node_ids, ignore_empty_terminals)
            };

            println!("🌳 Maximal constituents in {}:", sent.id());
            for id in &constituents {
                let description = sent
                    .syn_node(id)
                    .map(|n| {
                        n.category()
                            .or_else(|| n.word())
                            .unwrap_or("?")
                            .to_string()
                    })
                    .unwrap_or_else(|| "?".to_string());
                println!("- {} ({})", id, description);
            }
            println!("  Words: {}", sent.words_for_nodes(&constituents));
        }
    }

    Ok(())
}
