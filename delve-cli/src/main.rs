//! Delve CLI - Command-line interface for the Delve research agent
//!
//! Researches questions on the web and demonstrates the vector memory store

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use delve_applications::{parse_questions, BatchStatus, ResearchEngine, ResearchResult};
use delve_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, DelveConfig,
    LoggingConfig,
};
use delve_rag::{create_embedder, ShortTermMemory, VectorMemoryStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "delve")]
#[command(about = "Answer questions from the web with cited sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a single question
    Research {
        /// Question to answer
        question: String,

        /// Number of search queries to plan
        #[arg(short = 'n', long)]
        queries: Option<usize>,

        /// Results fetched per query
        #[arg(short = 'm', long)]
        results: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Research every question in a file, one per line
    Batch {
        /// File with one question per line
        file: PathBuf,

        #[arg(short = 'n', long)]
        queries: Option<usize>,

        #[arg(short = 'm', long)]
        results: Option<usize>,

        /// Print the items as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive research prompt
    Interactive {
        #[arg(short = 'n', long)]
        queries: Option<usize>,

        #[arg(short = 'm', long)]
        results: Option<usize>,
    },

    /// Store memories and recall the closest ones
    Memory {
        /// Memory to store (repeatable)
        #[arg(short, long = "add")]
        add: Vec<String>,

        /// Text to recall memories for
        #[arg(short, long)]
        query: Option<String>,

        /// Number of memories to recall
        #[arg(short)]
        k: Option<usize>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = DelveConfig::load(cli.config.as_deref())?;

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        config.logging.clone()
    };
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting Delve CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Research {
            question,
            queries,
            results,
            json,
        } => {
            let (n, m) = counts(&config, queries, results);
            handle_research(&question, n, m, json, &config).await?;
        }
        Commands::Batch {
            file,
            queries,
            results,
            json,
        } => {
            let (n, m) = counts(&config, queries, results);
            handle_batch(&file, n, m, json, &config).await?;
        }
        Commands::Interactive { queries, results } => {
            let (n, m) = counts(&config, queries, results);
            handle_interactive(n, m, &config).await?;
        }
        Commands::Memory { add, query, k } => {
            handle_memory(add, query, k, &config).await?;
        }
        Commands::Config { show, init } => {
            handle_config(show, init, cli.config.as_deref(), &config)?;
        }
    }

    Ok(())
}

fn counts(config: &DelveConfig, queries: Option<usize>, results: Option<usize>) -> (usize, usize) {
    (
        queries.unwrap_or(config.research.num_queries),
        results.unwrap_or(config.research.results_per_query),
    )
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

async fn handle_research(
    question: &str,
    num_queries: usize,
    results_per_query: usize,
    json: bool,
    config: &DelveConfig,
) -> Result<()> {
    log_operation_start!("research_command");

    let engine = ResearchEngine::from_config(config).context(
        "Failed to create research engine. Check that an LLM API key is configured \
         (OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY) or use the ollama provider",
    )?;

    let progress = spinner("Researching...");
    let outcome = engine
        .research(question, num_queries, results_per_query)
        .await;
    progress.finish_and_clear();

    let result = outcome.map_err(|e| {
        log_operation_error!("research_command", e);
        e
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    log_operation_success!("research_command", sources = result.sources.len());
    Ok(())
}

fn print_result(result: &ResearchResult) {
    let rule = "=".repeat(80);

    println!("\n{}", rule);
    println!("Question: {}", result.question);
    println!("Queries: {}", result.queries.join(" | "));
    println!("{}\n", rule);
    println!("{}", result.answer);

    if !result.sources.is_empty() {
        println!("\n{}", rule);
        println!("SOURCES");
        println!("{}", rule);
        for (i, source) in result.sources.iter().enumerate() {
            println!("\n[Source {}]", i + 1);
            println!("Title: {}", source.title);
            println!("URL: {}", source.url);
        }
    }
    println!();
}

async fn handle_batch(
    file: &Path,
    num_queries: usize,
    results_per_query: usize,
    json: bool,
    config: &DelveConfig,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read question file {:?}", file))?;
    let questions = parse_questions(&text);
    if questions.is_empty() {
        bail!("No questions found in {:?}", file);
    }

    let engine = ResearchEngine::from_config(config)?;

    let progress = spinner(&format!("Researching {} questions...", questions.len()));
    let items = engine
        .research_batch(&questions, num_queries, results_per_query)
        .await;
    progress.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!("{:<4} {:<9} {:<8} Question", "#", "Status", "Sources");
    for (i, item) in items.iter().enumerate() {
        let sources = item
            .result
            .as_ref()
            .map(|r| r.sources.len().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<9} {:<8} {}",
            i + 1,
            item.category.to_string(),
            sources,
            item.question
        );
        if let Some(error) = &item.error {
            println!("     {}", error);
        }
    }

    let failed = items
        .iter()
        .filter(|item| item.category == BatchStatus::Error)
        .count();
    println!(
        "\n{} questions, {} failed",
        items.len(),
        failed
    );
    Ok(())
}

async fn handle_interactive(
    num_queries: usize,
    results_per_query: usize,
    config: &DelveConfig,
) -> Result<()> {
    let engine = ResearchEngine::from_config(config)?;
    let mut recent: ShortTermMemory<ResearchResult> =
        ShortTermMemory::new(config.memory.short_term_limit);

    println!("Delve interactive research. Type 'history' for recent questions, 'quit' to leave.\n");

    loop {
        print!("Question: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        match input {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "history" => {
                for (i, past) in recent.iter().enumerate() {
                    println!("{}. {} ({} sources)", i + 1, past.question, past.sources.len());
                }
                println!();
                continue;
            }
            _ => {}
        }

        let progress = spinner("Researching...");
        let outcome = engine.research(input, num_queries, results_per_query).await;
        progress.finish_and_clear();

        match outcome {
            Ok(result) => {
                print_result(&result);
                recent.add(result);
            }
            Err(e) => println!("Error: {}\n", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn handle_memory(
    add: Vec<String>,
    query: Option<String>,
    k: Option<usize>,
    config: &DelveConfig,
) -> Result<()> {
    if add.is_empty() && query.is_none() {
        bail!("Nothing to do: pass --add <text> and/or --query <text>");
    }

    let embedder = create_embedder(&config.embedding, &config.network).await?;
    let mut store = VectorMemoryStore::new(embedder, config.memory.clone());

    if !add.is_empty() {
        let added = store.add_memories(&add).await?;
        println!("Stored {} memories", added);
    }

    if let Some(query) = query {
        let k = k.unwrap_or(config.memory.recall_k);
        let recalled = store.recall_scored(&query, k).await?;

        if recalled.is_empty() {
            println!("No memories to recall");
        } else {
            println!("Closest memories to '{}':", query);
            for memory in recalled {
                println!(
                    "  #{} (distance {:.4}) {}",
                    memory.position, memory.distance, memory.text
                );
            }
        }
    }

    Ok(())
}

fn handle_config(show: bool, init: bool, path: Option<&Path>, config: &DelveConfig) -> Result<()> {
    if init {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => DelveConfig::default_path()
                .context("Could not determine the home directory")?,
        };
        DelveConfig::default().save_to_file(&target)?;
        println!("Configuration initialized at: {:?}", target);
        println!("Edit the file to choose providers and models; API keys are read from the environment.");
    }

    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    if !init && !show {
        println!("Use --init to write the default configuration or --show to print the current one");
    }

    Ok(())
}
