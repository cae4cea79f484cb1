use anyhow::{bail, Context, Result};
use cinematch_core::persist::{load_index, save_index, IndexPaths};
use cinematch_core::{build_index, IdfMode, IndexConfig, Item, ItemRecord, Strategy};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cinematch-indexer")]
#[command(about = "Build and query a content-based movie similarity index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus file (JSON array, JSON object or JSONL) or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print recommendations for a title from a built index
    Query {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Title of the movie to find neighbors for
        #[arg(long)]
        title: String,
        /// Number of recommendations (defaults to the index's k_default)
        #[arg(short, long)]
        k: Option<usize>,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Drop terms found in fewer documents than this
    #[arg(long, default_value_t = 1)]
    min_df: usize,
    /// Drop terms found in more than this fraction of documents
    #[arg(long, default_value_t = 0.95)]
    max_df: f32,
    /// Times genres and director are repeated in each document
    #[arg(long, default_value_t = 1)]
    label_weight: usize,
    /// Default number of recommendations
    #[arg(long, default_value_t = 5)]
    k_default: usize,
    /// Use IDF = ln(N/df) instead of the smoothed ln(1 + N/df)
    #[arg(long, default_value_t = false)]
    raw_idf: bool,
    /// Score neighbors per query instead of precomputing the full matrix
    #[arg(long, default_value_t = false)]
    on_demand: bool,
}

impl From<ConfigArgs> for IndexConfig {
    fn from(a: ConfigArgs) -> Self {
        IndexConfig {
            min_df: a.min_df,
            max_df: a.max_df,
            label_weight: a.label_weight,
            k_default: a.k_default,
            idf: if a.raw_idf { IdfMode::Raw } else { IdfMode::Smoothed },
            strategy: if a.on_demand { Strategy::OnDemand } else { Strategy::Precomputed },
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config } => {
            let config: IndexConfig = config.into();
            run_build(&input, &output, &config)
        }
        Commands::Query { index, title, k } => run_query(&index, &title, k),
    }
}

fn run_build(input: &str, output: &str, config: &IndexConfig) -> Result<()> {
    let items = read_corpus(Path::new(input))?;
    tracing::info!(num_items = items.len(), input, "ingested corpus");
    let index = build_index(items, config)?;
    save_index(&IndexPaths::new(output), &index)?;
    tracing::info!(output, "index build complete");
    Ok(())
}

fn run_query(index_dir: &str, title: &str, k: Option<usize>) -> Result<()> {
    let index = load_index(&IndexPaths::new(index_dir))?;
    let k = k.unwrap_or(index.config().k_default);
    let query = index.resolve_title(title)?;
    println!("{} ({}) [id {}]", query.title, year_label(query), query.id);
    for (rank, rec) in index.recommend(title, k)?.iter().enumerate() {
        println!("{:>3}. {:.4}  {} ({})", rank + 1, rec.score, rec.item.title, year_label(rec.item));
    }
    Ok(())
}

fn year_label(item: &Item) -> String {
    item.year().map(|y| y.to_string()).unwrap_or_else(|| "n/a".into())
}

/// Collect items from a file or from every `.json`/`.jsonl` file under a directory,
/// in sorted path order so rebuilds see the same corpus order.
fn read_corpus(input: &Path) -> Result<Vec<Item>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
            // A corpus with an unreadable part would silently shrink, so fail instead.
            let entry = entry.with_context(|| format!("walking {}", input.display()))?;
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }

    let mut items = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut items)?;
        } else {
            read_json(&file, &mut items)?;
        }
    }
    Ok(items)
}

fn read_jsonl(file: &Path, items: &mut Vec<Item>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let record: ItemRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        items.push(record.into());
    }
    Ok(())
}

fn read_json(file: &Path, items: &mut Vec<Item>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let record: ItemRecord = serde_json::from_value(v)
                    .with_context(|| format!("bad record in {}", file.display()))?;
                items.push(record.into());
            }
        }
        serde_json::Value::Object(_) => {
            let record: ItemRecord = serde_json::from_value(json)?;
            items.push(record.into());
        }
        _ => tracing::warn!(file = %file.display(), "skipping file that holds neither an object nor an array"),
    }
    Ok(())
}
