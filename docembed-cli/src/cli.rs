use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docembed::{DEFAULT_MAX_TOKENS, DEFAULT_MERGE_THRESHOLD, SplitPolicy};

/// Chunk, embed, and search a folder of text documents.
#[derive(Debug, Parser)]
#[command(name = "docembed", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split documents into chunks and print them as JSON, without embedding.
    Chunk {
        /// Directory of documents.
        dir: PathBuf,
        /// Write the JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Embed and store every chunk not stored yet.
    Ingest {
        /// Directory of documents.
        dir: PathBuf,
        /// Abort on the first unreadable file instead of skipping it.
        #[arg(long)]
        strict: bool,
        /// Print the ingestion report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Find the stored chunks most similar to a query.
    Search {
        /// Free-text query.
        query: String,
        /// Only return results with similarity above this value.
        #[arg(long)]
        threshold: Option<f32>,
        /// Maximum number of results.
        #[arg(long)]
        top_k: Option<usize>,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// JSON file holding stored entries.
    #[arg(long, global = true, env = "DOCEMBED_STORE", default_value = ".docembed/entries.json")]
    pub store: PathBuf,

    /// PostgreSQL URL; stores entries with pgvector instead of the JSON file.
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Embedding backend.
    #[arg(long, global = true, value_enum, default_value_t = ProviderKind::Hash)]
    pub provider: ProviderKind,

    /// API key for the OpenAI provider.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible embeddings API.
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Embedding model name for the OpenAI provider.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Vector size for the hash provider.
    #[arg(long, global = true, default_value_t = 256)]
    pub hash_dimensions: usize,

    /// Maximum tokens per chunk.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: usize,

    /// Chunks below this many tokens are merged into the previous chunk.
    #[arg(long, global = true, default_value_t = DEFAULT_MERGE_THRESHOLD)]
    pub merge_threshold: usize,

    /// Where oversized documents are split.
    #[arg(long, global = true, value_enum, default_value_t = SplitArg::Newline)]
    pub split: SplitArg,

    /// Path to a HuggingFace `tokenizer.json` used for token counts.
    #[arg(long, global = true)]
    pub tokenizer: Option<PathBuf>,

    /// Timeout in seconds for each embedding or store call.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Offline hashed bag-of-words vectors.
    Hash,
    /// OpenAI embeddings API.
    #[value(name = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SplitArg {
    Newline,
    Sentence,
}

impl From<SplitArg> for SplitPolicy {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Newline => SplitPolicy::Newline,
            SplitArg::Sentence => SplitPolicy::Sentence,
        }
    }
}
