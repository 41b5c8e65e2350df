use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docembed::{
    Chunker, DirectorySource, DocumentSource, EmbedConfig, EmbedPipeline, EmbeddingProvider,
    EntryStore, HashEmbeddingProvider, JsonFileStore, TokenChunker,
};
use tracing::info;

use crate::cli::{Command, GlobalArgs, ProviderKind};

pub async fn run(global: &GlobalArgs, command: Command) -> Result<()> {
    let config = match &command {
        Command::Search { threshold, top_k, .. } => build_config(global, *threshold, *top_k)?,
        _ => build_config(global, None, None)?,
    };
    let chunker = Arc::new(build_chunker(global, &config)?);

    match command {
        Command::Chunk { dir, out } => chunk(&dir, out.as_deref(), chunker.as_ref()),
        Command::Ingest { dir, strict, json } => {
            let pipeline = build_pipeline(global, config, chunker).await?;
            pipeline.setup().await?;
            let report =
                pipeline.ingest_source(&DirectorySource::new(&dir).strict(strict)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} documents, {} chunks: {} embedded, {} already stored",
                    report.documents, report.chunks, report.created, report.skipped
                );
            }
            Ok(())
        }
        Command::Search { query, json, .. } => {
            let pipeline = build_pipeline(global, config, chunker).await?;
            let results = pipeline.search(&query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("(no results)");
            } else {
                for (i, result) in results.iter().enumerate() {
                    println!("{}. [{:.4}] {}", i + 1, result.similarity, result.title);
                    println!("   {}", preview(&result.content, 160));
                }
            }
            Ok(())
        }
    }
}

/// Validated config from the global flags plus any search overrides.
fn build_config(
    global: &GlobalArgs,
    threshold: Option<f32>,
    top_k: Option<usize>,
) -> Result<EmbedConfig> {
    let mut builder = EmbedConfig::builder()
        .max_tokens(global.max_tokens)
        .merge_threshold(global.merge_threshold)
        .split(global.split.into());
    if let Some(secs) = global.timeout_secs {
        builder = builder.call_timeout(Duration::from_secs(secs));
    }
    if let Some(threshold) = threshold {
        builder = builder.similarity_threshold(threshold);
    }
    if let Some(top_k) = top_k {
        builder = builder.top_k(top_k);
    }
    Ok(builder.build()?)
}

fn build_chunker(global: &GlobalArgs, config: &EmbedConfig) -> Result<TokenChunker> {
    let chunker = TokenChunker::from_config(config);
    match &global.tokenizer {
        None => Ok(chunker),
        #[cfg(feature = "hf-tokenizer")]
        Some(path) => {
            let counter = docembed::HfTokenCounter::from_file(path)?;
            Ok(chunker.with_token_counter(Arc::new(counter)))
        }
        #[cfg(not(feature = "hf-tokenizer"))]
        Some(_) => anyhow::bail!("--tokenizer requires the `hf-tokenizer` feature"),
    }
}

fn build_provider(global: &GlobalArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    match global.provider {
        ProviderKind::Hash => Ok(Arc::new(HashEmbeddingProvider::new(global.hash_dimensions)?)),
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => {
            let api_key = global
                .openai_api_key
                .clone()
                .context("the openai provider needs --openai-api-key or OPENAI_API_KEY")?;
            let mut provider = docembed::openai::OpenAiEmbeddingProvider::new(api_key)?;
            if let Some(base_url) = &global.openai_base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            if let Some(model) = &global.model {
                provider = provider.with_model(model.clone());
            }
            Ok(Arc::new(provider))
        }
        #[cfg(not(feature = "openai"))]
        ProviderKind::OpenAi => anyhow::bail!("the openai provider requires the `openai` feature"),
    }
}

async fn build_store(global: &GlobalArgs) -> Result<Arc<dyn EntryStore>> {
    match &global.database_url {
        None => {
            let store = JsonFileStore::open(&global.store).await?;
            info!(path = %global.store.display(), "using json store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "pgvector")]
        Some(url) => {
            let store = docembed::pgvector::PgVectorStore::new(url).await?;
            info!("using pgvector store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "pgvector"))]
        Some(_) => anyhow::bail!("--database-url requires the `pgvector` feature"),
    }
}

async fn build_pipeline(
    global: &GlobalArgs,
    config: EmbedConfig,
    chunker: Arc<TokenChunker>,
) -> Result<EmbedPipeline> {
    Ok(EmbedPipeline::builder()
        .config(config)
        .embedding_provider(build_provider(global)?)
        .store(build_store(global).await?)
        .chunker(chunker)
        .build()?)
}

fn chunk(dir: &Path, out: Option<&Path>, chunker: &TokenChunker) -> Result<()> {
    let documents = DirectorySource::new(dir).list_documents()?;
    let chunked: Vec<_> = documents.iter().map(|document| chunker.chunk(document)).collect();
    let chunks: usize = chunked.iter().map(Vec::len).sum();
    info!(documents = documents.len(), chunks, "chunked documents");

    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &chunked)?;
            writer.flush()?;
        }
        None => println!("{}", serde_json::to_string_pretty(&chunked)?),
    }
    Ok(())
}

/// First `max_chars` characters of `text` on one line.
fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n b\tc", 10), "a b c");
        assert_eq!(preview("abcdef", 3), "abc…");
    }

    #[test]
    fn chunk_command_writes_json_file() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("a.txt"), "one\ntwo").unwrap();
        let out = temp.path().join("chunks.json");

        chunk(temp.path(), Some(&out), &TokenChunker::default()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written[0][0]["title"], "a.txt-0");
        assert_eq!(written[0][0]["content"], "one\ntwo");
    }

    #[test]
    fn search_overrides_are_validated() {
        let cli = Cli::try_parse_from(["docembed", "search", "q", "--top-k", "3"]).unwrap();
        let config = build_config(&cli.global, Some(0.25), Some(3)).unwrap();
        assert_eq!((config.top_k, config.similarity_threshold), (3, 0.25));

        assert!(build_config(&cli.global, None, Some(0)).is_err());
        assert!(build_config(&cli.global, Some(f32::NAN), None).is_err());
    }

    #[tokio::test]
    async fn search_rejects_zero_top_k() {
        let temp = tempfile::tempdir().unwrap();
        let store = temp.path().join("entries.json");
        let cli = Cli::try_parse_from([
            "docembed",
            "--store",
            store.to_str().unwrap(),
            "search",
            "q",
            "--top-k",
            "0",
        ])
        .unwrap();
        assert!(run(&cli.global, cli.command).await.is_err());
    }

    #[tokio::test]
    async fn ingest_then_search_with_json_store() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "vector search with embeddings").unwrap();
        let store = temp.path().join("entries.json");
        let store_arg = store.to_str().unwrap();
        let docs_arg = docs.to_str().unwrap();

        let ingest = Cli::try_parse_from(["docembed", "--store", store_arg, "ingest", docs_arg])
            .unwrap();
        run(&ingest.global, ingest.command).await.unwrap();

        let search =
            Cli::try_parse_from(["docembed", "--store", store_arg, "search", "vector search"])
                .unwrap();
        run(&search.global, search.command).await.unwrap();

        let stored = JsonFileStore::open(&store).await.unwrap();
        assert_eq!(stored.len().await.unwrap(), 1);
    }
}
