use clap::Parser;
use tracing_subscriber::EnvFilter;

use semdex::{
    builder,
    cache::EmbeddingCache,
    cli::{CacheAction, Cli, Command, SearchArgs, StatusArgs},
    corpus::{self, CorpusMetadata},
    data_dir::DataDir,
    embed::HashEmbedder,
    error::Result,
    explain,
    index::VectorIndex,
    pipeline::QueryPipeline,
};

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("SEMDEX_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Scan(args) => {
            let metadata = corpus::scan_corpus(&args.docs_dir)?;
            metadata.save(&data_dir.metadata_path())?;
            println!(
                "Scanned {} document(s) into {}",
                metadata.len(),
                data_dir.metadata_path().display()
            );
        }
        Command::Build => {
            let metadata = CorpusMetadata::load(&data_dir.metadata_path())?;
            let mut cache = EmbeddingCache::load(&data_dir.cache_path());
            let provider = HashEmbedder::default();

            let (index, report) =
                builder::build_index(&metadata, &mut cache, &provider)?;
            index.save(&data_dir.index_path(), &data_dir.id_map_path())?;

            println!(
                "Indexed {} document(s) (dimension {}): {} reused, {} embedded",
                report.total, report.dimension, report.reused, report.embedded
            );
        }
        Command::Search(args) => {
            let pipeline = QueryPipeline::open(
                &data_dir,
                Box::new(HashEmbedder::default()),
            )?;
            cmd_search(&pipeline, &args)?;
        }
        Command::Cache { action } => match action {
            CacheAction::Clear => {
                let mut cache = EmbeddingCache::load(&data_dir.cache_path());
                cache.clear()?;
                println!("Cache cleared.");
            }
            CacheAction::Stats => {
                let cache = EmbeddingCache::load(&data_dir.cache_path());
                println!("{} cached embedding(s)", cache.len());
            }
        },
        Command::Status(args) => {
            cmd_status(&data_dir, &args)?;
        }
        Command::Completions(args) => {
            args.generate();
        }
    }

    Ok(())
}

fn cmd_search(pipeline: &QueryPipeline, args: &SearchArgs) -> Result<()> {
    let hits = pipeline.query(&args.query, args.count)?;

    let explanations: Vec<_> = if args.explain {
        hits.iter()
            .map(|hit| {
                explain::explain(&args.query, &pipeline.document_text(hit))
            })
            .collect()
    } else {
        Vec::new()
    };

    if args.json {
        let results: Vec<serde_json::Value> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let mut value = serde_json::to_value(hit)?;
                if args.explain {
                    value["explanation"] =
                        serde_json::to_value(&explanations[i])?;
                }
                Ok(value)
            })
            .collect::<Result<_>>()?;
        let output = serde_json::json!({
            "query": args.query,
            "result_count": results.len(),
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{:>3}. [{:.4}] {}", i + 1, hit.score, hit.doc_id);
        println!("     {}", hit.path);
        println!("     {}", hit.snippet);
        if args.explain {
            let explanation = &explanations[i];
            println!("     {}", explanation.why_matched);
            println!(
                "     overlap: {:.4}  length norm: {:.4}",
                explanation.overlap_ratio, explanation.doc_length_norm
            );
        }
    }
    println!("\n{} result(s)", hits.len());
    Ok(())
}

fn cmd_status(data_dir: &DataDir, args: &StatusArgs) -> Result<()> {
    let documents = CorpusMetadata::load(&data_dir.metadata_path())
        .map(|m| m.len())
        .unwrap_or(0);
    let cached = EmbeddingCache::load(&data_dir.cache_path()).len();
    let index = VectorIndex::load(
        &data_dir.index_path(),
        &data_dir.id_map_path(),
    )
    .ok();
    let indexed = index.as_ref().map(VectorIndex::len);
    let dimension = index.as_ref().map(VectorIndex::dimension);

    if args.json {
        let output = serde_json::json!({
            "data_dir": data_dir.root().display().to_string(),
            "documents": documents,
            "cached_embeddings": cached,
            "indexed_vectors": indexed,
            "dimension": dimension,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Documents: {documents}");
        println!("Cached embeddings: {cached}");
        match (indexed, dimension) {
            (Some(n), Some(d)) => {
                println!("Index: {n} vector(s), dimension {d}");
            }
            _ => println!("Index: not built"),
        }
    }
    Ok(())
}
