use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::issues;
use crate::report::{self, DuplicateEntry, ReportFormat, SearchEntry};
use crate::semantic::{Embedder, EmbeddingModel, IssueSimilarityService};

fn load_model(config: &Config) -> Result<EmbeddingModel> {
    let emb = &config.embedding;
    let model = EmbeddingModel::new(&emb.model, emb.cache_dir.clone())
        .with_context(|| format!("Failed to load embedding model '{}'", emb.model))?;

    Ok(model.with_batch_size(emb.batch_size))
}

fn write_output(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn handle_duplicates(
    config: &Config,
    input: PathBuf,
    output: Option<PathBuf>,
    format: ReportFormat,
) -> Result<()> {
    let issues = issues::load_issues(&input, &config.filters)
        .with_context(|| format!("Failed to load issues from {}", input.display()))?;

    let service = IssueSimilarityService::new(load_model(config)?, config);
    let matches = service.find_duplicates(&issues)?;

    let entries: Vec<DuplicateEntry> = matches.iter().map(DuplicateEntry::from).collect();
    let rendered = report::render_duplicates(&entries, format)?;
    write_output(&rendered, output.as_deref())
}

pub fn handle_search(
    config: &Config,
    query: &str,
    input: PathBuf,
    format: ReportFormat,
) -> Result<()> {
    let issues = issues::load_issues(&input, &config.filters)
        .with_context(|| format!("Failed to load issues from {}", input.display()))?;

    let service = IssueSimilarityService::new(load_model(config)?, config);
    log::debug!("Searching with model '{}'", service.embedder().name());

    let search = service.body_search(&issues)?;
    if search.is_empty() {
        anyhow::bail!("No issue bodies to search in {}", input.display());
    }

    let hits = search.search_text(query, config.search.limit)?;
    let entries: Vec<SearchEntry> = hits.iter().map(SearchEntry::from).collect();
    let rendered = report::render_search(&entries, format)?;
    write_output(&rendered, None)
}
