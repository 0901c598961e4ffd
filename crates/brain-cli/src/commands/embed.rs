use crate::context::AppContext;
use anyhow::Result;
use brain_core::note::DirEntryKind;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Generates embeddings for notes missing from the vector store, or for
/// every note under `project` when `force` is set. Returns `true` when
/// every targeted note embedded successfully.
pub async fn execute(
    ctx: &AppContext,
    project: Option<String>,
    limit: Option<usize>,
    force: bool,
) -> Result<bool> {
    let project = project.or_else(|| ctx.project.clone());
    let entries = ctx.notes.list_directory(project.as_deref(), 8, None).await?;

    let mut identifiers = Vec::new();
    for entry in entries {
        if entry.kind == DirEntryKind::Dir {
            continue;
        }
        if force || !ctx.vectors.has_entity(&entry.permalink)? {
            identifiers.push(entry.permalink);
        }
    }
    if let Some(limit) = limit {
        identifiers.truncate(limit);
    }

    if identifiers.is_empty() {
        println!("nothing to embed");
        return Ok(true);
    }

    let bar = ProgressBar::new(identifiers.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.tick();

    let report = ctx.pipeline.process_many(&identifiers).await;
    bar.finish_and_clear();

    println!("embedded {} notes, {} failed", report.succeeded.len(), report.failed.len());
    for (identifier, message) in &report.failed {
        println!("  {} {identifier}: {message}", "failed:".red());
    }

    Ok(report.failed.is_empty())
}
