use crate::context::AppContext;
use anyhow::{bail, Result};
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use std::path::PathBuf;

pub async fn execute(
    ctx: &AppContext,
    project: Option<String>,
    preview: bool,
    mode: Option<String>,
    source_path: Option<PathBuf>,
    source_schema: Option<String>,
) -> Result<bool> {
    let project = project.or_else(|| ctx.project.clone());
    match mode.as_deref().unwrap_or("conform") {
        "conform" => conform(ctx, project, preview).await,
        "import" => {
            let Some(source_path) = source_path else {
                bail!("--mode import requires --source-path");
            };
            import(ctx, &source_path, project, source_schema).await
        }
        other => bail!("unknown analyze mode {other:?}; expected conform or import"),
    }
}

async fn conform(ctx: &AppContext, project: Option<String>, preview: bool) -> Result<bool> {
    let report = ctx.importer.conform(project.as_deref(), preview).await?;

    if report.is_clean() {
        println!("{}", "no issues found".green());
        return Ok(true);
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["permalink", "issue", "fixable", "target"]);
    for issue in &report.issues {
        table.add_row(vec![
            issue.permalink.clone(),
            format!("{:?}", issue.kind),
            issue.kind.auto_fixable().to_string(),
            issue.fix.as_ref().map(|f| f.target_permalink.clone()).unwrap_or_default(),
        ]);
    }
    println!("{table}");

    if !report.conflicts.is_empty() {
        println!("{}", "conflicts (not applied):".yellow().bold());
        for (target, sources) in &report.conflicts {
            println!("  {target} <- {}", sources.join(", "));
        }
    }
    if !preview && !report.applied.is_empty() {
        println!("applied {} fix(es)", report.applied.len());
    }

    Ok(false)
}

async fn import(
    ctx: &AppContext,
    source_path: &std::path::Path,
    project: Option<String>,
    source_schema: Option<String>,
) -> Result<bool> {
    if let Some(schema) = &source_schema {
        println!("importing from {} (schema: {schema})", source_path.display());
    } else {
        println!("importing from {}", source_path.display());
    }

    let report = ctx.importer.import(source_path, project.as_deref()).await?;
    println!("imported {} notes, {} failed", report.written.len(), report.failed.len());
    for (path, message) in &report.failed {
        println!("  {} {path}: {message}", "failed:".red());
    }

    Ok(report.failed.is_empty())
}
