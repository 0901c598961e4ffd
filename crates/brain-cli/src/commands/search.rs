use crate::context::AppContext;
use anyhow::{bail, Result};
use brain_search::SearchMode;
use comfy_table::{ContentArrangement, Table};

fn parse_mode(mode: Option<&str>) -> Result<SearchMode> {
    match mode.map(str::to_lowercase).as_deref() {
        None | Some("auto") => Ok(SearchMode::Auto),
        Some("semantic") => Ok(SearchMode::Semantic),
        Some("keyword") => Ok(SearchMode::Keyword),
        Some(other) => bail!("unknown search mode {other:?}; expected auto, semantic, or keyword"),
    }
}

pub async fn execute(
    ctx: &AppContext,
    query: String,
    limit: Option<usize>,
    threshold: Option<f32>,
    mode: Option<String>,
) -> Result<bool> {
    let mode = parse_mode(mode.as_deref())?;
    let results = ctx
        .search
        .search(&query, limit, threshold, mode, false, ctx.project.as_deref())
        .await?;

    if results.is_empty() {
        println!("no results");
        return Ok(true);
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["score", "source", "permalink", "snippet"]);
    for result in &results {
        table.add_row(vec![
            format!("{:.3}", result.similarity_score),
            format!("{:?}", result.source),
            result.permalink.clone(),
            result.snippet.clone(),
        ]);
    }
    println!("{table}");
    Ok(true)
}
