//! Terminal rendering of insight responses

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use insight_stock::{AiSummary, InsightResponse, LatestNews};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const NO_AI_RESPONSE: &str = "No AI response";

/// Text shown for the AI summary, or its in-band error
pub fn summary_text(summary: &AiSummary) -> String {
    match summary {
        AiSummary::Text(text) if text.trim().is_empty() => NO_AI_RESPONSE.to_string(),
        AiSummary::Text(text) => text.clone(),
        AiSummary::Failed(e) => e.to_string(),
    }
}

pub fn headlines_table(headlines: &[String]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Headline"]);

    for (i, headline) in headlines.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(headline)]);
    }
    table
}

/// Full report for one response
pub fn render_response(response: &InsightResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Stock Data for {}", response.symbol);
    let _ = writeln!(out, "Current Price: ${}", response.real_time_price);
    out.push('\n');

    out.push_str("Latest News Headlines\n");
    match &response.latest_news {
        LatestNews::Headlines(headlines) if headlines.is_empty() => {
            out.push_str("(no headlines)\n");
        }
        LatestNews::Headlines(headlines) => {
            let _ = writeln!(out, "{}", headlines_table(headlines));
        }
        LatestNews::Failed(e) => {
            let _ = writeln!(out, "News unavailable: {}", e.error);
        }
    }
    out.push('\n');

    out.push_str("AI Summary\n");
    out.push_str(&summary_text(&response.ai_summary));
    out.push('\n');
    out
}

/// Decode the trend chart into `path`, if the response carries one
pub async fn save_chart(
    response: &InsightResponse,
    path: &Path,
) -> anyhow::Result<Option<PathBuf>> {
    let Some(chart) = response.historical_trend.chart() else {
        return Ok(None);
    };

    let png = STANDARD
        .decode(&chart.trend_plot)
        .context("Chart is not valid base64")?;
    tokio::fs::write(path, png)
        .await
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;

    Ok(Some(path.to_path_buf()))
}
