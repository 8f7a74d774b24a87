//! Render the insight pages listed in the sitemap to PDF files.

use report_assistant::core::config::{AppPaths, Settings};
use report_assistant::core::logging;
use report_assistant::scrape::{filter_sitemap_urls, ErrorLog, InsightRenderer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let settings = Settings::load(&paths)?;
    let renderer_url = settings.require_renderer_url()?.to_string();

    let pages = filter_sitemap_urls(&paths.sitemap_path, "/news-insights/")?;
    tracing::info!("{} insight pages listed in the sitemap", pages.len());

    let renderer = InsightRenderer::new(
        reqwest::Client::new(),
        renderer_url,
        ErrorLog::new(paths.error_log_path.clone()),
        paths.insight_pdf_dir.clone(),
    );

    let saved = renderer.run(&pages).await?;
    tracing::info!("saved {} insight pdfs to {}", saved, paths.insight_pdf_dir.display());

    Ok(())
}
