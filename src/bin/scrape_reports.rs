//! Download every PDF linked from the report pages listed in the sitemap.

use report_assistant::core::config::{AppPaths, Settings};
use report_assistant::core::logging;
use report_assistant::scrape::{filter_sitemap_urls, ErrorLog, PdfDownloader, ReportScraper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let settings = Settings::load(&paths)?;
    settings.require_domain()?;

    let pages = filter_sitemap_urls(&paths.sitemap_path, "/reports/")?;
    tracing::info!("{} report pages listed in the sitemap", pages.len());

    let client = reqwest::Client::new();
    let error_log = ErrorLog::new(paths.error_log_path.clone());
    let downloader = PdfDownloader::new(client.clone(), error_log.clone());
    let scraper = ReportScraper::new(
        client,
        downloader,
        error_log,
        paths.report_pdf_dir.clone(),
    );

    let saved = scraper.run(&pages).await?;
    tracing::info!("saved {} report pdfs to {}", saved, paths.report_pdf_dir.display());

    Ok(())
}
