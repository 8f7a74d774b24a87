pub mod download;
pub mod error_log;
pub mod insights;
pub mod reports;
pub mod robots;
pub mod sitemap;

pub use download::PdfDownloader;
pub use error_log::ErrorLog;
pub use insights::InsightRenderer;
pub use reports::ReportScraper;
pub use robots::fetch_robots_txt;
pub use sitemap::filter_sitemap_urls;

use std::time::Duration;

use rand::Rng;

/// Randomized delay between consecutive page fetches, 3 to 7 seconds.
/// Fixed anti-scraping courtesy, not a backpressure mechanism.
pub fn fetch_delay() -> Duration {
    let secs: f64 = rand::thread_rng().gen_range(3.0..7.0);
    Duration::from_secs_f64(secs)
}
