//! Print the target domain's robots.txt before any scraping run.

use report_assistant::core::config::{AppPaths, Settings};
use report_assistant::core::logging;
use report_assistant::scrape::fetch_robots_txt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let settings = Settings::load(&paths)?;
    let domain = settings.require_domain()?;

    let body = fetch_robots_txt(&reqwest::Client::new(), domain).await?;
    println!("{}", body);

    Ok(())
}
