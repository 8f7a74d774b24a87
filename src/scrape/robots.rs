//! Fetch the target domain's robots.txt so crawl rules can be checked
//! before scraping.

use reqwest::Client;

use super::download::random_user_agent;
use crate::core::errors::PipelineError;

/// Fetch `{domain}/robots.txt` and return its body. Any non-200 response
/// is an error: scraping must not proceed blind.
pub async fn fetch_robots_txt(client: &Client, domain: &str) -> Result<String, PipelineError> {
    let url = format!("{}/robots.txt", domain.trim_end_matches('/'));

    let response = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, random_user_agent())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Api(format!(
            "robots.txt fetch failed with status {}",
            status.as_u16()
        )));
    }

    Ok(response.text().await?)
}
