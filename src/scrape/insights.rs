//! Insight pages have no downloadable PDF, so each page is rendered to
//! PDF by an external headless-browser service and the result is saved
//! alongside the scraped reports.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use serde_json::json;

use super::error_log::ErrorLog;
use crate::core::errors::PipelineError;

pub struct InsightRenderer {
    client: Client,
    renderer_url: String,
    error_log: ErrorLog,
    output_dir: PathBuf,
    paced: bool,
}

impl InsightRenderer {
    pub fn new(
        client: Client,
        renderer_url: String,
        error_log: ErrorLog,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            client,
            renderer_url,
            error_log,
            output_dir,
            paced: true,
        }
    }

    #[cfg(test)]
    pub fn without_pacing(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Render every insight page to a PDF file. Returns the number of
    /// files saved; per-page failures are logged and skipped.
    pub async fn run(&self, page_urls: &[String]) -> Result<usize, PipelineError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut saved = 0;
        for (i, page_url) in page_urls.iter().enumerate() {
            if self.paced && i > 0 {
                tokio::time::sleep(super::fetch_delay()).await;
            }
            if self.render_page(page_url).await {
                saved += 1;
            }
        }

        tracing::info!("insight rendering finished: {} pdfs saved", saved);
        Ok(saved)
    }

    async fn render_page(&self, page_url: &str) -> bool {
        let body = json!({
            "url": page_url,
            "format": "A4",
            "print_background": true,
            "scale": 0.6,
        });

        let response = self.client.post(&self.renderer_url).json(&body).send().await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.error_log.record(page_url, &e.to_string());
                return false;
            }
        };
        if !response.status().is_success() {
            self.error_log.record(
                page_url,
                &format!("Status Code: {}", response.status().as_u16()),
            );
            return false;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.error_log.record(page_url, &e.to_string());
                return false;
            }
        };

        let output = self.output_dir.join(pdf_file_name(page_url));
        if let Err(e) = std::fs::write(&output, &bytes) {
            self.error_log.record(page_url, &e.to_string());
            return false;
        }
        tracing::info!("rendered {} to {}", page_url, output.display());
        true
    }
}

/// Derive a filesystem-safe PDF name from a page URL by collapsing every
/// run of non-word characters into an underscore.
pub fn pdf_file_name(page_url: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let non_word = NON_WORD.get_or_init(|| Regex::new(r"\W+").expect("static pattern"));
    format!("{}.pdf", non_word.replace_all(page_url, "_"))
}
