//! Report page scraping: find PDF links on each report page and hand
//! them to the downloader.

use std::path::PathBuf;

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::download::{random_user_agent, PdfDownloader};
use super::error_log::ErrorLog;
use crate::core::errors::PipelineError;

pub struct ReportScraper {
    client: Client,
    downloader: PdfDownloader,
    error_log: ErrorLog,
    output_dir: PathBuf,
    paced: bool,
}

impl ReportScraper {
    pub fn new(
        client: Client,
        downloader: PdfDownloader,
        error_log: ErrorLog,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            client,
            downloader,
            error_log,
            output_dir,
            paced: true,
        }
    }

    /// Disable the inter-page delay. Tests only.
    #[cfg(test)]
    pub fn without_pacing(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Visit every report page and download the PDFs linked from it.
    /// Returns the number of PDFs saved. Page-level failures are logged
    /// and skipped; the crawl keeps going.
    pub async fn run(&self, page_urls: &[String]) -> Result<usize, PipelineError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut saved = 0;
        for (i, page_url) in page_urls.iter().enumerate() {
            if self.paced && i > 0 {
                tokio::time::sleep(super::fetch_delay()).await;
            }
            saved += self.scrape_page(page_url).await;
        }

        tracing::info!("report scrape finished: {} pdfs saved", saved);
        Ok(saved)
    }

    async fn scrape_page(&self, page_url: &str) -> usize {
        let response = self
            .client
            .get(page_url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.error_log.record(page_url, &e.to_string());
                return 0;
            }
        };
        if !response.status().is_success() {
            self.error_log.record(
                page_url,
                &format!("Status Code: {}", response.status().as_u16()),
            );
            return 0;
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                self.error_log.record(page_url, &e.to_string());
                return 0;
            }
        };

        let links = extract_pdf_links(&html, page_url);
        if links.is_empty() {
            tracing::info!("no pdf links found on {}", page_url);
            return 0;
        }

        let mut saved = 0;
        for link in links {
            let name = match pdf_file_name(&link) {
                Some(name) => name,
                None => continue,
            };
            let output = self.output_dir.join(name);
            if self.downloader.download(&link, &output).await {
                saved += 1;
            }
        }
        saved
    }
}

/// Collect absolute URLs of every `.pdf` anchor on the page. Relative
/// hrefs are resolved against the page URL.
pub fn extract_pdf_links(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };
    let base = Url::parse(page_url).ok();

    let mut links = Vec::new();
    for anchor in document.select(&selector) {
        let href = match anchor.value().attr("href") {
            Some(href) => href.trim(),
            None => continue,
        };
        if !href.to_ascii_lowercase().ends_with(".pdf") {
            continue;
        }
        let resolved = match &base {
            Some(base) => base.join(href).map(String::from),
            None => Url::parse(href).map(String::from),
        };
        match resolved {
            Ok(url) => links.push(url),
            Err(_) => tracing::warn!("unresolvable pdf href on {}: {}", page_url, href),
        }
    }
    links
}

/// Derive the output filename from the last path segment of a PDF URL.
fn pdf_file_name(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let name = url.path_segments()?.next_back()?.to_string();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    use super::*;

    #[test]
    fn extracts_and_resolves_pdf_links() {
        let html = r#"
            <html><body>
                <a href="/files/annual-2023.pdf">Annual report</a>
                <a href="https://cdn.example.com/q1.PDF">Q1</a>
                <a href="/about">About us</a>
                <a>No href</a>
            </body></html>
        "#;

        let links = extract_pdf_links(html, "https://example.com/reports/annual");
        assert_eq!(
            links,
            vec![
                "https://example.com/files/annual-2023.pdf",
                "https://cdn.example.com/q1.PDF",
            ]
        );
    }

    #[test]
    fn file_name_is_the_last_path_segment() {
        assert_eq!(
            pdf_file_name("https://example.com/files/annual-2023.pdf"),
            Some("annual-2023.pdf".to_string())
        );
        assert_eq!(pdf_file_name("https://example.com/"), None);
    }

    #[tokio::test]
    async fn scrapes_pages_and_saves_linked_pdfs() {
        let app = Router::new()
            .route(
                "/reports/annual",
                get(|| async {
                    axum::response::Html(r#"<a href="/files/annual.pdf">pdf</a>"#)
                }),
            )
            .route("/reports/empty", get(|| async { axum::response::Html("<p>nothing</p>") }))
            .route("/files/annual.pdf", get(|| async { "pdf-bytes" }))
            .route(
                "/reports/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let base = format!("http://{}", addr);

        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("errores.txt"));
        let downloader = PdfDownloader::new(Client::new(), log.clone())
            .with_policy(1, std::time::Duration::from_millis(1));
        let scraper = ReportScraper::new(
            Client::new(),
            downloader,
            log,
            dir.path().join("pdf_reports"),
        )
        .without_pacing();

        let pages = vec![
            format!("{}/reports/annual", base),
            format!("{}/reports/empty", base),
            format!("{}/reports/broken", base),
        ];
        let saved = scraper.run(&pages).await.unwrap();

        assert_eq!(saved, 1);
        let pdf = dir.path().join("pdf_reports/annual.pdf");
        assert_eq!(std::fs::read_to_string(pdf).unwrap(), "pdf-bytes");

        let log_contents =
            std::fs::read_to_string(dir.path().join("errores.txt")).unwrap();
        assert_eq!(
            log_contents,
            format!("{}/reports/broken: Status Code: 500\n", base)
        );
    }
}
