//! PDF downloading with a fixed retry policy.
//!
//! Retries apply only to transient server-side statuses (502/503/504),
//! up to five attempts with exponential backoff. Any other failure is
//! logged once per URL and processing moves on.

use std::path::Path;
use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::Client;

use super::error_log::ErrorLog;

/// Rotated per request to avoid tripping anti-scraping defenses.
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
];

const RETRYABLE_STATUSES: [u16; 3] = [502, 503, 504];
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

pub struct PdfDownloader {
    client: Client,
    error_log: ErrorLog,
    max_attempts: u32,
    backoff_base: Duration,
}

impl PdfDownloader {
    pub fn new(client: Client, error_log: ErrorLog) -> Self {
        Self {
            client,
            error_log,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Override the retry policy. Tests shorten the backoff.
    pub fn with_policy(mut self, max_attempts: u32, backoff_base: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff_base = backoff_base;
        self
    }

    /// Download `url` to `output_path`. Returns true if the file was
    /// saved; failures are written to the error log.
    pub async fn download(&self, url: &str, output_path: &Path) -> bool {
        for attempt in 1..=self.max_attempts {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, random_user_agent())
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    self.error_log.record(url, &e.to_string());
                    return false;
                }
            };

            let status = response.status();
            if status.is_success() {
                let bytes = match response.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        self.error_log.record(url, &e.to_string());
                        return false;
                    }
                };
                if let Err(e) = std::fs::write(output_path, &bytes) {
                    self.error_log.record(url, &e.to_string());
                    return false;
                }
                tracing::info!("downloaded pdf: {}", output_path.display());
                return true;
            }

            if RETRYABLE_STATUSES.contains(&status.as_u16()) && attempt < self.max_attempts {
                let delay = self.backoff_base * 2u32.saturating_pow(attempt - 1);
                tracing::debug!(
                    "{} returned {}, retrying in {:?} (attempt {}/{})",
                    url,
                    status,
                    delay,
                    attempt,
                    self.max_attempts
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            self.error_log
                .record(url, &format!("Status Code: {}", status.as_u16()));
            return false;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;

    use super::*;

    struct ServerState {
        flaky_hits: AtomicUsize,
    }

    async fn spawn_server() -> (String, Arc<ServerState>) {
        let state = Arc::new(ServerState {
            flaky_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route(
                "/flaky.pdf",
                get(|State(state): State<Arc<ServerState>>| async move {
                    let hits = state.flaky_hits.fetch_add(1, Ordering::SeqCst);
                    if hits < 3 {
                        (StatusCode::SERVICE_UNAVAILABLE, "try later").into_response()
                    } else {
                        (StatusCode::OK, "pdf-bytes").into_response()
                    }
                }),
            )
            .route(
                "/gone.pdf",
                get(|| async { (StatusCode::NOT_FOUND, "missing") }),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), state)
    }

    fn test_downloader(dir: &Path) -> (PdfDownloader, std::path::PathBuf) {
        let log_path = dir.join("errores.txt");
        let downloader = PdfDownloader::new(Client::new(), ErrorLog::new(log_path.clone()))
            .with_policy(5, Duration::from_millis(1));
        (downloader, log_path)
    }

    #[tokio::test]
    async fn transient_503s_are_retried_until_success() {
        let (base, state) = spawn_server().await;
        let dir = tempfile::tempdir().unwrap();
        let (downloader, log_path) = test_downloader(dir.path());

        let output = dir.path().join("flaky.pdf");
        let saved = downloader
            .download(&format!("{}/flaky.pdf", base), &output)
            .await;

        assert!(saved);
        assert_eq!(state.flaky_hits.load(Ordering::SeqCst), 4);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "pdf-bytes");
        assert!(!log_path.exists());
    }

    #[tokio::test]
    async fn not_found_is_logged_once_and_never_retried() {
        let (base, _state) = spawn_server().await;
        let dir = tempfile::tempdir().unwrap();
        let (downloader, log_path) = test_downloader(dir.path());

        let url = format!("{}/gone.pdf", base);
        let saved = downloader.download(&url, &dir.path().join("gone.pdf")).await;

        assert!(!saved);
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log, format!("{}: Status Code: 404\n", url));
    }

    #[tokio::test]
    async fn exhausted_retries_log_the_transient_status() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("errores.txt");

        let app = Router::new().route(
            "/busy.pdf",
            get(|| async { (StatusCode::BAD_GATEWAY, "busy") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let downloader = PdfDownloader::new(Client::new(), ErrorLog::new(log_path.clone()))
            .with_policy(3, Duration::from_millis(1));
        let url = format!("http://{}/busy.pdf", addr);
        let saved = downloader.download(&url, &dir.path().join("busy.pdf")).await;

        assert!(!saved);
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log, format!("{}: Status Code: 502\n", url));
    }
}
