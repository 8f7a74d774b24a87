//! Append-only plain-text error log shared by the scraping components.
//! One `URL: message` line per failure.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn record(&self, url: &str, message: &str) {
        tracing::warn!("logged error: {} - {}", url, message);

        let entry = format!("{}: {}\n", url, message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));

        if let Err(e) = result {
            tracing::error!("could not write to {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_one_line_per_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errores.txt");
        let log = ErrorLog::new(path.clone());

        log.record("https://example.com/a.pdf", "Status Code: 404");
        log.record("https://example.com/b.pdf", "connection reset");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "https://example.com/a.pdf: Status Code: 404\nhttps://example.com/b.pdf: connection reset\n"
        );
    }
}
