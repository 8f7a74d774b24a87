use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::errors::PipelineError;

const DEFAULT_CHAT_MODEL: &str = "gpt-4";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 50;
const DEFAULT_TOP_K: usize = 4;
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Directory layout for the assistant. Everything lives under the project
/// root so the scraping binaries, the ingestion pipeline and the chat
/// server agree on where the corpus and the store are.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub log_dir: PathBuf,
    pub store_path: PathBuf,
    pub report_pdf_dir: PathBuf,
    pub insight_pdf_dir: PathBuf,
    pub sitemap_path: PathBuf,
    pub error_log_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        Self::under(&project_root)
    }

    /// Build the layout under an explicit root. Tests use this with a
    /// temporary directory.
    pub fn under(root: &Path) -> Self {
        AppPaths {
            project_root: root.to_path_buf(),
            log_dir: root.join("logs"),
            store_path: root.join("vector_store.db"),
            report_pdf_dir: root.join("pdf_reports"),
            insight_pdf_dir: root.join("pdf_news_insights"),
            sitemap_path: root.join("sitemap.xml"),
            error_log_path: root.join("errores.txt"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_root.join("config.yml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("REPORT_ASSISTANT_ROOT") {
        return PathBuf::from(root);
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Optional overrides read from `config.yml`. Anything not set falls back
/// to the built-in defaults; credentials never live here.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    chat_model: Option<String>,
    embedding_model: Option<String>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
    max_tokens: Option<u32>,
}

/// Resolved runtime configuration, constructed once per process and passed
/// into components explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_tokens: u32,
    /// Target domain for robots.txt and scraping; only the scraping
    /// binaries require it.
    pub domain: Option<String>,
    /// Endpoint of the headless-browser rendering service.
    pub renderer_url: Option<String>,
}

impl Settings {
    /// Load settings from the environment (a `.env` file is honored) plus
    /// optional `config.yml` overrides. A missing API credential is a fatal
    /// configuration error: nothing downstream can run without it.
    pub fn load(paths: &AppPaths) -> Result<Self, PipelineError> {
        let _ = dotenvy::dotenv();

        let file = load_file_config(&paths.config_path())?;
        Self::from_parts(
            file,
            env::var("OPENAI_API_KEY").ok(),
            env::var("URL_DOMAIN").ok(),
            env::var("RENDERER_URL").ok(),
        )
    }

    /// Resolve settings from already-read sources. Split out of `load` so
    /// it can be exercised without touching the process environment.
    fn from_parts(
        file: FileConfig,
        api_key: Option<String>,
        domain: Option<String>,
        renderer_url: Option<String>,
    ) -> Result<Self, PipelineError> {
        let openai_api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PipelineError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let chunk_size = file.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        let chunk_overlap = file.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP);
        if chunk_overlap >= chunk_size {
            return Err(PipelineError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Settings {
            openai_api_key,
            chat_model: file
                .chat_model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: file
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chunk_size,
            chunk_overlap,
            top_k: file.top_k.unwrap_or(DEFAULT_TOP_K),
            max_tokens: file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            domain: domain.filter(|val| !val.trim().is_empty()),
            renderer_url: renderer_url.filter(|val| !val.trim().is_empty()),
        })
    }

    /// The folders scanned by the ingestion pipeline, in a fixed order.
    pub fn pdf_folders(&self, paths: &AppPaths) -> Vec<PathBuf> {
        vec![paths.report_pdf_dir.clone(), paths.insight_pdf_dir.clone()]
    }

    pub fn require_domain(&self) -> Result<&str, PipelineError> {
        self.domain
            .as_deref()
            .ok_or_else(|| PipelineError::Config("URL_DOMAIN is not set".to_string()))
    }

    pub fn require_renderer_url(&self) -> Result<&str, PipelineError> {
        self.renderer_url
            .as_deref()
            .ok_or_else(|| PipelineError::Config("RENDERER_URL is not set".to_string()))
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig, PipelineError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    serde_yaml::from_str(&contents)
        .map_err(|e| PipelineError::Config(format!("invalid {}: {}", path.display(), e)))
}
