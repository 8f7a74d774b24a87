//! Scan the PDF folders and synchronize the vector store.

use std::sync::Arc;

use report_assistant::core::config::{AppPaths, Settings};
use report_assistant::core::logging;
use report_assistant::ingest::pipeline::{IngestOutcome, IngestPipeline};
use report_assistant::llm::OpenAiProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let settings = Settings::load(&paths)?;
    let folders = settings.pdf_folders(&paths);
    let provider = Arc::new(OpenAiProvider::new(settings.openai_api_key.clone()));

    let pipeline = IngestPipeline::new(settings, provider, paths.store_path.clone());
    match pipeline.run(&folders).await? {
        IngestOutcome::NothingToDo => {
            tracing::info!("no documents found, vector store left untouched");
        }
        IngestOutcome::Synced(report) => {
            tracing::info!(
                "synchronized {} chunks from {} documents ({} newly inserted)",
                report.chunks,
                report.documents,
                report.inserted
            );
        }
    }

    Ok(())
}
