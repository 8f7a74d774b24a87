//! Shared application state for the chat server.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::PipelineError;
use crate::llm::{ChatMessage, LlmProvider, OpenAiProvider};
use crate::rag::retriever::Retriever;
use crate::rag::sqlite::SqliteVectorStore;
use crate::rag::store::VectorStore;

const WELCOME_MESSAGE: &str = "How can I help you?";

pub struct AppState {
    pub paths: AppPaths,
    pub settings: Settings,
    pub store: Arc<dyn VectorStore>,
    pub retriever: Retriever,
    pub sessions: RwLock<HashMap<Uuid, Vec<ChatMessage>>>,
}

impl AppState {
    /// Wire up the full runtime: configuration, the vector store and the
    /// retriever. A store created fresh here is empty, which means the
    /// ingestion pipeline has not run yet; the server still starts, it
    /// just has nothing to cite.
    pub async fn initialize() -> Result<Arc<Self>, PipelineError> {
        let paths = AppPaths::new();
        let settings = Settings::load(&paths)?;

        let provider: Arc<dyn LlmProvider> =
            Arc::new(OpenAiProvider::new(settings.openai_api_key.clone()));

        let (store, created) = SqliteVectorStore::open_or_create(&paths.store_path).await?;
        if created {
            tracing::warn!(
                "vector store {} did not exist; answers will lack context until \
                 the embedding update runs",
                paths.store_path.display()
            );
        }
        let store: Arc<dyn VectorStore> = Arc::new(store);

        Ok(Arc::new(Self::from_parts(paths, settings, store, provider)))
    }

    /// Assemble state from pre-built components. Tests inject fakes here.
    pub fn from_parts(
        paths: AppPaths,
        settings: Settings,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let retriever = Retriever::new(
            store.clone(),
            provider,
            settings.embedding_model.clone(),
            settings.chat_model.clone(),
            settings.top_k,
            settings.max_tokens,
        );

        Self {
            paths,
            settings,
            store,
            retriever,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session seeded with the assistant's greeting.
    pub async fn new_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        let greeting = ChatMessage::assistant(WELCOME_MESSAGE);
        self.sessions.write().await.insert(id, vec![greeting]);
        id
    }
}
