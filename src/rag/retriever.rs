//! Query-time retrieval and prompt assembly.
//!
//! Every answer is grounded: the latest question is embedded, the top-k
//! most similar stored chunks become a cited context block, and the chat
//! model is called with a bounded output budget.

use std::sync::Arc;

use super::store::{SearchResult, VectorStore};
use crate::core::errors::PipelineError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

const SYSTEM_INSTRUCTION: &str = "You are a knowledgeable and helpful assistant designed to \
support employees by providing insights and answers based on the company's database of \
reports and insights. Your goal is to offer clear, detailed, and contextually accurate \
responses. Ensure your answers are relevant to the employee's role and needs, and include \
practical steps or recommendations when appropriate.";

pub struct Retriever {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn LlmProvider>,
    embedding_model: String,
    chat_model: String,
    top_k: usize,
    max_tokens: u32,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn LlmProvider>,
        embedding_model: String,
        chat_model: String,
        top_k: usize,
        max_tokens: u32,
    ) -> Self {
        Self {
            store,
            provider,
            embedding_model,
            chat_model,
            top_k,
            max_tokens,
        }
    }

    /// Answer the newest user question given the prior conversation.
    /// `history` carries earlier turns only; the question is passed
    /// separately and appended last.
    pub async fn answer(
        &self,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String, PipelineError> {
        let query_embedding = self
            .provider
            .embed(&[question.to_string()], &self.embedding_model)
            .await?;
        let query_embedding = query_embedding
            .first()
            .ok_or_else(|| PipelineError::Api("no embedding returned for query".to_string()))?;

        let hits = self.store.search(query_embedding, self.top_k).await?;
        let context = format_context(&hits);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(format!(
            "{}\n\nContext:\n{}",
            SYSTEM_INSTRUCTION, context
        )));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(question));

        let request = ChatRequest::new(messages).with_max_tokens(self.max_tokens);
        self.provider.chat(request, &self.chat_model).await
    }
}

/// Format search hits into a cited context block, one numbered entry per
/// chunk with its source file and page.
fn format_context(hits: &[SearchResult]) -> String {
    if hits.is_empty() {
        return "(no matching documents found)".to_string();
    }

    let mut context = String::new();
    for (i, hit) in hits.iter().enumerate() {
        context.push_str(&format!(
            "[{}] (source: {}, page {})\n{}\n\n",
            i + 1,
            hit.chunk.source,
            hit.chunk.page_number,
            hit.chunk.content
        ));
    }
    context.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::StoredChunk;

    fn hit(content: &str, source: &str, page: i64, score: f32) -> SearchResult {
        SearchResult {
            chunk: StoredChunk {
                chunk_id: format!("id-{}", content),
                content: content.to_string(),
                source: source.to_string(),
                folder: "pdf_reports".to_string(),
                page_number: page,
                chunk_index: 0,
            },
            score,
        }
    }

    #[test]
    fn context_cites_source_and_page() {
        let hits = vec![
            hit("Circular economy findings.", "pdf_reports/a.pdf", 3, 0.9),
            hit("Annual emissions data.", "pdf_reports/b.pdf", 1, 0.7),
        ];

        let context = format_context(&hits);
        assert!(context.starts_with("[1] (source: pdf_reports/a.pdf, page 3)"));
        assert!(context.contains("Circular economy findings."));
        assert!(context.contains("[2] (source: pdf_reports/b.pdf, page 1)"));
    }

    #[test]
    fn empty_hits_yield_a_placeholder() {
        assert_eq!(format_context(&[]), "(no matching documents found)");
    }
}
