//! Retrieval-augmented assistant over a corpus of company PDF reports.
//!
//! The library splits into an ingestion side (scrape the report site,
//! download or render PDFs, extract, chunk and embed their text into a
//! SQLite vector store) and a serving side (an axum chat server that
//! answers questions grounded in the stored chunks).

pub mod core;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod scrape;
pub mod server;
pub mod state;
