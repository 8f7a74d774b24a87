pub mod chunker;
pub mod loader;
pub mod pipeline;

pub use chunker::{Chunk, Chunker};
pub use loader::PageDocument;
pub use pipeline::{IngestOutcome, IngestPipeline, IngestReport};
