//! ragdb-pipeline
//!
//! Wires the stages together: document loading, chunking, batched embedding
//! and index persistence on the way in; retrieval, prompt assembly and
//! generation on the way out.

pub mod answer;
pub mod ingest;
pub mod loader;
pub mod retriever;

pub use answer::{grounded_prompt, Answer, RagPipeline};
pub use ingest::{IngestReport, Ingestor};
pub use loader::{collect_documents, Loaders, PdfLoader, SourceDocument, TextLoader};
pub use retriever::Retriever;
