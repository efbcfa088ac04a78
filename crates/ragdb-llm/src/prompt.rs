use ragdb_core::types::Segment;

/// Connectivity check sent by `ragdb ping`.
pub const PING_PROMPT: &str = "Hello! Are you working?";

const INSTRUCTIONS: &str = "You are a helpful assistant. Use the following pieces of context to answer the question at the end.\n\
If the answer is not in the context, say that you don't know, don't try to make up an answer.";

/// Segment texts in retrieval order, separated by a blank line.
pub fn format_context(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{INSTRUCTIONS}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:")
}
