use std::sync::Arc;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Generator;
use ragdb_core::types::ScoredSegment;
use ragdb_llm::{build_prompt, format_context};

use crate::retriever::Retriever;

/// Generated answer and the segments it was conditioned on, best first.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ScoredSegment>,
}

/// Retrieve the top-`k` segments for `question` and assemble the grounded
/// prompt from them. The question is trimmed; an empty one is `InvalidArgument`.
pub fn grounded_prompt(retriever: &Retriever, question: &str, k: usize) -> Result<(String, Vec<ScoredSegment>)> {
    let question = question.trim();
    if question.is_empty() { return Err(Error::InvalidArgument("question is empty".to_string())); }
    let sources = retriever.retrieve_scored(question, k)?;
    let segments: Vec<_> = sources.iter().map(|hit| hit.segment.clone()).collect();
    Ok((build_prompt(&format_context(&segments), question), sources))
}

/// Retrieve, assemble the prompt, generate.
pub struct RagPipeline {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>, top_k: usize) -> Self {
        Self { retriever, generator, top_k }
    }

    pub fn retriever(&self) -> &Retriever { &self.retriever }

    /// The prompt that [`answer`](Self::answer) would send, with its sources.
    pub fn prompt_for(&self, question: &str, k: usize) -> Result<(String, Vec<ScoredSegment>)> {
        grounded_prompt(&self.retriever, question, k)
    }

    pub fn answer(&self, question: &str) -> Result<Answer> { self.answer_with_k(question, self.top_k) }

    pub fn answer_with_k(&self, question: &str, k: usize) -> Result<Answer> {
        let (prompt, sources) = self.prompt_for(question, k)?;
        tracing::info!(sources = sources.len(), prompt_chars = prompt.len(), "generating answer");
        let text = self.generator.generate(&prompt)?;
        Ok(Answer { text, sources })
    }
}
