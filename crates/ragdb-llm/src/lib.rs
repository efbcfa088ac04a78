//! ragdb-llm
//!
//! Prompt assembly and the chat-completions client used to answer questions
//! over retrieved segments.

pub mod openai;
pub mod prompt;

pub use openai::OpenAiGenerator;
pub use prompt::{build_prompt, format_context, PING_PROMPT};
