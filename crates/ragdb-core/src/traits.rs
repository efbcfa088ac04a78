use std::path::Path;

use crate::error::Result;

/// Maps text to fixed-length vectors. All vectors from one embedder share `dim()`.
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in persisted indexes (e.g. `bert:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| crate::error::Error::Upstream("embedder returned no vector".to_string()))
    }
}

/// Language model used to answer a question from an assembled prompt.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Produces the raw pages of a document.
pub trait DocumentLoader: Send + Sync {
    /// Whether this loader understands the file at `path` (by extension).
    fn supports(&self, path: &Path) -> bool;
    fn load_pages(&self, path: &Path) -> Result<Vec<String>>;
}
