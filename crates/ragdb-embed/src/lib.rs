//! ragdb-embed
//!
//! Embedding backends behind `ragdb_core::traits::Embedder`: a local BERT
//! sentence-transformer run with candle, and a hashing embedder for tests.

use std::sync::Arc;

use ragdb_core::config::EmbeddingSettings;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

mod bert;
mod device;
mod fake;
mod pool;
mod tokenize;

pub use bert::BertEmbedder;
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch_on_device;

pub const FAKE_MODEL: &str = "fake";

/// Build the embedder named by `settings.model`.
///
/// `"fake"`, or `APP_USE_FAKE_EMBEDDINGS=1|true`, selects [`FakeEmbedder`];
/// anything else is loaded as a local BERT model.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || settings.model == FAKE_MODEL {
        tracing::info!(dim = settings.dimension, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension)?));
    }
    let model = BertEmbedder::load(settings)
        .map_err(|e| Error::InvalidConfiguration(format!("cannot load embedding model '{}': {e:#}", settings.model)))?;
    Ok(Arc::new(model))
}
