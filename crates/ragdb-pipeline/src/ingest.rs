//! Source → pages → segments → vectors → index file.
//!
//! Ingestion is all-or-nothing: the index is assembled in memory and only
//! persisted once every document has been loaded, chunked and embedded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{stream, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use ragdb_core::chunker::Chunker;
use ragdb_core::config::Settings;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{DocumentLoader, Embedder};
use ragdb_core::types::Segment;
use ragdb_vector::VectorIndex;

use crate::loader::{collect_documents, Loaders};

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub documents: usize,
    pub pages: usize,
    pub segments: usize,
    pub dimensionality: usize,
    /// Where the index was written; `None` for [`Ingestor::build`].
    pub index_path: Option<PathBuf>,
    pub elapsed: Duration,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    loader: Arc<dyn DocumentLoader>,
    chunker: Chunker,
    batch_size: usize,
    parallelism: usize,
    timeout: Duration,
    progress: bool,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Chunker) -> Self {
        Self {
            embedder,
            loader: Arc::new(Loaders::default()),
            chunker,
            batch_size: 32,
            parallelism: 2,
            timeout: Duration::from_secs(120),
            progress: false,
        }
    }

    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunker = Chunker::from_settings(&settings.chunking)?;
        Ok(Self::new(embedder, chunker)
            .with_batching(settings.embedding.batch_size, settings.embedding.parallelism)
            .with_timeout(Duration::from_secs(settings.embedding.timeout_secs)))
    }

    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Segments per embedding call and how many calls may run at once (both at least 1).
    pub fn with_batching(mut self, batch_size: usize, parallelism: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Draw a progress bar on stderr while embedding.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Build the index for `source` and persist it to `index_path`.
    pub async fn ingest(&self, source: &Path, index_path: &Path) -> Result<IngestReport> {
        let result = self.build_and_persist(source, index_path).await;
        match &result {
            Ok(report) => tracing::info!(
                documents = report.documents,
                segments = report.segments,
                dim = report.dimensionality,
                elapsed_ms = report.elapsed.as_millis() as u64,
                path = %index_path.display(),
                "ingestion complete"
            ),
            Err(e) => tracing::error!(kind = e.kind(), error = %e, source = %source.display(), "ingestion failed; nothing persisted"),
        }
        result
    }

    async fn build_and_persist(&self, source: &Path, index_path: &Path) -> Result<IngestReport> {
        let (index, mut report) = self.build(source).await?;
        index.persist(index_path)?;
        report.index_path = Some(index_path.to_path_buf());
        Ok(report)
    }

    /// Load, chunk and embed `source` into a fresh in-memory index.
    pub async fn build(&self, source: &Path) -> Result<(VectorIndex, IngestReport)> {
        let started = Instant::now();
        let documents = collect_documents(source, self.loader.as_ref())?;
        tracing::info!(source = %source.display(), documents = documents.len(), "ingesting");

        let mut segments: Vec<Segment> = Vec::new();
        let mut pages_total = 0usize;
        for doc in &documents {
            let loader = Arc::clone(&self.loader);
            let path = doc.path.clone();
            let pages = tokio::task::spawn_blocking(move || loader.load_pages(&path))
                .await
                .map_err(|e| Error::InvalidArgument(format!("loading {} aborted: {e}", doc.path.display())))??;
            if pages.iter().all(|p| p.trim().is_empty()) {
                return Err(Error::InvalidArgument(format!("{} has no extractable text", doc.path.display())));
            }
            pages_total += pages.len();
            let source_label = doc.path.display().to_string();
            let doc_segments = self.chunker.split(&doc.doc_id, &pages);
            tracing::debug!(doc_id = %doc.doc_id, pages = pages.len(), segments = doc_segments.len(), "chunked");
            segments.extend(
                doc_segments
                    .into_iter()
                    .map(|s| s.with_meta("source", source_label.as_str()).with_meta("doc_id", doc.doc_id.as_str())),
            );
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = self.embed_all(texts).await?;

        let dim = self.embedder.dim();
        let mut index = VectorIndex::new();
        index.set_embedder_id(self.embedder.id());
        for (segment, vector) in segments.into_iter().zip(vectors) {
            if vector.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: vector.len() });
            }
            index.insert(segment, vector)?;
        }

        let report = IngestReport {
            documents: documents.len(),
            pages: pages_total,
            segments: index.len(),
            dimensionality: index.dimensionality().unwrap_or(dim),
            index_path: None,
            elapsed: started.elapsed(),
        };
        Ok((index, report))
    }

    /// Embed in batches, up to `parallelism` at a time, preserving input order.
    async fn embed_all(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let pb = self.progress_bar(texts.len());
        let batches: Vec<Vec<String>> = texts.chunks(self.batch_size).map(<[String]>::to_vec).collect();
        let total_batches = batches.len();
        let timeout = self.timeout;

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches.into_iter().enumerate())
            .map(|(i, batch)| {
                let embedder = Arc::clone(&self.embedder);
                let pb = pb.clone();
                async move {
                    let expected = batch.len();
                    let task = tokio::task::spawn_blocking(move || embedder.embed_batch(&batch));
                    let vectors = match tokio::time::timeout(timeout, task).await {
                        Err(_) => {
                            return Err(Error::UpstreamTimeout(format!(
                                "embedding batch {}/{total_batches} took longer than {timeout:?}",
                                i + 1
                            )))
                        }
                        Ok(Err(join)) => return Err(Error::Upstream(format!("embedding batch {} aborted: {join}", i + 1))),
                        Ok(Ok(result)) => result?,
                    };
                    if vectors.len() != expected {
                        return Err(Error::Upstream(format!(
                            "embedder returned {} vectors for {expected} inputs",
                            vectors.len()
                        )));
                    }
                    pb.inc(expected as u64);
                    Ok::<_, Error>(vectors)
                }
            })
            .buffered(self.parallelism)
            .try_collect()
            .await
            .inspect_err(|_| pb.abandon())?;

        pb.finish_with_message("embedded");
        Ok(embedded.into_iter().flatten().collect())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.progress { return ProgressBar::hidden(); }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
