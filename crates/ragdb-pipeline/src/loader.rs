//! Page extraction for supported document types and source discovery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::DocumentLoader;

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// PDF text, one string per page.
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn supports(&self, path: &Path) -> bool { has_extension(path, &["pdf"]) }

    fn load_pages(&self, path: &Path) -> Result<Vec<String>> {
        let pages = pdf_extract::extract_text_by_pages(path)
            .map_err(|e| Error::InvalidArgument(format!("cannot extract text from {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), pages = pages.len(), "pdf extracted");
        Ok(pages)
    }
}

/// Plain text and markdown, read as a single page.
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn supports(&self, path: &Path) -> bool { has_extension(path, &["txt", "md", "markdown"]) }

    fn load_pages(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = std::fs::read(path).map_err(|e| Error::InvalidArgument(format!("cannot read {}: {e}", path.display())))?;
        let text = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), "file is not valid UTF-8, replacing invalid sequences");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(vec![text])
    }
}

/// Dispatches to the first loader that supports a path.
pub struct Loaders {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl Default for Loaders {
    fn default() -> Self { Self { loaders: vec![Box::new(PdfLoader), Box::new(TextLoader)] } }
}

impl Loaders {
    pub fn new(loaders: Vec<Box<dyn DocumentLoader>>) -> Self { Self { loaders } }
}

impl DocumentLoader for Loaders {
    fn supports(&self, path: &Path) -> bool { self.loaders.iter().any(|l| l.supports(path)) }

    fn load_pages(&self, path: &Path) -> Result<Vec<String>> {
        match self.loaders.iter().find(|l| l.supports(path)) {
            Some(loader) => loader.load_pages(path),
            None => Err(Error::InvalidArgument(format!("unsupported document type: {}", path.display()))),
        }
    }
}

/// A file to ingest and the id its segments are prefixed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub doc_id: String,
    pub path: PathBuf,
}

/// Resolve `source` into the documents to ingest.
///
/// A file is taken as-is (its type is checked when loading). A directory
/// yields every supported file beneath it in sorted path order; unsupported
/// files are skipped. Ids are file stems, or relative paths (extension
/// included) when stems collide.
pub fn collect_documents(source: &Path, loader: &dyn DocumentLoader) -> Result<Vec<SourceDocument>> {
    if !source.exists() { return Err(Error::SourceNotFound(source.to_path_buf())); }
    if source.is_file() {
        return Ok(vec![SourceDocument { doc_id: stem_of(source), path: source.to_path_buf() }]);
    }

    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(source).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if loader.supports(path) {
            paths.push(path.to_path_buf());
        } else {
            tracing::debug!(path = %path.display(), "skipping unsupported file");
        }
    }
    paths.sort();
    if paths.is_empty() {
        return Err(Error::InvalidArgument(format!("no supported documents under {}", source.display())));
    }

    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for p in &paths { *stem_counts.entry(stem_of(p)).or_default() += 1; }
    Ok(paths
        .into_iter()
        .map(|path| {
            let stem = stem_of(&path);
            let doc_id = if stem_counts.get(&stem).copied().unwrap_or(0) > 1 {
                let rel = path.strip_prefix(source).unwrap_or(&path);
                rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/")
            } else {
                stem
            };
            SourceDocument { doc_id, path }
        })
        .collect())
}

fn stem_of(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "doc".to_string())
}
