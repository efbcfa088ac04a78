//! Fixed-size sliding-window chunking over the pages of one document.

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::Segment;

/// Splits document pages into overlapping character windows.
///
/// Windows are measured in `char`s, so a multi-byte code point is never cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_size <= overlap {
            return Err(Error::InvalidConfiguration(format!(
                "chunk_size ({chunk_size}) must be greater than overlap ({overlap})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn overlap(&self) -> usize { self.overlap }

    /// Split `pages` (joined with `\n`) into segments with ids `"<doc_id>:<n>"`.
    pub fn split(&self, doc_id: &str, pages: &[String]) -> Vec<Segment> {
        let (joined, page_starts) = join_pages(pages);
        let bounds: Vec<usize> = joined.char_indices().map(|(b, _)| b).chain(std::iter::once(joined.len())).collect();
        let total = bounds.len() - 1;

        let mut windows = Vec::new();
        if total < self.chunk_size {
            windows.push((0, total));
        } else {
            let step = self.chunk_size - self.overlap;
            let mut start = 0;
            loop {
                let end = (start + self.chunk_size).min(total);
                windows.push((start, end));
                if end >= total { break; }
                start += step;
            }
        }

        let total_chunks = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| {
                let text = &joined[bounds[start]..bounds[end]];
                let last = if end > start { end - 1 } else { start };
                Segment::new(format!("{doc_id}:{chunk_index}"), text)
                    .with_offset(start as u64)
                    .with_meta("page", page_of(&page_starts, start))
                    .with_meta("page_end", page_of(&page_starts, last))
                    .with_meta("chunk_index", chunk_index)
                    .with_meta("total_chunks", total_chunks)
            })
            .collect()
    }
}

/// Split `pages` with the given window parameters; ids are prefixed with `doc`.
pub fn split(pages: &[String], chunk_size: usize, overlap: usize) -> Result<Vec<Segment>> {
    Ok(Chunker::new(chunk_size, overlap)?.split("doc", pages))
}

/// Join pages with `\n`, returning the text and the char offset each page starts at.
fn join_pages(pages: &[String]) -> (String, Vec<usize>) {
    let mut joined = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    let mut starts = Vec::with_capacity(pages.len());
    let mut chars = 0usize;
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            joined.push('\n');
            chars += 1;
        }
        starts.push(chars);
        joined.push_str(page);
        chars += page.chars().count();
    }
    (joined, starts)
}

/// 1-based page number containing char offset `pos`.
fn page_of(page_starts: &[usize], pos: usize) -> usize {
    page_starts.partition_point(|&s| s <= pos).max(1)
}
