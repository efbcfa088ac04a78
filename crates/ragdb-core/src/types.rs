//! Domain types shared by the chunker, the vector index and the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type SegmentId = String;
pub type Meta = BTreeMap<String, MetaValue>;

/// Scalar metadata value attached to a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(x) => write!(f, "{x}"),
            MetaValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self { MetaValue::Str(s.to_string()) }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self { MetaValue::Str(s) }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self { MetaValue::Int(i) }
}

impl From<usize> for MetaValue {
    fn from(i: usize) -> Self { MetaValue::Int(i64::try_from(i).unwrap_or(i64::MAX)) }
}

impl From<f64> for MetaValue {
    fn from(x: f64) -> Self { MetaValue::Float(x) }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self { MetaValue::Bool(b) }
}

/// A contiguous slice of source text, indexed and retrieved as one unit.
///
/// - `id`: unique within an index, `"<doc_id>:<chunk_index>"` when produced by the chunker
/// - `text`: the payload that gets embedded and handed to the generator
/// - `source_offset`: character offset of the first char in the joined document text
/// - `metadata`: page span, chunk position, source path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub text: String,
    pub source_offset: u64,
    #[serde(default)]
    pub metadata: Meta,
}

impl Segment {
    pub fn new(id: impl Into<SegmentId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), source_offset: 0, metadata: Meta::new() }
    }

    pub fn with_offset(mut self, source_offset: u64) -> Self {
        self.source_offset = source_offset;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&MetaValue> { self.metadata.get(key) }
}

/// A segment together with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedSegment {
    pub segment: Segment,
    pub vector: Vec<f32>,
}

/// A search hit. `score` is cosine similarity; higher is better.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub score: f32,
}
