//! Versioned Arrow IPC persistence for [`VectorIndex`].
//!
//! One file holds the whole index: schema metadata carries the format marker,
//! version and dimensionality; rows carry segment fields, a BLAKE3 hash of the
//! text, and the vector as a `FixedSizeList<Float32, D>`. Writes go to a
//! temporary file in the target directory and are renamed into place, so a
//! failed persist never leaves a partial index behind.

use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, UInt64Type};
use arrow_array::{Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray, UInt64Array};
use arrow_ipc::reader::FileReader;
use arrow_ipc::writer::FileWriter;
use arrow_schema::{DataType, Schema};
use chrono::Utc;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use ragdb_core::error::{Error, Result};
use ragdb_core::types::{Meta, Segment};

use crate::index::VectorIndex;
use crate::schema::*;

const ROWS_PER_BATCH: usize = 4096;

fn hash_content(s: &str) -> String { blake3::hash(s.as_bytes()).to_hex().to_string() }

fn corrupt(msg: impl Into<String>) -> Error { Error::CorruptIndex(msg.into()) }

pub fn persist(index: &VectorIndex, path: &Path) -> Result<()> {
    let dim = index.dimensionality().unwrap_or(0);
    let list_size = i32::try_from(dim.max(1)).map_err(|_| Error::InvalidArgument(format!("dimensionality {dim} too large to persist")))?;
    let mut metadata = HashMap::new();
    metadata.insert(META_FORMAT.to_string(), FORMAT_NAME.to_string());
    metadata.insert(META_FORMAT_VERSION.to_string(), FORMAT_VERSION.to_string());
    metadata.insert(META_DIMENSIONALITY.to_string(), dim.to_string());
    metadata.insert(META_CREATED_AT.to_string(), Utc::now().to_rfc3339());
    if let Some(id) = index.embedder_id() { metadata.insert(META_EMBEDDER.to_string(), id.to_string()); }
    let schema = build_arrow_schema(list_size, metadata);

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| Error::InvalidArgument(format!("cannot create {}: {e}", dir.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| Error::InvalidArgument(format!("cannot write to {}: {e}", dir.display())))?;

    let rows: Vec<(&Segment, &[f32])> = index.iter().collect();
    {
        let mut writer = FileWriter::try_new(tmp.as_file_mut(), &schema).map_err(write_err)?;
        for chunk in rows.chunks(ROWS_PER_BATCH) {
            let batch = rows_to_record_batch(&schema, list_size, chunk)?;
            writer.write(&batch).map_err(write_err)?;
        }
        writer.finish().map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| Error::InvalidArgument(format!("cannot move index into {}: {}", path.display(), e.error)))?;
    tracing::info!(path = %path.display(), segments = rows.len(), dim, "index persisted");
    Ok(())
}

fn write_err(e: impl std::fmt::Display) -> Error { Error::InvalidArgument(format!("failed to write index: {e}")) }

fn rows_to_record_batch(schema: &Arc<Schema>, list_size: i32, rows: &[(&Segment, &[f32])]) -> Result<RecordBatch> {
    let mut ids = Vec::with_capacity(rows.len());
    let mut texts = Vec::with_capacity(rows.len());
    let mut offsets = Vec::with_capacity(rows.len());
    let mut metas = Vec::with_capacity(rows.len());
    let mut hashes = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len() * list_size as usize);
    for (segment, vector) in rows {
        ids.push(segment.id.as_str());
        texts.push(segment.text.as_str());
        offsets.push(segment.source_offset);
        metas.push(serde_json::to_string(&segment.metadata).map_err(write_err)?);
        hashes.push(hash_content(&segment.text));
        values.extend_from_slice(vector);
    }
    let vectors = FixedSizeListArray::try_new(vector_item_field(), list_size, Arc::new(Float32Array::from(values)), None)
        .map_err(write_err)?;
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(StringArray::from(texts)),
        Arc::new(UInt64Array::from(offsets)),
        Arc::new(StringArray::from(metas)),
        Arc::new(StringArray::from(hashes)),
        Arc::new(vectors),
    ];
    RecordBatch::try_new(schema.clone(), columns).map_err(write_err)
}

pub fn load(path: &Path) -> Result<VectorIndex> {
    if !path.exists() { return Err(Error::SourceNotFound(path.to_path_buf())); }
    let file = File::open(path).map_err(|e| corrupt(format!("cannot open {}: {e}", path.display())))?;
    let reader = FileReader::try_new(file, None).map_err(|e| corrupt(format!("{} is not a readable index file: {e}", path.display())))?;

    let schema = reader.schema();
    let meta = schema.metadata();
    if meta.get(META_FORMAT).map(String::as_str) != Some(FORMAT_NAME) {
        return Err(corrupt(format!("{} is missing the '{FORMAT_NAME}' format marker", path.display())));
    }
    let version = meta.get(META_FORMAT_VERSION).and_then(|v| v.parse::<u32>().ok());
    if version != Some(FORMAT_VERSION) {
        return Err(corrupt(format!("unsupported index format version {:?} (expected {FORMAT_VERSION})", meta.get(META_FORMAT_VERSION))));
    }
    let dim: usize = meta
        .get(META_DIMENSIONALITY)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| corrupt("missing or invalid dimensionality"))?;
    match schema.field_with_name(COL_VECTOR).map(|f| f.data_type().clone()) {
        Ok(DataType::FixedSizeList(item, size)) if item.data_type() == &DataType::Float32 => {
            if dim > 0 && usize::try_from(size).ok() != Some(dim) {
                return Err(corrupt(format!("vector width {size} disagrees with declared dimensionality {dim}")));
            }
        }
        _ => return Err(corrupt("missing or mistyped 'vector' column")),
    }

    let mut index = if dim > 0 { VectorIndex::with_dimensionality(dim)? } else { VectorIndex::new() };
    if let Some(id) = meta.get(META_EMBEDDER) { index.set_embedder_id(id.clone()); }
    let created_at = meta.get(META_CREATED_AT).cloned().unwrap_or_default();

    for batch in reader {
        let batch = batch.map_err(|e| corrupt(format!("malformed record batch: {e}")))?;
        if dim == 0 && batch.num_rows() > 0 {
            return Err(corrupt("index declares no dimensionality but has rows"));
        }
        append_batch(&mut index, &batch, dim)?;
    }
    tracing::info!(path = %path.display(), segments = index.len(), dim, created_at = %created_at, "index loaded");
    Ok(index)
}

fn append_batch(index: &mut VectorIndex, batch: &RecordBatch, dim: usize) -> Result<()> {
    let ids = utf8_column(batch, COL_ID)?;
    let texts = utf8_column(batch, COL_TEXT)?;
    let metas = utf8_column(batch, COL_METADATA)?;
    let hashes = utf8_column(batch, COL_CONTENT_HASH)?;
    let offsets = batch
        .column_by_name(COL_SOURCE_OFFSET)
        .and_then(|c| c.as_primitive_opt::<UInt64Type>())
        .ok_or_else(|| corrupt("missing or mistyped 'source_offset' column"))?;
    let vectors = batch
        .column_by_name(COL_VECTOR)
        .and_then(|c| c.as_fixed_size_list_opt())
        .ok_or_else(|| corrupt("missing or mistyped 'vector' column"))?;
    let values = vectors
        .values()
        .as_primitive_opt::<Float32Type>()
        .ok_or_else(|| corrupt("vector values are not float32"))?;
    if values.null_count() > 0 { return Err(corrupt("vector values contain nulls")); }

    for i in 0..batch.num_rows() {
        if ids.is_null(i) || texts.is_null(i) || metas.is_null(i) || hashes.is_null(i) || offsets.is_null(i) || vectors.is_null(i) {
            return Err(corrupt(format!("row {i} has null fields")));
        }
        let text = texts.value(i);
        if hashes.value(i) != hash_content(text) {
            return Err(corrupt(format!("content hash mismatch for segment '{}'", ids.value(i))));
        }
        let metadata: Meta = serde_json::from_str(metas.value(i))
            .map_err(|e| corrupt(format!("invalid metadata for segment '{}': {e}", ids.value(i))))?;
        let start = usize::try_from(vectors.value_offset(i)).map_err(|_| corrupt("negative vector offset"))?;
        let vector = values
            .values()
            .get(start..start + dim)
            .ok_or_else(|| corrupt(format!("vector for segment '{}' is truncated", ids.value(i))))?
            .to_vec();
        let segment = Segment { id: ids.value(i).to_string(), text: text.to_string(), source_offset: offsets.value(i), metadata };
        index.insert(segment, vector).map_err(|e| corrupt(format!("row {i}: {e}")))?;
    }
    Ok(())
}

fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_string_opt::<i32>())
        .ok_or_else(|| corrupt(format!("missing or mistyped '{name}' column")))
}
