use arrow_schema::{DataType, Field, FieldRef, Schema};
use std::collections::HashMap;
use std::sync::Arc;

pub const FORMAT_NAME: &str = "ragdb-index";
pub const FORMAT_VERSION: u32 = 1;

pub const META_FORMAT: &str = "ragdb.format";
pub const META_FORMAT_VERSION: &str = "ragdb.format_version";
pub const META_DIMENSIONALITY: &str = "ragdb.dimensionality";
pub const META_CREATED_AT: &str = "ragdb.created_at";
pub const META_EMBEDDER: &str = "ragdb.embedder";

pub const COL_ID: &str = "id";
pub const COL_TEXT: &str = "text";
pub const COL_SOURCE_OFFSET: &str = "source_offset";
pub const COL_METADATA: &str = "metadata";
pub const COL_CONTENT_HASH: &str = "content_hash";
pub const COL_VECTOR: &str = "vector";

pub fn vector_item_field() -> FieldRef { Arc::new(Field::new("item", DataType::Float32, true)) }

/// Columnar layout of a persisted index. `list_size` is the fixed vector width.
pub fn build_arrow_schema(list_size: i32, metadata: HashMap<String, String>) -> Arc<Schema> {
	Arc::new(Schema::new_with_metadata(vec![
		Field::new(COL_ID, DataType::Utf8, false),
		Field::new(COL_TEXT, DataType::Utf8, false),
		Field::new(COL_SOURCE_OFFSET, DataType::UInt64, false),
		Field::new(COL_METADATA, DataType::Utf8, false),
		Field::new(COL_CONTENT_HASH, DataType::Utf8, false),
		Field::new(COL_VECTOR, DataType::FixedSizeList(vector_item_field(), list_size), false),
	], metadata))
}
