use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const PASSAGES_TABLE: &str = "passages";
pub const INDEX_TABLE: &str = "flat_index";
pub const META_TABLE: &str = "meta";

fn vector_field(dim: i32) -> Field {
	Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true)
}

/// Passage text, source label and vector share one row so they are always persisted together.
pub fn build_passages_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("position", DataType::Int64, false),
		Field::new("source", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		vector_field(dim),
	]))
}

pub fn build_index_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("offset", DataType::Int64, false),
		vector_field(dim),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
