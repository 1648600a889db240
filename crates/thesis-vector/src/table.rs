//! LanceDB connection and housekeeping helpers.
//!
//! Provides database open functions, table creation from a single record
//! batch, column readers, and a simple key/value metadata table.

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{Array, FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_schema::Schema;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use thesis_core::{Error, Result};

use crate::schema::build_meta_schema;

pub(crate) fn lance_err(e: lancedb::Error) -> Error {
    Error::storage(format!("lancedb: {e}"))
}

pub(crate) fn arrow_err(e: arrow_schema::ArrowError) -> Error {
    Error::storage(format!("arrow: {e}"))
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(lance_err)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(lance_err)?;
    Ok(names.iter().any(|n| n == name))
}

/// Create `name` holding `batch`, or an empty table when `batch` is `None`.
pub async fn create_table_with(conn: &Connection, name: &str, schema: Arc<Schema>, batch: Option<RecordBatch>) -> Result<()> {
    let batches: Vec<std::result::Result<RecordBatch, arrow_schema::ArrowError>> = batch.into_iter().map(Ok).collect();
    let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
    conn.create_table(name, reader).execute().await.map_err(lance_err)?;
    Ok(())
}

/// Read every batch of a table.
pub async fn scan_table(conn: &Connection, name: &str) -> Result<Vec<RecordBatch>> {
    let t = conn.open_table(name).execute().await.map_err(lance_err)?;
    let mut stream = t.query().execute().await.map_err(lance_err)?;
    let mut out = Vec::new();
    while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
        out.push(batch);
    }
    Ok(out)
}

pub(crate) fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::storage(format!("missing column '{name}'")))
}

pub(crate) fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| Error::storage(format!("missing column '{name}'")))
}

/// Vector at row `i` of the `vector` column; `None` for null rows.
pub(crate) fn vector_at(batch: &RecordBatch, i: usize) -> Result<Option<Vec<f32>>> {
    let col = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| Error::storage("missing column 'vector'"))?;
    if !col.is_valid(i) {
        return Ok(None);
    }
    let list = col.value(i);
    Ok(Some(list.as_primitive::<arrow_array::types::Float32Type>().values().to_vec()))
}

pub(crate) fn vectors_to_array(vectors: &[Vec<f32>], dim: i32) -> FixedSizeListArray {
    let rows: Vec<Option<Vec<Option<f32>>>> = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
    FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(rows.into_iter(), dim)
}

pub async fn write_meta(conn: &Connection, table: &str, entries: &[(&str, String)]) -> Result<()> {
    let now = Utc::now().timestamp_millis();
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(entries.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(entries.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(vec![now; entries.len()])),
        ],
    )
    .map_err(arrow_err)?;
    create_table_with(conn, table, build_meta_schema(), Some(rb)).await
}

pub async fn read_meta(conn: &Connection, table: &str) -> Result<HashMap<String, String>> {
    if !table_exists(conn, table).await? {
        return Err(Error::storage(format!("meta table '{table}' missing")));
    }
    let mut out = HashMap::new();
    for batch in scan_table(conn, table).await? {
        let keys = string_column(&batch, "key")?;
        let values = string_column(&batch, "value")?;
        for i in 0..batch.num_rows() {
            out.insert(keys.value(i).to_string(), values.value(i).to_string());
        }
    }
    Ok(out)
}
