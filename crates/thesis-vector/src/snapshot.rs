//! Corpus snapshot: passages, vectors and the flat index saved as one unit.
//!
//! Layout of a snapshot directory (a LanceDB database):
//! - `passages`: `position`, `source`, `text`, `vector` per row
//! - `flat_index`: `offset`, `vector` per row
//! - `meta`: `passage_count`, `dim`, `embedder_id`, `fingerprint`, `saved_at`
//!
//! Loading checks every table against `meta` and against each other, so a
//! partial or mixed snapshot fails with a storage error instead of serving
//! passages that do not match their vectors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{Int64Array, RecordBatch, StringArray};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thesis_core::types::Passage;
use thesis_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::flat::{fingerprint, FlatL2Index};
use crate::schema::{build_index_schema, build_passages_schema, INDEX_TABLE, META_TABLE, PASSAGES_TABLE};
use crate::store::EmbeddingStore;
use crate::table::{
    arrow_err, create_table_with, int64_column, open_db, read_meta, scan_table, string_column, table_exists, vector_at,
    vectors_to_array, write_meta,
};

/// Summary of a saved snapshot as recorded in its `meta` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub passage_count: usize,
    pub dim: usize,
    pub embedder_id: String,
    pub fingerprint: String,
    pub saved_at: DateTime<Utc>,
}

/// A store and the index built over it, loaded together.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub store: EmbeddingStore,
    pub index: FlatL2Index,
    pub meta: SnapshotMeta,
}

/// Replace the snapshot at `dir` with one of `store` and `index`.
///
/// The snapshot is written to a staging directory next to `dir` and only then
/// swapped in, so a failed save leaves the previous snapshot loadable. An
/// existing non-empty `dir` that is not a snapshot is never replaced.
pub async fn save_corpus(dir: &Path, store: &EmbeddingStore, index: &FlatL2Index) -> Result<SnapshotMeta> {
    if index.fingerprint() != store.fingerprint() || index.len() != store.len() {
        return Err(Error::InvalidInput("index was not built from this store; rebuild it before saving".into()));
    }
    let dim = i32::try_from(store.dim()).map_err(|_| Error::InvalidInput(format!("dim {} too large", store.dim())))?;
    if dim == 0 {
        return Err(Error::InvalidInput("cannot save a store with dim 0".into()));
    }
    ensure_replaceable(dir)?;

    let staging = sibling(dir, "saving")?;
    if staging.is_dir() {
        std::fs::remove_dir_all(&staging)
            .map_err(|e| Error::storage(format!("cannot clear staging dir {}: {e}", staging.display())))?;
    }
    let meta = match write_snapshot(&staging, store, index, dim).await {
        Ok(meta) => meta,
        Err(e) => {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }
    };
    swap_into_place(&staging, dir)?;
    info!(dir = %dir.display(), passages = meta.passage_count, "corpus snapshot saved");
    Ok(meta)
}

/// `dir` may be replaced when it is absent, empty, or already a snapshot.
fn ensure_replaceable(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!("{} exists and is not a directory", dir.display())));
    }
    if dir.join(format!("{META_TABLE}.lance")).is_dir() {
        return Ok(());
    }
    let mut entries = std::fs::read_dir(dir).map_err(|e| Error::storage(format!("cannot read {}: {e}", dir.display())))?;
    if entries.next().is_some() {
        return Err(Error::InvalidInput(format!(
            "refusing to replace {}: it is not a corpus snapshot",
            dir.display()
        )));
    }
    Ok(())
}

/// `.{name}.{suffix}` next to `dir`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("snapshot path {} has no directory name", dir.display())))?;
    Ok(dir.with_file_name(format!(".{}.{suffix}", name.to_string_lossy())))
}

fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return std::fs::rename(staging, dir)
            .map_err(|e| Error::storage(format!("cannot move snapshot into {}: {e}", dir.display())));
    }
    let retired = sibling(dir, "old")?;
    if retired.exists() {
        std::fs::remove_dir_all(&retired)
            .map_err(|e| Error::storage(format!("cannot clear {}: {e}", retired.display())))?;
    }
    std::fs::rename(dir, &retired).map_err(|e| Error::storage(format!("cannot retire {}: {e}", dir.display())))?;
    if let Err(e) = std::fs::rename(staging, dir) {
        let _ = std::fs::rename(&retired, dir);
        return Err(Error::storage(format!("cannot move snapshot into {}: {e}", dir.display())));
    }
    if let Err(e) = std::fs::remove_dir_all(&retired) {
        warn!(dir = %retired.display(), error = %e, "could not remove previous snapshot");
    }
    Ok(())
}

async fn write_snapshot(dir: &Path, store: &EmbeddingStore, index: &FlatL2Index, dim: i32) -> Result<SnapshotMeta> {
    std::fs::create_dir_all(dir).map_err(|e| Error::storage(format!("cannot create {}: {e}", dir.display())))?;
    let conn = open_db(&dir.to_string_lossy()).await?;

    let passages = store.passages();
    let passages_batch = if passages.is_empty() {
        None
    } else {
        Some(
            RecordBatch::try_new(
                build_passages_schema(dim),
                vec![
                    Arc::new(Int64Array::from(passages.iter().map(|p| p.position as i64).collect::<Vec<_>>())),
                    Arc::new(StringArray::from(passages.iter().map(|p| p.source.clone()).collect::<Vec<_>>())),
                    Arc::new(StringArray::from(passages.iter().map(|p| p.text.clone()).collect::<Vec<_>>())),
                    Arc::new(vectors_to_array(store.vectors(), dim)),
                ],
            )
            .map_err(arrow_err)?,
        )
    };
    create_table_with(&conn, PASSAGES_TABLE, build_passages_schema(dim), passages_batch).await?;

    let index_vectors: Vec<Vec<f32>> = (0..index.len()).filter_map(|i| index.vector(i).map(<[f32]>::to_vec)).collect();
    let index_batch = if index_vectors.is_empty() {
        None
    } else {
        Some(
            RecordBatch::try_new(
                build_index_schema(dim),
                vec![
                    Arc::new(Int64Array::from((0..index_vectors.len() as i64).collect::<Vec<_>>())),
                    Arc::new(vectors_to_array(&index_vectors, dim)),
                ],
            )
            .map_err(arrow_err)?,
        )
    };
    create_table_with(&conn, INDEX_TABLE, build_index_schema(dim), index_batch).await?;

    let saved_at = Utc::now();
    let meta = SnapshotMeta {
        passage_count: store.len(),
        dim: store.dim(),
        embedder_id: store.embedder_id().to_string(),
        fingerprint: store.fingerprint(),
        saved_at,
    };
    write_meta(
        &conn,
        META_TABLE,
        &[
            ("passage_count", meta.passage_count.to_string()),
            ("dim", meta.dim.to_string()),
            ("embedder_id", meta.embedder_id.clone()),
            ("fingerprint", meta.fingerprint.clone()),
            ("saved_at", saved_at.to_rfc3339()),
        ],
    )
    .await?;
    Ok(meta)
}

/// Read only the `meta` table of a snapshot.
pub async fn read_snapshot_meta(dir: &Path) -> Result<SnapshotMeta> {
    let conn = open_existing(dir).await?;
    let raw = read_meta(&conn, META_TABLE).await?;
    parse_meta(&raw)
}

/// Load passages, vectors and index, verifying they describe the same corpus.
pub async fn load_corpus(dir: &Path) -> Result<Corpus> {
    let conn = open_existing(dir).await?;
    let meta = parse_meta(&read_meta(&conn, META_TABLE).await?)?;
    for table in [PASSAGES_TABLE, INDEX_TABLE] {
        if !table_exists(&conn, table).await? {
            return Err(Error::storage(format!("snapshot at {} has no '{table}' table", dir.display())));
        }
    }

    let mut rows: Vec<(Passage, Vec<f32>)> = Vec::with_capacity(meta.passage_count);
    for batch in scan_table(&conn, PASSAGES_TABLE).await? {
        let positions = int64_column(&batch, "position")?;
        let sources = string_column(&batch, "source")?;
        let texts = string_column(&batch, "text")?;
        for i in 0..batch.num_rows() {
            let position = usize::try_from(positions.value(i))
                .map_err(|_| Error::storage(format!("negative passage position {}", positions.value(i))))?;
            let vector = vector_at(&batch, i)?.ok_or_else(|| Error::storage(format!("passage {position} has no vector")))?;
            rows.push((
                Passage { position, source: sources.value(i).to_string(), text: texts.value(i).to_string() },
                vector,
            ));
        }
    }
    rows.sort_by_key(|(p, _)| p.position);
    if rows.len() != meta.passage_count {
        return Err(Error::storage(format!("meta records {} passages but table holds {}", meta.passage_count, rows.len())));
    }
    let (passages, vectors): (Vec<Passage>, Vec<Vec<f32>>) = rows.into_iter().unzip();
    let store = EmbeddingStore::from_parts(passages, vectors, meta.dim, meta.embedder_id.clone())?;
    if store.fingerprint() != meta.fingerprint {
        return Err(Error::storage("passage vectors do not match the recorded fingerprint"));
    }

    let mut entries: Vec<(i64, Vec<f32>)> = Vec::with_capacity(meta.passage_count);
    for batch in scan_table(&conn, INDEX_TABLE).await? {
        let offsets = int64_column(&batch, "offset")?;
        for i in 0..batch.num_rows() {
            let vector = vector_at(&batch, i)?.ok_or_else(|| Error::storage(format!("index row {} has no vector", offsets.value(i))))?;
            entries.push((offsets.value(i), vector));
        }
    }
    entries.sort_by_key(|(offset, _)| *offset);
    if entries.iter().enumerate().any(|(i, (offset, _))| *offset != i as i64) {
        return Err(Error::storage("index offsets are not contiguous"));
    }
    let index_vectors: Vec<Vec<f32>> = entries.into_iter().map(|(_, v)| v).collect();
    if index_vectors.len() != store.len() || fingerprint(&index_vectors) != meta.fingerprint {
        return Err(Error::storage(format!(
            "index covers {} vectors that differ from the {} stored passages; rebuild the snapshot",
            index_vectors.len(),
            store.len()
        )));
    }
    let index = FlatL2Index::build(&index_vectors, meta.dim).map_err(|e| Error::storage(format!("bad index: {e}")))?;

    debug!(dir = %dir.display(), passages = store.len(), embedder = store.embedder_id(), "corpus snapshot loaded");
    Ok(Corpus { store, index, meta })
}

async fn open_existing(dir: &Path) -> Result<lancedb::Connection> {
    if !dir.is_dir() {
        return Err(Error::storage(format!("no corpus snapshot at {}", dir.display())));
    }
    open_db(&dir.to_string_lossy()).await
}

fn parse_meta(raw: &HashMap<String, String>) -> Result<SnapshotMeta> {
    fn field<'a>(raw: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
        raw.get(key).map(String::as_str).ok_or_else(|| Error::storage(format!("meta key '{key}' missing")))
    }
    fn number(raw: &HashMap<String, String>, key: &str) -> Result<usize> {
        field(raw, key)?.parse().map_err(|e| Error::storage(format!("meta key '{key}': {e}")))
    }
    let saved_at = DateTime::parse_from_rfc3339(field(raw, "saved_at")?)
        .map_err(|e| Error::storage(format!("meta key 'saved_at': {e}")))?
        .with_timezone(&Utc);
    Ok(SnapshotMeta {
        passage_count: number(raw, "passage_count")?,
        dim: number(raw, "dim")?,
        embedder_id: field(raw, "embedder_id")?.to_string(),
        fingerprint: field(raw, "fingerprint")?.to_string(),
        saved_at,
    })
}
