//! thesis-vector
//!
//! Embedding store, exact flat L2 index, and the LanceDB-backed corpus
//! snapshot that persists both as a single unit.

pub mod flat;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod table;

pub use flat::{fingerprint, FlatL2Index};
pub use snapshot::{load_corpus, read_snapshot_meta, save_corpus, Corpus, SnapshotMeta};
pub use store::{embed, EmbeddingStore};
