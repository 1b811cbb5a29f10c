use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Hard cap the store enforces on one atomic commit.
pub const MAX_BATCH_OPS: usize = 500;

/// One scheduled class session, keyed by the source-assigned id.
///
/// `course` is the source's "Type" field (a batch/section label like
/// "BBA Sem IV") and has nothing to do with commit batching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    /// ISO `YYYY-MM-DD`; the reconciliation scope key.
    pub date: String,
    pub course: String,
    pub room: String,
    pub start_time: String,
    pub end_time: String,
    /// Original free text, preserved next to the parsed fields.
    pub description: String,
    /// Parsed subject; never empty.
    pub subject: String,
    /// Canonical teacher name, or empty when none was detected.
    pub teacher: String,
}

/// The two derived distinct-value indexes kept for dropdown population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaCategory {
    Courses,
    Teachers,
}

impl MetaCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Courses => "courses",
            Self::Teachers => "teachers",
        }
    }
}

/// One store mutation. `MetaAdd` is a set union and may only grow the
/// index; `MetaReplace` overwrites it wholesale and is reserved for the
/// rebuild path, where the Entry set is the source of truth.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Upsert(Entry),
    Delete(String),
    MetaAdd {
        category: MetaCategory,
        values: Vec<String>,
    },
    MetaReplace {
        category: MetaCategory,
        values: Vec<String>,
    },
}

/// The replica behind the sync engine. Kept as a trait so tests can wrap
/// the real store with counting/failing instrumentation.
pub trait ReplicaStore {
    /// Apply `ops` atomically. Implementations must reject batches larger
    /// than `max_batch_ops()`.
    fn commit(&mut self, ops: &[WriteOp]) -> Result<()>;

    fn max_batch_ops(&self) -> usize {
        MAX_BATCH_OPS
    }

    fn entry_ids_for_date(&self, date: &str) -> Result<Vec<String>>;
    fn entries_for_date(&self, date: &str) -> Result<Vec<Entry>>;
    /// Full scan, for index rebuilds.
    fn all_entries(&self) -> Result<Vec<Entry>>;
    /// Sorted distinct values of one meta index.
    fn meta_values(&self, category: MetaCategory) -> Result<Vec<String>>;
}

/// Split a mutation list into commit-sized chunks, preserving order.
pub fn chunk_ops(ops: Vec<WriteOp>, limit: usize) -> Vec<Vec<WriteOp>> {
    assert!(limit > 0, "chunk limit must be positive");
    let mut chunks: Vec<Vec<WriteOp>> = Vec::new();
    let mut current: Vec<WriteOp> = Vec::new();
    for op in ops {
        if current.len() == limit {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(op);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
