use std::collections::BTreeSet;

use anyhow::Result;
use log::info;

use crate::names::Corrections;
use crate::store::{MetaCategory, ReplicaStore, WriteOp};

/// Recompute the `teachers` meta index from scratch: scan every stored
/// entry, push its teacher through the current correction table, and
/// overwrite the index with the sorted distinct result.
///
/// Maintenance path, not part of the sync loop. Overwriting is fine here —
/// the entries are the source of truth and the index is derived — which is
/// exactly why the sync path is never allowed to do this.
pub fn rebuild_teacher_index(
    store: &mut dyn ReplicaStore,
    corrections: &Corrections,
) -> Result<usize> {
    let entries = store.all_entries()?;

    let mut teachers = BTreeSet::new();
    for entry in &entries {
        let stored = entry.teacher.trim();
        // Older data wrote "N/A" where nothing was detected.
        if stored.is_empty() || stored == "N/A" {
            continue;
        }
        teachers.insert(corrections.canonicalize(stored));
    }

    let values: Vec<String> = teachers.into_iter().collect();
    let count = values.len();
    store.commit(&[WriteOp::MetaReplace {
        category: MetaCategory::Teachers,
        values,
    }])?;

    info!(
        "teachers index rebuilt: {} distinct names from {} entries",
        count,
        entries.len()
    );
    Ok(count)
}
