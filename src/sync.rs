use std::collections::BTreeSet;

use chrono::NaiveDate;
use log::{error, info, warn};

use crate::names::Corrections;
use crate::parse::parse_description;
use crate::source::{DetailPage, Source};
use crate::store::{chunk_ops, Entry, MetaCategory, ReplicaStore, WriteOp};

/// Ops staged per commit. Kept under the store's hard cap so a chunk is
/// always committable even after the meta ops ride along.
pub const COMMIT_CHUNK_OPS: usize = 400;

/// What happened to one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    /// Snapshot applied; the replica now matches the source for this date.
    Done { upserted: usize, deleted: usize },
    /// The source published no ids. An empty listing is indistinguishable
    /// from a source hiccup, so nothing is touched and nothing is deleted.
    SkippedEmpty,
    /// The day listing could not be fetched; zero mutations for this date.
    Aborted { error: String },
}

#[derive(Debug, Clone)]
pub struct DayReport {
    pub date: NaiveDate,
    pub outcome: DayOutcome,
}

/// Reconcile one date: fetch the full snapshot, upsert every published
/// entry, then delete whatever is stored for the date but no longer
/// published. Deletions are computed only after the whole snapshot has been
/// retrieved, so a partial or failed read can never wipe valid data.
pub fn sync_date(
    source: &dyn Source,
    store: &mut dyn ReplicaStore,
    corrections: &Corrections,
    date: NaiveDate,
) -> DayOutcome {
    let date_str = date.format("%Y-%m-%d").to_string();

    let mut ids = match source.day_entry_ids(date) {
        Ok(ids) => ids,
        Err(e) => {
            error!("{date_str}: day listing fetch failed: {e:#}");
            return DayOutcome::Aborted {
                error: format!("{e:#}"),
            };
        }
    };
    ids.sort();
    ids.dedup();

    if ids.is_empty() {
        warn!("{date_str}: source published no entries; leaving stored data untouched");
        return DayOutcome::SkippedEmpty;
    }
    info!("{date_str}: snapshot holds {} entries", ids.len());

    let snapshot: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    let mut upserts = Vec::new();
    let mut courses = BTreeSet::new();
    let mut teachers = BTreeSet::new();
    for id in &ids {
        let detail = match source.entry_detail(id) {
            Ok(d) => d,
            Err(e) => {
                // The id stays in the snapshot, so whatever the store holds
                // for it survives until a later run sees the details.
                warn!("{date_str}: entry {id}: detail fetch failed: {e:#}");
                continue;
            }
        };
        let entry = build_entry(id, &date_str, &detail, corrections);
        if !entry.course.is_empty() {
            courses.insert(entry.course.clone());
        }
        if !entry.teacher.is_empty() {
            teachers.insert(entry.teacher.clone());
        }
        upserts.push(WriteOp::Upsert(entry));
    }

    // Stale ids are diffed strictly after the fetch phase. A failed read of
    // the stored set aborts the date before any mutation is staged.
    let stored_ids = match store.entry_ids_for_date(&date_str) {
        Ok(v) => v,
        Err(e) => {
            error!("{date_str}: reading stored ids failed: {e:#}");
            return DayOutcome::Aborted {
                error: format!("{e:#}"),
            };
        }
    };
    let stale: Vec<String> = stored_ids
        .into_iter()
        .filter(|id| !snapshot.contains(id.as_str()))
        .collect();
    if !stale.is_empty() {
        info!("{date_str}: {} stored entries are no longer published", stale.len());
    }

    let mut ops = upserts;
    if !courses.is_empty() {
        ops.push(WriteOp::MetaAdd {
            category: MetaCategory::Courses,
            values: courses.into_iter().collect(),
        });
    }
    if !teachers.is_empty() {
        ops.push(WriteOp::MetaAdd {
            category: MetaCategory::Teachers,
            values: teachers.into_iter().collect(),
        });
    }
    ops.extend(stale.into_iter().map(WriteOp::Delete));

    let mut upserted = 0;
    let mut deleted = 0;
    for chunk in chunk_ops(ops, COMMIT_CHUNK_OPS.min(store.max_batch_ops())) {
        let u = chunk
            .iter()
            .filter(|op| matches!(op, WriteOp::Upsert(_)))
            .count();
        let d = chunk
            .iter()
            .filter(|op| matches!(op, WriteOp::Delete(_)))
            .count();
        match store.commit(&chunk) {
            Ok(()) => {
                upserted += u;
                deleted += d;
            }
            Err(e) => {
                // Chunks already committed stand; the next scheduled run
                // converges on whatever this one missed.
                error!("{date_str}: commit of {} ops failed: {e:#}", chunk.len());
            }
        }
    }

    info!("{date_str}: {upserted} upserted, {deleted} deleted");
    DayOutcome::Done { upserted, deleted }
}

/// Reconcile a run of dates sequentially. A date that aborts or skips never
/// blocks the dates after it.
pub fn sync_dates(
    source: &dyn Source,
    store: &mut dyn ReplicaStore,
    corrections: &Corrections,
    dates: &[NaiveDate],
) -> Vec<DayReport> {
    let reports: Vec<DayReport> = dates
        .iter()
        .map(|&date| DayReport {
            date,
            outcome: sync_date(source, store, corrections, date),
        })
        .collect();

    let aborted = reports
        .iter()
        .filter(|r| matches!(r.outcome, DayOutcome::Aborted { .. }))
        .count();
    let skipped = reports
        .iter()
        .filter(|r| matches!(r.outcome, DayOutcome::SkippedEmpty))
        .count();
    info!(
        "run complete: {} dates, {} aborted, {} skipped",
        reports.len(),
        aborted,
        skipped
    );
    reports
}

fn build_entry(
    id: &str,
    date_str: &str,
    detail: &DetailPage,
    corrections: &Corrections,
) -> Entry {
    let description = detail.value_of("Description").to_string();
    let course = detail.value_of("Type").to_string();
    let parsed = parse_description(&description, &course, corrections);
    Entry {
        id: id.to_string(),
        date: date_str.to_string(),
        course,
        room: detail.value_of("Room").to_string(),
        start_time: clip_time(detail.value_of("Start time")),
        end_time: clip_time(detail.value_of("End time")),
        description,
        subject: parsed.subject,
        teacher: parsed.teacher,
    }
}

/// Source times come as `HH:MM:SS`; the replica keeps `HH:MM`.
fn clip_time(value: &str) -> String {
    value.chars().take(5).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn times_are_clipped_to_hh_mm() {
        assert_eq!(clip_time("13:30:00"), "13:30");
        assert_eq!(clip_time("9:30"), "9:30");
        assert_eq!(clip_time(""), "");
    }

    #[test]
    fn entry_is_assembled_from_detail_fields() {
        let mut fields = HashMap::new();
        fields.insert(
            "Description".to_string(),
            "BBA Sem IV - Div A - Data Structures - Dr.Hema Gaikwad".to_string(),
        );
        fields.insert("Room".to_string(), "Lab 1".to_string());
        fields.insert("Type".to_string(), "BBA Sem IV".to_string());
        fields.insert("Start time".to_string(), "09:00:00".to_string());
        fields.insert("End time".to_string(), "10:00:00".to_string());
        let detail = DetailPage::new(fields);

        let entry = build_entry(
            "18233",
            "2026-02-03",
            &detail,
            &Corrections::default_corrections(),
        );
        assert_eq!(entry.id, "18233");
        assert_eq!(entry.date, "2026-02-03");
        assert_eq!(entry.course, "BBA Sem IV");
        assert_eq!(entry.room, "Lab 1");
        assert_eq!(entry.start_time, "09:00");
        assert_eq!(entry.end_time, "10:00");
        assert_eq!(entry.subject, "Data Structures");
        assert_eq!(entry.teacher, "Dr. Hema Gaikwad");
        assert_eq!(
            entry.description,
            "BBA Sem IV - Div A - Data Structures - Dr.Hema Gaikwad"
        );
    }

    #[test]
    fn missing_fields_resolve_to_empty_and_sentinel() {
        let detail = DetailPage::default();
        let entry = build_entry("7", "2026-02-03", &detail, &Corrections::default_corrections());
        assert_eq!(entry.course, "");
        assert_eq!(entry.room, "");
        assert_eq!(entry.subject, crate::parse::SUBJECT_NOT_LISTED);
        assert_eq!(entry.teacher, "");
    }
}
