
use test_support::{d, entry, seed, temp_db, FailingStore, ScriptedSource};
use ttmirror::db::SqliteStore;
use ttmirror::names::Corrections;
use ttmirror::store::ReplicaStore;
use ttmirror::sync::{sync_date, DayOutcome};

#[test]
fn a_failed_chunk_spoils_neither_its_siblings_nor_the_rerun() {
    let mut inner = SqliteStore::open(&temp_db("ttmirror-chunkfail")).unwrap();
    let stale: Vec<_> = (0..900)
        .map(|i| entry(&format!("old{i:04}"), "2026-02-03", "Old Subject", ""))
        .collect();
    seed(&mut inner, stale);

    // 900 stale entries + 1 upsert + 2 meta ops = three chunks; the first
    // commit call the engine makes is rejected.
    let mut store = FailingStore::new(inner, &[0]);

    let mut source = ScriptedSource::default();
    source.set_day(d("2026-02-03"), &["new1"]);
    source.set_entry(
        "new1",
        "BBA Sem IV",
        "BBA Sem IV - Data Structures - Dr.Hema Gaikwad",
    );
    let corrections = Corrections::default_corrections();

    let outcome = sync_date(&source, &mut store, &corrections, d("2026-02-03"));

    // The lost chunk held the upsert, both meta ops and the first 397
    // deletes; the two later chunks landed their 503.
    assert_eq!(
        outcome,
        DayOutcome::Done {
            upserted: 0,
            deleted: 503
        }
    );
    assert_eq!(
        store.entry_ids_for_date("2026-02-03").unwrap().len(),
        397,
        "only the deletes from committed chunks are gone"
    );

    // Next scheduled run, store healthy again: the replica converges.
    let outcome = sync_date(&source, &mut store, &corrections, d("2026-02-03"));
    assert_eq!(
        outcome,
        DayOutcome::Done {
            upserted: 1,
            deleted: 397
        }
    );
    assert_eq!(
        store.entry_ids_for_date("2026-02-03").unwrap(),
        vec!["new1"]
    );
}
