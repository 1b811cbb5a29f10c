use std::path::Path;

use anyhow::Result;
use rusqlite::{params, Connection, Row};

use crate::store::{Entry, MetaCategory, ReplicaStore, WriteOp, MAX_BATCH_OPS};

/// SQLite-backed replica store. One SQL transaction per `commit`, so a
/// chunk either lands whole or not at all.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Private throwaway store, used by unit tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries(
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                course TEXT NOT NULL,
                room TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                description TEXT NOT NULL,
                subject TEXT NOT NULL,
                teacher TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS meta_values(
                category TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY(category, value)
            )",
            [],
        )?;
        Ok(Self { conn })
    }
}

fn row_to_entry(row: &Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get("id")?,
        date: row.get("date")?,
        course: row.get("course")?,
        room: row.get("room")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        description: row.get("description")?,
        subject: row.get("subject")?,
        teacher: row.get("teacher")?,
    })
}

impl ReplicaStore for SqliteStore {
    fn commit(&mut self, ops: &[WriteOp]) -> Result<()> {
        if ops.len() > MAX_BATCH_OPS {
            anyhow::bail!(
                "commit of {} ops exceeds the {}-op batch limit",
                ops.len(),
                MAX_BATCH_OPS
            );
        }

        let tx = self.conn.transaction()?;
        for op in ops {
            match op {
                WriteOp::Upsert(e) => {
                    tx.execute(
                        "INSERT INTO entries
                           (id, date, course, room, start_time, end_time, description, subject, teacher)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                         ON CONFLICT(id) DO UPDATE SET
                           date = excluded.date,
                           course = excluded.course,
                           room = excluded.room,
                           start_time = excluded.start_time,
                           end_time = excluded.end_time,
                           description = excluded.description,
                           subject = excluded.subject,
                           teacher = excluded.teacher",
                        params![
                            e.id,
                            e.date,
                            e.course,
                            e.room,
                            e.start_time,
                            e.end_time,
                            e.description,
                            e.subject,
                            e.teacher
                        ],
                    )?;
                }
                WriteOp::Delete(id) => {
                    tx.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
                }
                WriteOp::MetaAdd { category, values } => {
                    for v in values {
                        tx.execute(
                            "INSERT OR IGNORE INTO meta_values(category, value) VALUES (?1, ?2)",
                            params![category.as_str(), v],
                        )?;
                    }
                }
                WriteOp::MetaReplace { category, values } => {
                    tx.execute(
                        "DELETE FROM meta_values WHERE category = ?1",
                        params![category.as_str()],
                    )?;
                    for v in values {
                        tx.execute(
                            "INSERT OR IGNORE INTO meta_values(category, value) VALUES (?1, ?2)",
                            params![category.as_str(), v],
                        )?;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn entry_ids_for_date(&self, date: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM entries WHERE date = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![date], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn entries_for_date(&self, date: &str) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, course, room, start_time, end_time, description, subject, teacher
             FROM entries WHERE date = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![date], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn all_entries(&self) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, course, room, start_time, end_time, description, subject, teacher
             FROM entries ORDER BY date, id",
        )?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn meta_values(&self, category: MetaCategory) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM meta_values WHERE category = ?1 ORDER BY value")?;
        let values = stmt
            .query_map(params![category.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, date: &str, subject: &str, teacher: &str) -> Entry {
        Entry {
            id: id.to_string(),
            date: date.to_string(),
            course: "BBA Sem IV".to_string(),
            room: "Lab 1".to_string(),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            description: format!("{subject} - {teacher}"),
            subject: subject.to_string(),
            teacher: teacher.to_string(),
        }
    }

    #[test]
    fn upsert_creates_then_merges() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .commit(&[WriteOp::Upsert(entry("1", "2026-02-02", "Maths", "Dr. A"))])
            .unwrap();

        let mut updated = entry("1", "2026-02-02", "Statistics", "Dr. B");
        updated.room = "Lab 2".to_string();
        store.commit(&[WriteOp::Upsert(updated.clone())]).unwrap();

        let stored = store.entries_for_date("2026-02-02").unwrap();
        assert_eq!(stored, vec![updated]);
    }

    #[test]
    fn upsert_moves_entry_between_dates() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .commit(&[WriteOp::Upsert(entry("1", "2026-02-02", "Maths", "Dr. A"))])
            .unwrap();
        store
            .commit(&[WriteOp::Upsert(entry("1", "2026-02-03", "Maths", "Dr. A"))])
            .unwrap();

        assert!(store.entry_ids_for_date("2026-02-02").unwrap().is_empty());
        assert_eq!(store.entry_ids_for_date("2026-02-03").unwrap(), vec!["1"]);
        assert_eq!(store.all_entries().unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_only_the_target() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .commit(&[
                WriteOp::Upsert(entry("1", "2026-02-02", "Maths", "Dr. A")),
                WriteOp::Upsert(entry("2", "2026-02-02", "Physics", "Dr. B")),
            ])
            .unwrap();
        store.commit(&[WriteOp::Delete("1".to_string())]).unwrap();

        assert_eq!(store.entry_ids_for_date("2026-02-02").unwrap(), vec!["2"]);
    }

    #[test]
    fn meta_add_is_a_union() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .commit(&[WriteOp::MetaAdd {
                category: MetaCategory::Teachers,
                values: vec!["Dr. B".to_string(), "Dr. A".to_string()],
            }])
            .unwrap();
        store
            .commit(&[WriteOp::MetaAdd {
                category: MetaCategory::Teachers,
                values: vec!["Dr. A".to_string(), "Dr. C".to_string()],
            }])
            .unwrap();

        assert_eq!(
            store.meta_values(MetaCategory::Teachers).unwrap(),
            vec!["Dr. A", "Dr. B", "Dr. C"]
        );
    }

    #[test]
    fn meta_replace_overwrites_wholesale() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .commit(&[WriteOp::MetaAdd {
                category: MetaCategory::Teachers,
                values: vec!["Dr. Old".to_string(), "Dr. Stale".to_string()],
            }])
            .unwrap();
        store
            .commit(&[WriteOp::MetaReplace {
                category: MetaCategory::Teachers,
                values: vec!["Dr. New".to_string()],
            }])
            .unwrap();

        assert_eq!(
            store.meta_values(MetaCategory::Teachers).unwrap(),
            vec!["Dr. New"]
        );
    }

    #[test]
    fn meta_categories_are_disjoint() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .commit(&[
                WriteOp::MetaAdd {
                    category: MetaCategory::Courses,
                    values: vec!["BBA Sem IV".to_string()],
                },
                WriteOp::MetaAdd {
                    category: MetaCategory::Teachers,
                    values: vec!["Dr. A".to_string()],
                },
            ])
            .unwrap();

        assert_eq!(
            store.meta_values(MetaCategory::Courses).unwrap(),
            vec!["BBA Sem IV"]
        );
        assert_eq!(
            store.meta_values(MetaCategory::Teachers).unwrap(),
            vec!["Dr. A"]
        );
    }

    #[test]
    fn oversized_commit_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let too_many: Vec<WriteOp> = (0..MAX_BATCH_OPS + 1)
            .map(|i| WriteOp::Delete(i.to_string()))
            .collect();
        assert!(store.commit(&too_many).is_err());

        let at_limit: Vec<WriteOp> = (0..MAX_BATCH_OPS)
            .map(|i| WriteOp::Delete(i.to_string()))
            .collect();
        assert!(store.commit(&at_limit).is_ok());
    }
}
