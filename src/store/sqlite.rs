use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{info, warn};

use super::ChapterStore;
use crate::error::Result;
use crate::model::ChapterRecord;

/// SQLite-backed chapter table
///
/// Records missing either page bound are dropped on insert, so everything
/// `load_all` returns has both pages set.
pub struct SqliteChapterStore {
    conn: Connection,
}

impl SqliteChapterStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened chapter store: {:?}", path.as_ref());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chapters (
                position INTEGER PRIMARY KEY,
                chapter_number TEXT NOT NULL,
                title TEXT NOT NULL,
                start_page INTEGER,
                end_page INTEGER
            )",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl ChapterStore for SqliteChapterStore {
    fn replace_all(&mut self, records: &[ChapterRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM chapters", [])?;

        let mut kept = 0;
        {
            let mut insert = tx.prepare(
                "INSERT INTO chapters (position, chapter_number, title, start_page, end_page)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                let Some((start, end)) = record.page_range() else {
                    warn!("Dropping chapter without page range: {}", record);
                    continue;
                };
                insert.execute(params![kept as i64, record.chapter_number, record.title, start, end])?;
                kept += 1;
            }
        }

        tx.commit()?;
        info!("Stored {} of {} chapters", kept, records.len());
        Ok(kept)
    }

    fn load_all(&self) -> Result<Vec<ChapterRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT chapter_number, title, start_page, end_page FROM chapters ORDER BY position",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(ChapterRecord {
                    chapter_number: row.get(0)?,
                    title: row.get(1)?,
                    start_page: row.get(2)?,
                    end_page: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(number: &str, title: &str, start: i64, end: i64) -> ChapterRecord {
        ChapterRecord::new(number, title, Some(start), Some(end))
    }

    #[test]
    fn test_replace_discards_previous_set() {
        let mut store = SqliteChapterStore::open_in_memory().unwrap();
        let a = record("1", "Introduction", 1, 10);
        let b = record("2", "Basics", 11, 20);
        let c = record("I", "Foreword", 3, 4);

        store.replace_all(&[a, b]).unwrap();
        store.replace_all(&[c.clone()]).unwrap();

        assert_eq!(store.load_all().unwrap(), vec![c]);
    }

    #[test]
    fn test_load_preserves_insertion_order() {
        let mut store = SqliteChapterStore::open_in_memory().unwrap();
        let records = vec![
            record("3", "Motion", 41, 58),
            record("1", "Introduction", 1, 10),
            record("Appendix A", "Tables", 200, 210),
        ];
        assert_eq!(store.replace_all(&records).unwrap(), 3);
        assert_eq!(store.load_all().unwrap(), records);
    }

    #[test]
    fn test_incomplete_records_are_dropped() {
        let mut store = SqliteChapterStore::open_in_memory().unwrap();
        let records = vec![
            ChapterRecord::new("I", "Foreword", None, Some(4)),
            record("1", "Introduction", 1, 10),
            ChapterRecord::new("2", "Basics", Some(11), None),
        ];
        assert_eq!(store.replace_all(&records).unwrap(), 1);
        assert_eq!(store.load_all().unwrap(), vec![record("1", "Introduction", 1, 10)]);
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteChapterStore::open_in_memory().unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chapters.db");

        {
            let mut store = SqliteChapterStore::open(&path).unwrap();
            store.replace_all(&[record("1", "Introduction", 1, 10)]).unwrap();
        }

        let store = SqliteChapterStore::open(&path).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![record("1", "Introduction", 1, 10)]);
    }
}
