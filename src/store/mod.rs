
mod sqlite;

pub use sqlite::SqliteChapterStore;

use crate::error::Result;
use crate::model::ChapterRecord;

/// Durable chapter table with wholesale replacement
///
/// There is no per-record update: every detection run replaces the whole
/// table, and readers always get the full list back in insertion order.
pub trait ChapterStore {
    /// Atomically drop every stored record and insert `records`
    ///
    /// Returns how many records were kept.
    fn replace_all(&mut self, records: &[ChapterRecord]) -> Result<usize>;

    /// All stored records, in insertion order
    fn load_all(&self) -> Result<Vec<ChapterRecord>>;
}
