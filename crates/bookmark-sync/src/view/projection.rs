//! View projection — the filtered, sorted sequence a list/grid renders.
//!
//! Pure: reads records, never touches the store. Sorting is a display
//! policy (`created_at` descending) and is recomputed for every projection.

use crate::types::BookmarkRecord;

/// Records ordered for display, filtered lazily by a search needle.
///
/// `iter()` can be called any number of times; each call restarts the
/// filtered walk over the same sorted records.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    sorted: Vec<&'a BookmarkRecord>,
    needle: String,
}

/// Project `records` for display under `search`.
///
/// Matching is a case-insensitive substring test against the title or the
/// url. An empty search matches everything. Records with equal `created_at`
/// keep their relative input order.
pub fn project<'a>(records: &'a [BookmarkRecord], search: &str) -> Projection<'a> {
    let mut sorted: Vec<&'a BookmarkRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Projection {
        sorted,
        needle: search.to_lowercase(),
    }
}

/// Whether `record` matches an already-lowercased needle.
pub fn matches(record: &BookmarkRecord, needle: &str) -> bool {
    needle.is_empty()
        || record.title.to_lowercase().contains(needle)
        || record.url.to_lowercase().contains(needle)
}

impl<'a> Projection<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a BookmarkRecord> + '_ {
        self.sorted
            .iter()
            .copied()
            .filter(move |record| matches(record, &self.needle))
    }

    pub fn to_vec(&self) -> Vec<BookmarkRecord> {
        self.iter().cloned().collect()
    }

    /// Number of matching records.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Total records considered, matching or not.
    pub fn total(&self) -> usize {
        self.sorted.len()
    }
}
