//! Tests for src/view/projection.rs

use bookmark_sync::{
    types::BookmarkRecord,
    view::{matches, project},
};
use chrono::{TimeZone, Utc};

fn record(id: &str, title: &str, url: &str, secs: i64) -> BookmarkRecord {
    BookmarkRecord {
        id: id.to_string(),
        owner_id: "user-1".to_string(),
        title: title.to_string(),
        url: url.to_string(),
        created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

fn titles<'a>(iter: impl Iterator<Item = &'a BookmarkRecord>) -> Vec<&'a str> {
    iter.map(|r| r.title.as_str()).collect()
}

fn library() -> Vec<BookmarkRecord> {
    vec![
        record("1", "Go Docs", "https://go.dev/doc", 10),
        record("2", "Rust Book", "https://doc.rust-lang.org/book", 20),
        record("3", "Tokio", "https://tokio.rs", 5),
    ]
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn search_matches_title_case_insensitively() {
    let records = vec![
        record("1", "Go Docs", "https://go.dev/doc", 0),
        record("2", "Rust Book", "https://doc.rust-lang.org/book", 1),
    ];

    let view = project(&records, "go");

    assert_eq!(titles(view.iter()), vec!["Go Docs"]);
}

#[test]
fn search_matches_url() {
    let records = library();

    let view = project(&records, "TOKIO.RS");

    assert_eq!(titles(view.iter()), vec!["Tokio"]);
}

#[test]
fn empty_search_matches_everything() {
    let records = library();

    let view = project(&records, "");

    assert_eq!(view.len(), 3);
    assert_eq!(view.total(), 3);
}

#[test]
fn no_match_is_empty_but_keeps_total() {
    let records = library();

    let view = project(&records, "python");

    assert!(view.is_empty());
    assert_eq!(view.len(), 0);
    assert_eq!(view.total(), 3);
}

#[test]
fn matches_expects_lowercased_needle() {
    let r = record("1", "Go Docs", "https://go.dev/doc", 0);
    assert!(matches(&r, "docs"));
    assert!(matches(&r, "go.dev"));
    assert!(matches(&r, ""));
    assert!(!matches(&r, "rust"));
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn newest_first() {
    let records = library();

    let view = project(&records, "");

    assert_eq!(titles(view.iter()), vec!["Rust Book", "Go Docs", "Tokio"]);
}

#[test]
fn equal_timestamps_keep_input_order() {
    let records = vec![
        record("a", "First", "https://a.example.com", 0),
        record("b", "Second", "https://b.example.com", 0),
        record("c", "Newer", "https://c.example.com", 1),
    ];

    let view = project(&records, "");

    assert_eq!(titles(view.iter()), vec!["Newer", "First", "Second"]);
}

#[test]
fn iter_restarts_on_each_call() {
    let records = library();
    let view = project(&records, "o");

    let first = titles(view.iter());
    let second = titles(view.iter());

    assert_eq!(first, second);
    assert_eq!(view.to_vec().len(), first.len());
}

#[test]
fn projection_does_not_reorder_source() {
    let records = library();

    let _ = project(&records, "").to_vec();

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}
