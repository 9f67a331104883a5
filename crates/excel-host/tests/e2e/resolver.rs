use std::fs;

use excel_host::resolver::{resolve, Locator};
use excel_host::Error;
use pretty_assertions::assert_eq;

use crate::common::FakeHost;

#[test]
fn resolving_twice_opens_once() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("report.xlsx");
    fs::write(&file, b"").unwrap();
    let mut host = FakeHost::new();

    let first = resolve(&mut host, &Locator::path(&file)).unwrap();
    let second = resolve(&mut host, &Locator::path(&file)).unwrap();

    assert_eq!(first, second);
    assert_eq!(host.opens, 1);
}

#[test]
fn report_is_found_in_directory_then_reused() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("report.xlsx"), b"").unwrap();
    fs::write(dir.path().join("notes.txt"), b"").unwrap();
    let mut host = FakeHost::new();

    let locator = Locator::in_directory(dir.path(), "report.xlsx");
    let opened = resolve(&mut host, &locator).unwrap();
    assert_eq!(host.books[&opened.0].name, "report.xlsx");

    let again = resolve(&mut host, &Locator::in_directory(dir.path(), "rep*.xlsx")).unwrap();
    assert_eq!(again, opened);
    assert_eq!(host.opens, 1);
}

#[test]
fn already_open_document_matches_ignoring_case() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Report.xlsx");
    fs::write(&file, b"").unwrap();
    let mut host = FakeHost::new();
    let open = host.seed_book("REPORT.XLSX", &["Sheet1"]);

    assert_eq!(resolve(&mut host, &Locator::path(&file)).unwrap(), open);
    assert_eq!(host.opens, 0);
}

#[test]
fn missing_file_in_empty_directory_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = FakeHost::new();

    let err = resolve(&mut host, &Locator::in_directory(dir.path(), "ghost.xlsx")).unwrap_err();
    assert!(matches!(err, Error::WorkbookNotFound(_)), "got {err:?}");
    assert_eq!(host.opens, 0);
}

#[test]
fn unsaved_document_resolves_by_name() {
    let mut host = FakeHost::new();
    let book = host.seed_book("Book1", &["Sheet1"]);

    assert_eq!(resolve(&mut host, &Locator::path("Book1")).unwrap(), book);
}

#[test]
fn wildcard_picks_first_match_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["2024-03.xlsx", "2024-01.xlsx", "2024-02.xlsx"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    let mut host = FakeHost::new();

    let book = resolve(&mut host, &Locator::in_directory(dir.path(), "2024-*.xlsx")).unwrap();
    assert_eq!(host.books[&book.0].name, "2024-01.xlsx");
}
