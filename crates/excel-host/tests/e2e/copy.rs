use excel_host::copy::{copy_columns, copy_columns_indexed, copy_header, fill_column, get_end_row};
use excel_host::{CellValue, CopySummary, Error, SheetHandle};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::{text, texts, FakeHost};

fn two_sheets() -> (FakeHost, SheetHandle, SheetHandle) {
    let mut host = FakeHost::new();
    let src = host.seed_book("source.xlsx", &["Data"]);
    let dst = host.seed_book("target.xlsx", &["Summary"]);
    (
        host,
        SheetHandle::named(src, "Data"),
        SheetHandle::named(dst, "Summary"),
    )
}

#[test]
fn copies_used_rows_per_column_pair() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A1", &texts(&["id", "1", "2", "3", "4"]));
    host.seed_column(&src, "C1", &texts(&["name", "ann", "bob", "cy", "dee"]));
    let before = host.sheet(&src).unwrap().cells.clone();

    let summary = copy_columns(&mut host, &src, &["A", "C"], 1, &dst, &["B", "D"], 1).unwrap();

    assert_eq!(summary, CopySummary { columns: 2, rows: 5 });
    assert_eq!(host.column(&dst, 2), host.column(&src, 1));
    assert_eq!(host.column(&dst, 4), host.column(&src, 3));
    assert_eq!(host.sheet(&src).unwrap().cells, before);
}

#[test]
fn destination_start_row_shifts_block() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A1", &texts(&["a", "b", "c"]));

    copy_columns(&mut host, &src, &["a"], 1, &dst, &["c"], 10).unwrap();

    assert_eq!(host.cell(&dst, "C10"), text("a"));
    assert_eq!(host.cell(&dst, "C12"), text("c"));
    assert_eq!(host.cell(&dst, "C13"), CellValue::Null);
}

#[test]
fn mismatched_lists_write_nothing() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A1", &texts(&["a", "b"]));

    let err = copy_columns(&mut host, &src, &["A", "B"], 1, &dst, &["C"], 1).unwrap_err();

    assert!(matches!(
        err,
        Error::ColumnCountMismatch {
            source_columns: 2,
            destination_columns: 1
        }
    ));
    assert_eq!(host.writes, 0);
    assert!(host.sheet(&dst).unwrap().cells.is_empty());
}

#[test]
fn mismatched_indexed_lists_write_nothing() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A1", &texts(&["a"]));

    let err = copy_columns_indexed(&mut host, &src, &[1], 1, &dst, &[1, 2], 1).unwrap_err();

    assert!(matches!(err, Error::ColumnCountMismatch { .. }));
    assert_eq!(host.writes, 0);
}

#[test]
fn bad_column_letter_is_rejected() {
    let (mut host, src, dst) = two_sheets();
    let err = copy_columns(&mut host, &src, &["A1"], 1, &dst, &["B"], 1).unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)), "got {err:?}");
    assert_eq!(host.writes, 0);
}

#[test]
fn indexed_copy_appends_below_existing_data() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A1", &[CellValue::Number(1.0), CellValue::Number(2.0), CellValue::Number(3.0)]);
    host.seed_column(&dst, "B1", &texts(&["header", "old"]));

    let summary = copy_columns_indexed(&mut host, &src, &[1, 1], 1, &dst, &[2, 3], 2).unwrap();

    assert_eq!(summary.rows, 3);
    // Column B already holds two rows: the block goes below them.
    assert_eq!(
        host.column(&dst, 2),
        vec![
            (1, text("header")),
            (2, text("old")),
            (3, CellValue::Number(1.0)),
            (4, CellValue::Number(2.0)),
            (5, CellValue::Number(3.0)),
        ]
    );
    // Column C is empty: the block starts at the requested row.
    assert_eq!(
        host.column(&dst, 3),
        vec![
            (2, CellValue::Number(1.0)),
            (3, CellValue::Number(2.0)),
            (4, CellValue::Number(3.0)),
        ]
    );
}

#[test]
fn empty_source_copies_nothing() {
    let (mut host, src, dst) = two_sheets();
    let summary = copy_columns(&mut host, &src, &["A"], 1, &dst, &["A"], 1).unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(host.writes, 0);
}

#[test]
fn end_row_follows_sheet_changes() {
    let (mut host, src, _) = two_sheets();
    host.seed_column(&src, "A1", &texts(&["a", "b"]));
    assert_eq!(get_end_row(&mut host, &src).unwrap(), 2);

    host.seed_column(&src, "A3", &texts(&["c"]));
    assert_eq!(get_end_row(&mut host, &src).unwrap(), 3);
}

#[test]
fn header_row_lands_in_a1() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A3", &texts(&["Region"]));
    host.seed_column(&src, "B3", &texts(&["Total"]));
    host.seed_column(&src, "A4", &texts(&["north"]));

    copy_header(&mut host, &src, &dst, 3).unwrap();

    assert_eq!(host.cell(&dst, "A1"), text("Region"));
    assert_eq!(host.cell(&dst, "B1"), text("Total"));
    assert_eq!(host.cell(&dst, "A2"), CellValue::Null);
}

#[test]
fn fill_column_appends_value() {
    let (mut host, _, dst) = two_sheets();
    host.seed_column(&dst, "A1", &texts(&["x", "y"]));

    fill_column(&mut host, &dst, 1, 3, text("n/a")).unwrap();
    fill_column(&mut host, &dst, 2, 2, text("new")).unwrap();

    assert_eq!(host.column(&dst, 1).len(), 5);
    assert_eq!(host.cell(&dst, "A5"), text("n/a"));
    assert_eq!(host.column(&dst, 2), vec![(1, text("new")), (2, text("new"))]);
}

#[test]
fn later_start_row_keeps_used_range_height() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A1", &texts(&["region", "north", "south", "east"]));
    host.seed_column(&dst, "B5", &texts(&["stale"]));

    let summary = copy_columns(&mut host, &src, &["A"], 2, &dst, &["B"], 2).unwrap();

    assert_eq!(summary.rows, 4);
    assert_eq!(
        host.column(&dst, 2),
        vec![(2, text("north")), (3, text("south")), (4, text("east"))]
    );
    assert_eq!(host.cell(&dst, "B5"), CellValue::Null);
}

#[test]
fn blocks_past_the_last_row_are_rejected() {
    let (mut host, src, dst) = two_sheets();
    host.seed_column(&src, "A1", &texts(&["a", "b"]));
    host.seed_column(&dst, "A1", &texts(&["x"]));

    let err = fill_column(&mut host, &dst, 1, u32::MAX, text("n/a")).unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)), "got {err:?}");

    let err = copy_columns(&mut host, &src, &["A"], u32::MAX - 1, &dst, &["B"], 1).unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)), "got {err:?}");

    let err = copy_columns(&mut host, &src, &["A"], 1, &dst, &["B"], u32::MAX).unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)), "got {err:?}");

    assert_eq!(host.writes, 0);
    assert_eq!(host.column(&dst, 1), vec![(1, text("x"))]);
}

proptest! {
    #[test]
    fn copied_columns_match_source(
        rows in proptest::collection::vec(any::<i32>(), 1..40),
        dest_start in 1u32..20,
    ) {
        let (mut host, src, dst) = two_sheets();
        let values: Vec<CellValue> = rows.iter().map(|&v| CellValue::from(v)).collect();
        host.seed_column(&src, "A1", &values);
        host.seed_column(&src, "B1", &values.iter().rev().cloned().collect::<Vec<_>>());

        let summary = copy_columns(&mut host, &src, &["A", "B"], 1, &dst, &["D", "E"], dest_start)
            .unwrap();

        prop_assert_eq!(summary.rows as usize, rows.len());
        for (src_col, dst_col) in [(1, 4), (2, 5)] {
            let copied: Vec<CellValue> = host.column(&dst, dst_col).into_iter().map(|(_, v)| v).collect();
            let original: Vec<CellValue> = host.column(&src, src_col).into_iter().map(|(_, v)| v).collect();
            prop_assert_eq!(copied, original);
            prop_assert_eq!(host.column(&dst, dst_col)[0].0, dest_start);
        }
    }
}
