//! Column copies between sheets.
//!
//! Two parallel entry points take columns by letter or by 1-based index.
//! Both size every block from the source sheet's used range, read fresh on
//! each call.

use crate::address::{check_column, column_index, column_name, CellRange, CellRef};
use crate::error::{Error, Result};
use crate::host::{CellValue, SheetHandle, SpreadsheetHost};

/// What a successful copy call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    /// Column pairs copied.
    pub columns: usize,
    /// Rows copied per column.
    pub rows: u32,
}

/// Row count of the sheet's used range. Never cached.
pub fn get_end_row<H: SpreadsheetHost + ?Sized>(host: &mut H, sheet: &SheetHandle) -> Result<u32> {
    host.used_range_row_count(sheet)
}

/// Copy columns named by letter, values and formats.
///
/// Column `source_cols[i]` starting at `source_start_row` goes to
/// `dest_cols[i]` starting at `dest_start_row`. Each block is as tall as the
/// source's used range. Mismatched list lengths copy nothing and return
/// [`Error::ColumnCountMismatch`]; the session can carry on.
pub fn copy_columns<H, S, D>(
    host: &mut H,
    source: &SheetHandle,
    source_cols: &[S],
    source_start_row: u32,
    dest: &SheetHandle,
    dest_cols: &[D],
    dest_start_row: u32,
) -> Result<CopySummary>
where
    H: SpreadsheetHost + ?Sized,
    S: AsRef<str>,
    D: AsRef<str>,
{
    check_lengths(source_cols.len(), dest_cols.len())?;
    let source_cols = source_cols
        .iter()
        .map(|c| column_index(c.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let dest_cols = dest_cols
        .iter()
        .map(|c| column_index(c.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    check_row(source_start_row)?;
    check_row(dest_start_row)?;

    let rows = get_end_row(host, source)?;
    if rows == 0 {
        return Ok(CopySummary { columns: 0, rows });
    }
    let source_max = host.max_rows(source)?;
    let dest_max = host.max_rows(dest)?;

    for (&src_col, &dst_col) in source_cols.iter().zip(&dest_cols) {
        let from = block_within(src_col, source_start_row, rows, source_max)?.to_string();
        block_within(dst_col, dest_start_row, rows, dest_max)?;
        let to = CellRef::new(dest_start_row, dst_col).to_string();
        tracing::debug!("copy {source}!{from} -> {dest}!{to}");
        host.copy_range(source, &from, dest, &to)?;
    }

    Ok(CopySummary {
        columns: source_cols.len(),
        rows,
    })
}

/// Copy columns given by 1-based index, values only, appending below the
/// data already in each destination column.
///
/// The destination anchor is found by walking up from the sheet's last row to
/// the last used cell of the column and stepping one row past it. Empty
/// columns, and columns whose data ends above `dest_start_row`, receive the
/// block at `dest_start_row`.
pub fn copy_columns_indexed<H: SpreadsheetHost + ?Sized>(
    host: &mut H,
    source: &SheetHandle,
    source_cols: &[u32],
    source_start_row: u32,
    dest: &SheetHandle,
    dest_cols: &[u32],
    dest_start_row: u32,
) -> Result<CopySummary> {
    check_lengths(source_cols.len(), dest_cols.len())?;
    for &col in source_cols.iter().chain(dest_cols) {
        check_column(col)?;
    }
    check_row(source_start_row)?;
    check_row(dest_start_row)?;

    let rows = get_end_row(host, source)?;
    if rows == 0 {
        return Ok(CopySummary { columns: 0, rows });
    }
    let source_max = host.max_rows(source)?;
    let max_rows = host.max_rows(dest)?;

    for (&src_col, &dst_col) in source_cols.iter().zip(dest_cols) {
        let anchor = append_row(host, dest, dst_col, max_rows, dest_start_row)?;
        let to = block_within(dst_col, anchor, rows, max_rows)?.to_string();
        let from = block_within(src_col, source_start_row, rows, source_max)?.to_string();
        tracing::debug!("transfer {source}!{from} -> {dest}!{to}");
        host.transfer_values(source, &from, dest, &to)?;
    }

    Ok(CopySummary {
        columns: source_cols.len(),
        rows,
    })
}

/// Copy one whole row of `source` to `A1` of `dest`.
pub fn copy_header<H: SpreadsheetHost + ?Sized>(
    host: &mut H,
    source: &SheetHandle,
    dest: &SheetHandle,
    header_row: u32,
) -> Result<()> {
    check_row(header_row)?;
    let row = CellRange::whole_row(header_row).to_string();
    host.copy_range(source, &row, dest, "A1")
}

/// Append `len` copies of `value` below the last used cell of `column`.
/// An empty column is filled from row 1.
pub fn fill_column<H: SpreadsheetHost + ?Sized>(
    host: &mut H,
    sheet: &SheetHandle,
    column: u32,
    len: u32,
    value: CellValue,
) -> Result<()> {
    check_column(column)?;
    if len == 0 {
        return Ok(());
    }
    let max_rows = host.max_rows(sheet)?;
    let anchor = append_row(host, sheet, column, max_rows, 1)?;
    let block = block_within(column, anchor, len, max_rows)?.to_string();
    host.write_value(sheet, &block, value)
}

/// A column block that must end on or before `max_rows`.
fn block_within(column: u32, start_row: u32, rows: u32, max_rows: u32) -> Result<CellRange> {
    let block = CellRange::column_block(column, start_row, rows)?;
    if block.end.row > max_rows {
        return Err(Error::InvalidAddress(format!(
            "{rows} rows at {}{start_row} run past row {max_rows}",
            column_name(column)
        )));
    }
    Ok(block)
}

/// Row just below the last used cell of `column`, but not above `floor`.
fn append_row<H: SpreadsheetHost + ?Sized>(
    host: &mut H,
    sheet: &SheetHandle,
    column: u32,
    max_rows: u32,
    floor: u32,
) -> Result<u32> {
    let next = match host.last_used_row(sheet, column, max_rows)? {
        Some(last) => last.saturating_add(1),
        None => floor,
    };
    Ok(next.max(floor))
}

fn check_lengths(source: usize, dest: usize) -> Result<()> {
    if source == dest {
        return Ok(());
    }
    tracing::warn!(
        "Column lists differ in length ({source} source, {dest} destination); copy skipped"
    );
    Err(Error::ColumnCountMismatch {
        source_columns: source,
        destination_columns: dest,
    })
}

fn check_row(row: u32) -> Result<()> {
    if row == 0 {
        Err(Error::InvalidAddress("rows start at 1".to_string()))
    } else {
        Ok(())
    }
}
