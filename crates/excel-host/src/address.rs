//! A1-style addressing: column letters, cells, and rectangular blocks.
//!
//! Rows and columns are 1-based here, matching the automation object model.

use std::fmt;

use crate::error::{Error, Result};

/// Highest column in a worksheet (XFD).
pub const MAX_COLUMN: u32 = 16_384;

/// Column index to letters: 1 -> "A", 27 -> "AA".
pub fn column_name(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Column letters to index: "A" -> 1, "aa" -> 27. A leading `$` is accepted.
pub fn column_index(name: &str) -> Result<u32> {
    let letters = name.trim().trim_start_matches('$');
    if letters.is_empty() {
        return Err(Error::InvalidAddress(format!("empty column name '{name}'")));
    }

    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!("invalid column name '{name}'")));
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|&i| i <= MAX_COLUMN)
            .ok_or_else(|| Error::InvalidAddress(format!("column '{name}' out of range")))?;
    }
    Ok(index)
}

/// Reject column numbers outside 1..=XFD.
pub fn check_column(column: u32) -> Result<u32> {
    if column == 0 || column > MAX_COLUMN {
        Err(Error::InvalidAddress(format!(
            "column {column} out of range (1..={MAX_COLUMN})"
        )))
    } else {
        Ok(column)
    }
}

/// A single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl CellRef {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Parse `"B12"` or `"$B$12"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let cleaned: String = s.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidAddress(format!("no row number in '{s}'")))?;
        let (letters, digits) = cleaned.split_at(split);
        let column = column_index(letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{s}'")))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!("row 0 in '{s}'")));
        }
        Ok(Self { row, column })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.column), self.row)
    }
}

/// A rectangular block of cells, inclusive on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self {
            start: CellRef::new(start.row.min(end.row), start.column.min(end.column)),
            end: CellRef::new(start.row.max(end.row), start.column.max(end.column)),
        }
    }

    /// `rows` cells of one column starting at `start_row`.
    pub fn column_block(column: u32, start_row: u32, rows: u32) -> Result<Self> {
        let last = start_row
            .checked_add(rows.saturating_sub(1))
            .ok_or_else(|| {
                Error::InvalidAddress(format!(
                    "{rows} rows from {}{start_row} overflow the row index",
                    column_name(column)
                ))
            })?;
        Ok(Self::new(CellRef::new(start_row, column), CellRef::new(last, column)))
    }

    /// A whole worksheet row, written `"3:3"`.
    pub fn whole_row(row: u32) -> Self {
        Self::new(CellRef::new(row, 1), CellRef::new(row, MAX_COLUMN))
    }

    /// Parse `"A1"`, `"A1:C3"` or a row span such as `"3:5"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            None => {
                let cell = CellRef::parse(s)?;
                Ok(Self::new(cell, cell))
            }
            Some((a, b)) if is_row_number(a) && is_row_number(b) => {
                let first = parse_row(a)?;
                let last = parse_row(b)?;
                Ok(Self::new(
                    CellRef::new(first, 1),
                    CellRef::new(last, MAX_COLUMN),
                ))
            }
            Some((a, b)) => Ok(Self::new(CellRef::parse(a)?, CellRef::parse(b)?)),
        }
    }

    pub fn rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn columns(&self) -> u32 {
        self.end.column - self.start.column + 1
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.column..=self.end.column).contains(&cell.column)
    }

    fn spans_whole_rows(&self) -> bool {
        self.start.column == 1 && self.end.column == MAX_COLUMN
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spans_whole_rows() {
            write!(f, "{}:{}", self.start.row, self.end.row)
        } else if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

fn is_row_number(s: &str) -> bool {
    let s = s.trim().trim_start_matches('$');
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn parse_row(s: &str) -> Result<u32> {
    s.trim()
        .trim_start_matches('$')
        .parse()
        .ok()
        .filter(|&r| r > 0)
        .ok_or_else(|| Error::InvalidAddress(format!("invalid row '{s}'")))
}
