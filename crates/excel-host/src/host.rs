//! The capability surface the session consumes from a spreadsheet host.
//!
//! A [`SpreadsheetHost`] is one running application process. Everything in
//! this crate drives the host through this trait, so the lifecycle and copy
//! logic never touch COM, the bridge, or any process-wide singleton directly.

use std::fmt;
use std::path::Path;

pub use excel_host_protocol::{AppFlag, CellValue, RangeGeometry, SheetRef};

use crate::error::Result;

/// One open document, as assigned by the host binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkbookId(pub u64);

impl fmt::Display for WorkbookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workbook#{}", self.0)
    }
}

/// A worksheet inside a workbook. Obtained per operation, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetHandle {
    pub workbook: WorkbookId,
    pub sheet: SheetRef,
}

impl SheetHandle {
    /// Sheet by 0-based position.
    pub fn index(workbook: WorkbookId, index: u32) -> Self {
        Self {
            workbook,
            sheet: SheetRef::Index(index),
        }
    }

    /// Sheet by tab name.
    pub fn named(workbook: WorkbookId, name: impl Into<String>) -> Self {
        Self {
            workbook,
            sheet: SheetRef::Name(name.into()),
        }
    }

    /// First sheet of a workbook.
    pub fn first(workbook: WorkbookId) -> Self {
        Self::index(workbook, 0)
    }
}

impl fmt::Display for SheetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.workbook, self.sheet)
    }
}

/// Native top-level window handle of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub i64);

/// Operations a running spreadsheet application offers.
///
/// Addresses are A1-style strings (`"B2"`, `"B2:B11"`, `"3:3"`) or defined
/// names; rows and columns are 1-based.
pub trait SpreadsheetHost {
    fn version(&mut self) -> Result<String>;

    fn flag(&mut self, flag: AppFlag) -> Result<bool>;

    fn set_flag(&mut self, flag: AppFlag, value: bool) -> Result<()>;

    fn set_caption(&mut self, caption: &str) -> Result<()>;

    /// Open a workbook from disk.
    fn open(&mut self, path: &Path) -> Result<WorkbookId>;

    /// Add a new blank workbook.
    fn add_workbook(&mut self) -> Result<WorkbookId>;

    /// Every document currently open in the application.
    fn list_open_documents(&mut self) -> Result<Vec<WorkbookId>>;

    /// The document in the active window, `None` when nothing is open.
    fn active_workbook(&mut self) -> Result<Option<WorkbookId>>;

    /// Display name (file name) of a document.
    fn document_name(&mut self, workbook: WorkbookId) -> Result<String>;

    fn sheet_names(&mut self, workbook: WorkbookId) -> Result<Vec<String>>;

    fn save_as(&mut self, workbook: WorkbookId, path: &Path) -> Result<()>;

    fn close_document(&mut self, workbook: WorkbookId, discard_changes: bool) -> Result<()>;

    /// Row count of the sheet's used range.
    fn used_range_row_count(&mut self, sheet: &SheetHandle) -> Result<u32>;

    /// Number of rows the sheet can hold.
    fn max_rows(&mut self, sheet: &SheetHandle) -> Result<u32>;

    /// Walk up `column` from `from_row` to the last non-empty cell.
    /// `None` when the column holds nothing at or above `from_row`.
    fn last_used_row(&mut self, sheet: &SheetHandle, column: u32, from_row: u32)
        -> Result<Option<u32>>;

    /// Copy values and formats. `dst_address` may be a single anchor cell.
    fn copy_range(
        &mut self,
        src: &SheetHandle,
        src_address: &str,
        dst: &SheetHandle,
        dst_address: &str,
    ) -> Result<()>;

    /// Assign values only. Both ranges have the same shape.
    fn transfer_values(
        &mut self,
        src: &SheetHandle,
        src_address: &str,
        dst: &SheetHandle,
        dst_address: &str,
    ) -> Result<()>;

    /// Set every cell of a range to `value`.
    fn write_value(&mut self, sheet: &SheetHandle, address: &str, value: CellValue) -> Result<()>;

    /// Value of the top-left cell of a range.
    fn read_value(&mut self, sheet: &SheetHandle, address: &str) -> Result<CellValue>;

    fn range_geometry(&mut self, sheet: &SheetHandle, address: &str) -> Result<RangeGeometry>;

    /// Insert a picture that moves and resizes with its cells.
    fn insert_picture(
        &mut self,
        sheet: &SheetHandle,
        path: &Path,
        placement: RangeGeometry,
    ) -> Result<()>;

    /// Replace `find` with `replacement` inside the used range (partial match,
    /// searching by rows).
    fn replace(&mut self, sheet: &SheetHandle, find: &str, replacement: &str) -> Result<()>;

    /// Graceful application quit.
    fn quit(&mut self) -> Result<()>;

    /// Drop every reference the binding still holds to the application.
    fn release_references(&mut self) -> Result<()>;

    fn window_handle(&mut self) -> Result<WindowHandle>;
}

/// Produces hosts: attach to a running instance, or start a new one.
pub trait HostFactory {
    type Host: SpreadsheetHost;

    /// `Ok(None)` when no instance is running.
    fn try_attach(&mut self) -> Result<Option<Self::Host>>;

    /// Start a new, visible instance with the given window caption.
    fn create_new(&mut self, caption: &str) -> Result<Self::Host>;
}
