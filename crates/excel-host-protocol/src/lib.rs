//! Shared protocol types for communication between the native client and the
//! Windows automation bridge process (run natively or under WINE).
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.

use serde::{Deserialize, Serialize};

/// A command sent from the client to the bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Initialize COM on the bridge thread. No application is touched yet.
    Init,

    /// Attach to an already-running `Excel.Application`.
    /// Answers `Flag { value: false }` when none is running.
    AttachApplication,

    /// Create a new `Excel.Application` process.
    CreateApplication { caption: String, visible: bool },

    /// Application version string.
    GetVersion,

    GetAppFlag { flag: AppFlag },

    SetAppFlag { flag: AppFlag, value: bool },

    SetCaption { caption: String },

    /// Add a new blank workbook. Returns a workbook handle.
    CreateWorkbook,

    /// Open an existing workbook from a file path (Windows path).
    OpenWorkbook { path: String },

    /// Enumerate every workbook open in the application, including ones
    /// this bridge did not open itself.
    ListWorkbooks,

    /// The workbook in the active window. Answers
    /// `ActiveWorkbook { workbook: None }` when no workbook is open.
    GetActiveWorkbook,

    /// Display name of a workbook (its file name).
    GetWorkbookName { workbook: u64 },

    GetSheetNames { workbook: u64 },

    /// Save the workbook to a file path (Windows path).
    /// Format is inferred from extension (.xlsx, .xls, .csv).
    SaveWorkbook { workbook: u64, path: String },

    CloseWorkbook { workbook: u64, save_changes: bool },

    /// Row count of the sheet's used range.
    GetUsedRowCount { sheet: SheetLocation },

    /// Number of rows a sheet can hold.
    GetMaxRows { sheet: SheetLocation },

    /// Walk up from `from_row` in `column` (1-based) to the last used cell.
    /// Answers `Row { row: None }` when the column is empty.
    FindLastUsedRow {
        sheet: SheetLocation,
        column: u32,
        from_row: u32,
    },

    /// `source.Copy(destination)`: values and formats.
    CopyRange {
        source: RangeLocation,
        destination: RangeLocation,
    },

    /// `destination.Value = source.Value`: values only.
    TransferValues {
        source: RangeLocation,
        destination: RangeLocation,
    },

    /// Set the value of every cell in a range.
    SetCellValue { range: RangeLocation, value: CellValue },

    /// Get the value of the top-left cell of a range.
    GetCellValue { range: RangeLocation },

    /// Left/top/width/height of a range, in points.
    GetRangeGeometry { range: RangeLocation },

    /// Insert a picture that moves and sizes with its cells.
    InsertPicture {
        sheet: SheetLocation,
        path: String,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },

    /// Replace text inside the sheet's used range (partial match, by rows).
    Replace {
        sheet: SheetLocation,
        find: String,
        replacement: String,
    },

    /// `Application.Quit()`. The bridge keeps running.
    Quit,

    /// Drop every COM reference the bridge still holds.
    ReleaseReferences,

    /// The application's main window handle (`Application.Hwnd`).
    GetWindowHandle,

    /// Resolve the process that owns a window. `ProcessId { pid: None }` when
    /// the window no longer exists.
    GetProcessId { hwnd: i64 },

    TerminateProcess { pid: u32 },

    /// Shut down the bridge: release references, uninitialize COM, exit.
    Shutdown,
}

/// Application-level toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppFlag {
    Visible,
    DisplayAlerts,
    ScreenUpdating,
}

impl AppFlag {
    /// The automation property name behind this flag.
    pub fn property_name(self) -> &'static str {
        match self {
            AppFlag::Visible => "Visible",
            AppFlag::DisplayAlerts => "DisplayAlerts",
            AppFlag::ScreenUpdating => "ScreenUpdating",
        }
    }
}

/// Reference to a worksheet, by 0-based index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(u32),
    Name(String),
}

impl std::fmt::Display for SheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetRef::Index(i) => write!(f, "#{i}"),
            SheetRef::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A worksheet inside a specific workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLocation {
    pub workbook: u64,
    pub sheet: SheetRef,
}

/// An A1-style address or a defined name on a specific worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeLocation {
    pub workbook: u64,
    pub sheet: SheetRef,
    pub address: String,
}

/// Position and size of a range, in points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A cell value that can be sent to/from Excel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Error(CellError),
}

/// Excel error values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellError {
    pub code: String,
}

/// A response sent from the bridge back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Data returned in successful responses.
///
/// Tagged with `type` because several variants carry optional fields that
/// would otherwise be indistinguishable on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseData {
    /// Handle to a newly created/opened workbook.
    WorkbookHandle { workbook: u64 },
    /// Handles of every open workbook, in the application's order.
    Workbooks { workbooks: Vec<u64> },
    ActiveWorkbook { workbook: Option<u64> },
    Text { text: String },
    Names { names: Vec<String> },
    Flag { value: bool },
    Count { count: u32 },
    Row { row: Option<u32> },
    /// A cell value.
    Value { value: CellValue },
    Geometry { geometry: RangeGeometry },
    WindowHandle { hwnd: i64 },
    ProcessId { pid: Option<u32> },
}

impl ResponseResult {
    pub fn ok() -> Self {
        ResponseResult::Ok { data: None }
    }

    pub fn with(data: ResponseData) -> Self {
        ResponseResult::Ok { data: Some(data) }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, "<empty>"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Error(e) => write!(f, "{}", e.code),
        }
    }
}
