//! [`SpreadsheetHost`] and [`ProcessControl`] over the bridge process.

use std::path::Path;
use std::sync::Arc;

use excel_host_protocol::{Command as BridgeCommand, RangeLocation, ResponseData, SheetLocation};

use super::{host_path, BridgeConfig, BridgeError, ExcelBridge};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::host::{
    AppFlag, CellValue, HostFactory, RangeGeometry, SheetHandle, SpreadsheetHost, WindowHandle,
    WorkbookId,
};
use crate::process::ProcessControl;
use crate::session::Session;

fn sheet_location(sheet: &SheetHandle) -> SheetLocation {
    SheetLocation {
        workbook: sheet.workbook.0,
        sheet: sheet.sheet.clone(),
    }
}

fn range_location(sheet: &SheetHandle, address: &str) -> RangeLocation {
    RangeLocation {
        workbook: sheet.workbook.0,
        sheet: sheet.sheet.clone(),
        address: address.to_string(),
    }
}

/// The application driven by one bridge process.
pub struct BridgeHost {
    bridge: Arc<ExcelBridge>,
}

impl BridgeHost {
    fn send(&self, command: BridgeCommand) -> Result<Option<ResponseData>> {
        self.bridge.send_command(command).map_err(Error::from)
    }

    fn send_unit(&self, command: BridgeCommand) -> Result<()> {
        self.send(command).map(|_| ())
    }

    fn workbook(&self, command: BridgeCommand, what: &'static str) -> Result<WorkbookId> {
        match self.send(command)? {
            Some(ResponseData::WorkbookHandle { workbook }) => Ok(WorkbookId(workbook)),
            _ => Err(BridgeError::UnexpectedResponse(what).into()),
        }
    }

    fn count(&self, command: BridgeCommand, what: &'static str) -> Result<u32> {
        match self.send(command)? {
            Some(ResponseData::Count { count }) => Ok(count),
            _ => Err(BridgeError::UnexpectedResponse(what).into()),
        }
    }

    fn text(&self, command: BridgeCommand, what: &'static str) -> Result<String> {
        match self.send(command)? {
            Some(ResponseData::Text { text }) => Ok(text),
            _ => Err(BridgeError::UnexpectedResponse(what).into()),
        }
    }
}

impl SpreadsheetHost for BridgeHost {
    fn version(&mut self) -> Result<String> {
        self.text(BridgeCommand::GetVersion, "GetVersion")
    }

    fn flag(&mut self, flag: AppFlag) -> Result<bool> {
        match self.send(BridgeCommand::GetAppFlag { flag })? {
            Some(ResponseData::Flag { value }) => Ok(value),
            _ => Err(BridgeError::UnexpectedResponse("GetAppFlag").into()),
        }
    }

    fn set_flag(&mut self, flag: AppFlag, value: bool) -> Result<()> {
        self.send_unit(BridgeCommand::SetAppFlag { flag, value })
    }

    fn set_caption(&mut self, caption: &str) -> Result<()> {
        self.send_unit(BridgeCommand::SetCaption {
            caption: caption.to_string(),
        })
    }

    fn open(&mut self, path: &Path) -> Result<WorkbookId> {
        self.workbook(
            BridgeCommand::OpenWorkbook {
                path: host_path(path),
            },
            "OpenWorkbook",
        )
    }

    fn add_workbook(&mut self) -> Result<WorkbookId> {
        self.workbook(BridgeCommand::CreateWorkbook, "CreateWorkbook")
    }

    fn list_open_documents(&mut self) -> Result<Vec<WorkbookId>> {
        match self.send(BridgeCommand::ListWorkbooks)? {
            Some(ResponseData::Workbooks { workbooks }) => {
                Ok(workbooks.into_iter().map(WorkbookId).collect())
            }
            _ => Err(BridgeError::UnexpectedResponse("ListWorkbooks").into()),
        }
    }

    fn active_workbook(&mut self) -> Result<Option<WorkbookId>> {
        match self.send(BridgeCommand::GetActiveWorkbook)? {
            Some(ResponseData::ActiveWorkbook { workbook }) => Ok(workbook.map(WorkbookId)),
            _ => Err(BridgeError::UnexpectedResponse("GetActiveWorkbook").into()),
        }
    }

    fn document_name(&mut self, workbook: WorkbookId) -> Result<String> {
        self.text(
            BridgeCommand::GetWorkbookName {
                workbook: workbook.0,
            },
            "GetWorkbookName",
        )
    }

    fn sheet_names(&mut self, workbook: WorkbookId) -> Result<Vec<String>> {
        match self.send(BridgeCommand::GetSheetNames {
            workbook: workbook.0,
        })? {
            Some(ResponseData::Names { names }) => Ok(names),
            _ => Err(BridgeError::UnexpectedResponse("GetSheetNames").into()),
        }
    }

    fn save_as(&mut self, workbook: WorkbookId, path: &Path) -> Result<()> {
        self.send_unit(BridgeCommand::SaveWorkbook {
            workbook: workbook.0,
            path: host_path(path),
        })
    }

    fn close_document(&mut self, workbook: WorkbookId, discard_changes: bool) -> Result<()> {
        self.send_unit(BridgeCommand::CloseWorkbook {
            workbook: workbook.0,
            save_changes: !discard_changes,
        })
    }

    fn used_range_row_count(&mut self, sheet: &SheetHandle) -> Result<u32> {
        self.count(
            BridgeCommand::GetUsedRowCount {
                sheet: sheet_location(sheet),
            },
            "GetUsedRowCount",
        )
    }

    fn max_rows(&mut self, sheet: &SheetHandle) -> Result<u32> {
        self.count(
            BridgeCommand::GetMaxRows {
                sheet: sheet_location(sheet),
            },
            "GetMaxRows",
        )
    }

    fn last_used_row(
        &mut self,
        sheet: &SheetHandle,
        column: u32,
        from_row: u32,
    ) -> Result<Option<u32>> {
        match self.send(BridgeCommand::FindLastUsedRow {
            sheet: sheet_location(sheet),
            column,
            from_row,
        })? {
            Some(ResponseData::Row { row }) => Ok(row),
            _ => Err(BridgeError::UnexpectedResponse("FindLastUsedRow").into()),
        }
    }

    fn copy_range(
        &mut self,
        src: &SheetHandle,
        src_address: &str,
        dst: &SheetHandle,
        dst_address: &str,
    ) -> Result<()> {
        self.send_unit(BridgeCommand::CopyRange {
            source: range_location(src, src_address),
            destination: range_location(dst, dst_address),
        })
    }

    fn transfer_values(
        &mut self,
        src: &SheetHandle,
        src_address: &str,
        dst: &SheetHandle,
        dst_address: &str,
    ) -> Result<()> {
        self.send_unit(BridgeCommand::TransferValues {
            source: range_location(src, src_address),
            destination: range_location(dst, dst_address),
        })
    }

    fn write_value(&mut self, sheet: &SheetHandle, address: &str, value: CellValue) -> Result<()> {
        self.send_unit(BridgeCommand::SetCellValue {
            range: range_location(sheet, address),
            value,
        })
    }

    fn read_value(&mut self, sheet: &SheetHandle, address: &str) -> Result<CellValue> {
        match self.send(BridgeCommand::GetCellValue {
            range: range_location(sheet, address),
        })? {
            Some(ResponseData::Value { value }) => Ok(value),
            _ => Err(BridgeError::UnexpectedResponse("GetCellValue").into()),
        }
    }

    fn range_geometry(&mut self, sheet: &SheetHandle, address: &str) -> Result<RangeGeometry> {
        match self.send(BridgeCommand::GetRangeGeometry {
            range: range_location(sheet, address),
        })? {
            Some(ResponseData::Geometry { geometry }) => Ok(geometry),
            _ => Err(BridgeError::UnexpectedResponse("GetRangeGeometry").into()),
        }
    }

    fn insert_picture(
        &mut self,
        sheet: &SheetHandle,
        path: &Path,
        placement: RangeGeometry,
    ) -> Result<()> {
        self.send_unit(BridgeCommand::InsertPicture {
            sheet: sheet_location(sheet),
            path: host_path(path),
            left: placement.left,
            top: placement.top,
            width: placement.width,
            height: placement.height,
        })
    }

    fn replace(&mut self, sheet: &SheetHandle, find: &str, replacement: &str) -> Result<()> {
        self.send_unit(BridgeCommand::Replace {
            sheet: sheet_location(sheet),
            find: find.to_string(),
            replacement: replacement.to_string(),
        })
    }

    fn quit(&mut self) -> Result<()> {
        self.send_unit(BridgeCommand::Quit)
    }

    fn release_references(&mut self) -> Result<()> {
        self.send_unit(BridgeCommand::ReleaseReferences)
    }

    fn window_handle(&mut self) -> Result<WindowHandle> {
        match self.send(BridgeCommand::GetWindowHandle)? {
            Some(ResponseData::WindowHandle { hwnd }) => Ok(WindowHandle(hwnd)),
            _ => Err(BridgeError::UnexpectedResponse("GetWindowHandle").into()),
        }
    }
}

/// Attaches to or starts the application inside a bridge process.
pub struct BridgeConnector {
    bridge: Arc<ExcelBridge>,
}

impl BridgeConnector {
    pub fn new(bridge: Arc<ExcelBridge>) -> Self {
        Self { bridge }
    }

    fn host(&self) -> BridgeHost {
        BridgeHost {
            bridge: Arc::clone(&self.bridge),
        }
    }
}

impl HostFactory for BridgeConnector {
    type Host = BridgeHost;

    fn try_attach(&mut self) -> Result<Option<BridgeHost>> {
        match self.bridge.send_command(BridgeCommand::AttachApplication)? {
            Some(ResponseData::Flag { value: true }) => Ok(Some(self.host())),
            Some(ResponseData::Flag { value: false }) => Ok(None),
            _ => Err(BridgeError::UnexpectedResponse("AttachApplication").into()),
        }
    }

    fn create_new(&mut self, caption: &str) -> Result<BridgeHost> {
        self.bridge
            .send_command(BridgeCommand::CreateApplication {
                caption: caption.to_string(),
                visible: true,
            })
            .map_err(|e| Error::HostUnavailable(e.to_string()))?;
        Ok(self.host())
    }
}

/// Window and process lookups, answered by the bridge.
///
/// These keep working after the application has quit.
pub struct BridgeProcessControl {
    bridge: Arc<ExcelBridge>,
}

impl BridgeProcessControl {
    pub fn new(bridge: Arc<ExcelBridge>) -> Self {
        Self { bridge }
    }
}

impl ProcessControl for BridgeProcessControl {
    fn process_id_for_window(&mut self, window: WindowHandle) -> Result<Option<u32>> {
        match self
            .bridge
            .send_command(BridgeCommand::GetProcessId { hwnd: window.0 })?
        {
            Some(ResponseData::ProcessId { pid }) => Ok(pid),
            _ => Err(BridgeError::UnexpectedResponse("GetProcessId").into()),
        }
    }

    fn terminate(&mut self, pid: u32) -> Result<()> {
        self.bridge
            .send_command(BridgeCommand::TerminateProcess { pid })?;
        Ok(())
    }
}

/// Start a bridge process and open a session on the application it drives.
pub fn start_session(
    bridge_config: BridgeConfig,
    session_config: SessionConfig,
) -> Result<Session<BridgeHost, BridgeProcessControl>> {
    let bridge = ExcelBridge::start(bridge_config)
        .map(Arc::new)
        .map_err(|e| Error::HostUnavailable(e.to_string()))?;

    Session::connect(
        BridgeConnector::new(Arc::clone(&bridge)),
        BridgeProcessControl::new(bridge),
        session_config,
    )
}
