//! Excel host bridge: a Windows process that automates Excel via COM and
//! performs the native process calls the client cannot make itself,
//! controlled by JSON commands over stdin/stdout.
//!
//! Designed to be cross-compiled from Linux and run under WINE, or run
//! natively on Windows.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! - Reads `Request` objects from stdin
//! - Writes `Response` objects to stdout
//! - Diagnostic/log messages go to stderr (never stdout)

#[cfg(windows)]
mod dispatch;
#[cfg(windows)]
mod excel;
#[cfg(windows)]
mod process;

#[cfg(not(windows))]
fn main() {
    eprintln!("excel-host-bridge must be compiled for Windows (--target x86_64-pc-windows-gnu)");
    eprintln!("and run natively or under WINE.");
    std::process::exit(1);
}

/// Everything the bridge holds between requests.
#[cfg(windows)]
#[derive(Default)]
struct BridgeState {
    com_ready: bool,
    excel: Option<excel::ExcelApp>,
}

#[cfg(windows)]
fn main() {
    use std::io::{self, BufRead, Write};

    use excel_host_protocol::*;

    eprintln!("[excel-host-bridge] Starting up...");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut state = BridgeState::default();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("[excel-host-bridge] stdin read error: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[excel-host-bridge] JSON parse error: {e}");
                eprintln!("[excel-host-bridge] Line was: {line}");
                // id=0: the request could not be parsed far enough to know its id
                write_response(
                    &mut out,
                    &Response {
                        id: 0,
                        result: ResponseResult::Error {
                            message: format!("JSON parse error: {e}"),
                        },
                    },
                );
                continue;
            }
        };

        let response = handle_command(&mut state, &request);
        write_response(&mut out, &response);

        if matches!(request.command, Command::Shutdown) {
            eprintln!("[excel-host-bridge] Shutdown complete, exiting.");
            return;
        }
    }

    // stdin closed without a Shutdown: quit whatever we still hold
    if let Some(mut app) = state.excel.take() {
        eprintln!("[excel-host-bridge] stdin closed, quitting Excel...");
        let _ = app.quit();
    }
    if state.com_ready {
        uninit_com();
    }

    eprintln!("[excel-host-bridge] Process exiting.");

    fn write_response(out: &mut impl Write, response: &Response) {
        match serde_json::to_string(response) {
            Ok(json) => {
                let _ = writeln!(out, "{json}");
                let _ = out.flush();
            }
            Err(e) => eprintln!("[excel-host-bridge] failed to encode response: {e}"),
        }
    }
}

#[cfg(windows)]
fn handle_command(
    state: &mut BridgeState,
    request: &excel_host_protocol::Request,
) -> excel_host_protocol::Response {
    use excel_host_protocol::*;

    let id = request.id;

    let result = match &request.command {
        Command::Init => init_com(state),
        Command::AttachApplication => {
            if !state.com_ready {
                not_initialized()
            } else {
                match excel::ExcelApp::attach() {
                    Ok(Some(app)) => {
                        eprintln!("[excel-host-bridge] Attached to running Excel.Application");
                        state.excel = Some(app);
                        ResponseResult::with(ResponseData::Flag { value: true })
                    }
                    Ok(None) => ResponseResult::with(ResponseData::Flag { value: false }),
                    Err(message) => ResponseResult::Error { message },
                }
            }
        }
        Command::CreateApplication { caption, visible } => {
            if !state.com_ready {
                not_initialized()
            } else {
                match excel::ExcelApp::create(caption, *visible) {
                    Ok(app) => {
                        eprintln!("[excel-host-bridge] Excel.Application created successfully");
                        state.excel = Some(app);
                        ResponseResult::ok()
                    }
                    Err(e) => ResponseResult::Error {
                        message: format!("Failed to create Excel.Application: {e}"),
                    },
                }
            }
        }
        Command::GetVersion => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Text {
                text: app.version()?,
            }))
        }),
        Command::GetAppFlag { flag } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Flag {
                value: app.flag(*flag)?,
            }))
        }),
        Command::SetAppFlag { flag, value } => with_excel(state, |app| {
            app.set_flag(*flag, *value)?;
            Ok(ResponseResult::ok())
        }),
        Command::SetCaption { caption } => with_excel(state, |app| {
            app.set_caption(caption)?;
            Ok(ResponseResult::ok())
        }),
        Command::CreateWorkbook => with_excel(state, |app| {
            let workbook = app.create_workbook()?;
            Ok(ResponseResult::with(ResponseData::WorkbookHandle { workbook }))
        }),
        Command::OpenWorkbook { path } => with_excel(state, |app| {
            let workbook = app.open_workbook(path)?;
            Ok(ResponseResult::with(ResponseData::WorkbookHandle { workbook }))
        }),
        Command::ListWorkbooks => with_excel(state, |app| {
            let workbooks = app.list_workbooks()?;
            Ok(ResponseResult::with(ResponseData::Workbooks { workbooks }))
        }),
        Command::GetActiveWorkbook => with_excel(state, |app| {
            let workbook = app.active_workbook()?;
            Ok(ResponseResult::with(ResponseData::ActiveWorkbook { workbook }))
        }),
        Command::GetWorkbookName { workbook } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Text {
                text: app.workbook_name(*workbook)?,
            }))
        }),
        Command::GetSheetNames { workbook } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Names {
                names: app.sheet_names(*workbook)?,
            }))
        }),
        Command::SaveWorkbook { workbook, path } => with_excel(state, |app| {
            app.save_workbook(*workbook, path)?;
            Ok(ResponseResult::ok())
        }),
        Command::CloseWorkbook {
            workbook,
            save_changes,
        } => with_excel(state, |app| {
            app.close_workbook(*workbook, *save_changes)?;
            Ok(ResponseResult::ok())
        }),
        Command::GetUsedRowCount { sheet } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Count {
                count: app.used_row_count(sheet)?,
            }))
        }),
        Command::GetMaxRows { sheet } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Count {
                count: app.max_rows(sheet)?,
            }))
        }),
        Command::FindLastUsedRow {
            sheet,
            column,
            from_row,
        } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Row {
                row: app.last_used_row(sheet, *column, *from_row)?,
            }))
        }),
        Command::CopyRange {
            source,
            destination,
        } => with_excel(state, |app| {
            app.copy_range(source, destination)?;
            Ok(ResponseResult::ok())
        }),
        Command::TransferValues {
            source,
            destination,
        } => with_excel(state, |app| {
            app.transfer_values(source, destination)?;
            Ok(ResponseResult::ok())
        }),
        Command::SetCellValue { range, value } => with_excel(state, |app| {
            app.set_cell_value(range, value)?;
            Ok(ResponseResult::ok())
        }),
        Command::GetCellValue { range } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Value {
                value: app.get_cell_value(range)?,
            }))
        }),
        Command::GetRangeGeometry { range } => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::Geometry {
                geometry: app.range_geometry(range)?,
            }))
        }),
        Command::InsertPicture {
            sheet,
            path,
            left,
            top,
            width,
            height,
        } => with_excel(state, |app| {
            let geometry = RangeGeometry {
                left: *left,
                top: *top,
                width: *width,
                height: *height,
            };
            app.insert_picture(sheet, path, geometry)?;
            Ok(ResponseResult::ok())
        }),
        Command::Replace {
            sheet,
            find,
            replacement,
        } => with_excel(state, |app| {
            app.replace(sheet, find, replacement)?;
            Ok(ResponseResult::ok())
        }),
        Command::Quit => with_excel(state, |app| {
            app.quit()?;
            Ok(ResponseResult::ok())
        }),
        Command::ReleaseReferences => {
            if state.excel.take().is_some() {
                eprintln!("[excel-host-bridge] Released Excel.Application references");
            }
            ResponseResult::ok()
        }
        Command::GetWindowHandle => with_excel(state, |app| {
            Ok(ResponseResult::with(ResponseData::WindowHandle {
                hwnd: app.window_handle()?,
            }))
        }),
        Command::GetProcessId { hwnd } => ResponseResult::with(ResponseData::ProcessId {
            pid: process::process_id_for_window(*hwnd),
        }),
        Command::TerminateProcess { pid } => match process::terminate_process(*pid) {
            Ok(()) => {
                eprintln!("[excel-host-bridge] Terminated process {pid}");
                ResponseResult::ok()
            }
            Err(message) => ResponseResult::Error { message },
        },
        Command::Shutdown => {
            state.excel = None;
            if state.com_ready {
                uninit_com();
                state.com_ready = false;
            }
            ResponseResult::ok()
        }
    };

    Response { id, result }
}

#[cfg(windows)]
fn init_com(state: &mut BridgeState) -> excel_host_protocol::ResponseResult {
    use excel_host_protocol::ResponseResult;
    use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

    if state.com_ready {
        return ResponseResult::ok();
    }

    // Excel requires a single-threaded apartment
    unsafe {
        let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        if let Err(e) = hr.ok() {
            return ResponseResult::Error {
                message: format!("CoInitializeEx failed: {e}"),
            };
        }
    }

    eprintln!("[excel-host-bridge] COM initialized (STA)");
    state.com_ready = true;
    ResponseResult::ok()
}

#[cfg(windows)]
fn uninit_com() {
    unsafe {
        windows::Win32::System::Com::CoUninitialize();
    }
    eprintln!("[excel-host-bridge] COM uninitialized");
}

#[cfg(windows)]
fn not_initialized() -> excel_host_protocol::ResponseResult {
    excel_host_protocol::ResponseResult::Error {
        message: "COM not initialized. Send 'Init' command first.".to_string(),
    }
}

#[cfg(windows)]
fn with_excel(
    state: &mut BridgeState,
    f: impl FnOnce(&mut excel::ExcelApp) -> Result<excel_host_protocol::ResponseResult, String>,
) -> excel_host_protocol::ResponseResult {
    match state.excel.as_mut() {
        Some(app) => match f(app) {
            Ok(r) => r,
            Err(e) => excel_host_protocol::ResponseResult::Error { message: e },
        },
        None => excel_host_protocol::ResponseResult::Error {
            message: "No Excel.Application. Send 'AttachApplication' or 'CreateApplication' first."
                .to_string(),
        },
    }
}
