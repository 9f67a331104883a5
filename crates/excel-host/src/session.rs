//! One automation session against one spreadsheet host.

use std::path::Path;

use indexmap::IndexMap;

use crate::config::SessionConfig;
use crate::connector::{apply_debug_mode, set_flag_if_changed, HostConnector};
use crate::copy::{self, CopySummary};
use crate::error::{Error, Result};
use crate::host::{AppFlag, CellValue, HostFactory, RangeGeometry, SheetHandle, SpreadsheetHost, WorkbookId};
use crate::images::{self, ImageBatch, PictureSize};
use crate::process::ProcessControl;
use crate::resolver::{self, Locator};
use crate::teardown::{self, TeardownOptions, TeardownReport};

/// Per-caller workbook processing, run by [`Session::process`].
pub trait WorkbookHandler<H: SpreadsheetHost, P: ProcessControl> {
    fn handle(&mut self, session: &mut Session<H, P>, workbook: WorkbookId) -> Result<()>;
}

impl<H, P, F> WorkbookHandler<H, P> for F
where
    H: SpreadsheetHost,
    P: ProcessControl,
    F: FnMut(&mut Session<H, P>, WorkbookId) -> Result<()>,
{
    fn handle(&mut self, session: &mut Session<H, P>, workbook: WorkbookId) -> Result<()> {
        self(session, workbook)
    }
}

/// Owns a host for its whole life.
///
/// The host is released exactly once: by [`Session::exit`], by
/// [`Session::kill`], or when the session is dropped.
pub struct Session<H: SpreadsheetHost, P: ProcessControl> {
    host: H,
    processes: P,
    config: SessionConfig,
    handler: Option<Box<dyn WorkbookHandler<H, P>>>,
    released: bool,
}

impl<H: SpreadsheetHost, P: ProcessControl> Session<H, P> {
    /// Acquire a host from `factory` according to `config`.
    ///
    /// If the host cannot be configured the session is dropped, which tears
    /// it down like any other session.
    pub fn connect<F>(factory: F, processes: P, config: SessionConfig) -> Result<Self>
    where
        F: HostFactory<Host = H>,
    {
        let host = HostConnector::new(factory, &config).connect(config.prefer_new)?;
        let debug_mode = config.debug_mode;
        let mut session = Self::from_host(host, processes, config);
        session.set_debug_mode(debug_mode)?;
        Ok(session)
    }

    /// Wrap a host that is already configured.
    pub fn from_host(host: H, processes: P, config: SessionConfig) -> Self {
        Self {
            host,
            processes,
            config,
            handler: None,
            released: false,
        }
    }

    /// Install the strategy [`Session::process`] hands workbooks to.
    pub fn with_handler(mut self, handler: impl WorkbookHandler<H, P> + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn host(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -- workbooks --

    /// Open workbook matching `locator`, opening it from disk when needed.
    pub fn resolve(&mut self, locator: impl Into<Locator>) -> Result<WorkbookId> {
        resolver::resolve(&mut self.host, &locator.into())
    }

    /// Open a file without checking whether it is already open.
    pub fn open_from_file(&mut self, path: impl AsRef<Path>) -> Result<WorkbookId> {
        self.host.open(path.as_ref())
    }

    pub fn add_workbook(&mut self) -> Result<WorkbookId> {
        self.host.add_workbook()
    }

    /// Close without saving.
    pub fn close_workbook(&mut self, workbook: WorkbookId) -> Result<()> {
        self.host.close_document(workbook, true)
    }

    pub fn save_workbook(&mut self, workbook: WorkbookId, path: impl AsRef<Path>) -> Result<()> {
        self.host.save_as(workbook, path.as_ref())
    }

    /// Open document by display name, ignoring case.
    pub fn workbook_by_name(&mut self, name: &str) -> Result<WorkbookId> {
        resolver::find_open(&mut self.host, name)?
            .ok_or_else(|| Error::WorkbookNotFound(format!("no open workbook named '{name}'")))
    }

    /// The workbook in the active window.
    pub fn active_workbook(&mut self) -> Result<WorkbookId> {
        self.host
            .active_workbook()?
            .ok_or_else(|| Error::WorkbookNotFound("no active workbook".to_string()))
    }

    /// Open document by 0-based position in the host's list.
    pub fn workbook_at(&mut self, index: usize) -> Result<WorkbookId> {
        self.host
            .list_open_documents()?
            .get(index)
            .copied()
            .ok_or_else(|| Error::WorkbookNotFound(format!("no open workbook at position {index}")))
    }

    pub fn sheet_names(&mut self, workbook: WorkbookId) -> Result<Vec<String>> {
        self.host.sheet_names(workbook)
    }

    /// Resolve `locator` and run the installed handler on it.
    pub fn process(&mut self, locator: impl Into<Locator>) -> Result<()> {
        let workbook = self.resolve(locator)?;
        let Some(mut handler) = self.handler.take() else {
            return Err(Error::host("no workbook handler installed"));
        };
        let outcome = handler.handle(self, workbook);
        self.handler = Some(handler);
        outcome
    }

    // -- cells --

    pub fn get_end_row(&mut self, sheet: &SheetHandle) -> Result<u32> {
        copy::get_end_row(&mut self.host, sheet)
    }

    /// See [`copy::copy_columns`].
    pub fn copy_columns<S: AsRef<str>, D: AsRef<str>>(
        &mut self,
        source: &SheetHandle,
        source_cols: &[S],
        source_start_row: u32,
        dest: &SheetHandle,
        dest_cols: &[D],
        dest_start_row: u32,
    ) -> Result<CopySummary> {
        copy::copy_columns(
            &mut self.host,
            source,
            source_cols,
            source_start_row,
            dest,
            dest_cols,
            dest_start_row,
        )
    }

    /// See [`copy::copy_columns_indexed`].
    pub fn copy_columns_indexed(
        &mut self,
        source: &SheetHandle,
        source_cols: &[u32],
        source_start_row: u32,
        dest: &SheetHandle,
        dest_cols: &[u32],
        dest_start_row: u32,
    ) -> Result<CopySummary> {
        copy::copy_columns_indexed(
            &mut self.host,
            source,
            source_cols,
            source_start_row,
            dest,
            dest_cols,
            dest_start_row,
        )
    }

    pub fn copy_header(&mut self, source: &SheetHandle, dest: &SheetHandle, header_row: u32) -> Result<()> {
        copy::copy_header(&mut self.host, source, dest, header_row)
    }

    pub fn fill_column(
        &mut self,
        sheet: &SheetHandle,
        column: u32,
        len: u32,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        copy::fill_column(&mut self.host, sheet, column, len, value.into())
    }

    pub fn read_value(&mut self, sheet: &SheetHandle, address: &str) -> Result<CellValue> {
        self.host.read_value(sheet, address)
    }

    pub fn replace(&mut self, sheet: &SheetHandle, find: &str, replacement: &str) -> Result<()> {
        self.host.replace(sheet, find, replacement)
    }

    /// Replace on every sheet of the workbook.
    pub fn replace_in_workbook(&mut self, workbook: WorkbookId, find: &str, replacement: &str) -> Result<()> {
        for name in self.host.sheet_names(workbook)? {
            self.host
                .replace(&SheetHandle::named(workbook, name), find, replacement)?;
        }
        Ok(())
    }

    // -- pictures --

    pub fn add_picture(
        &mut self,
        sheet: &SheetHandle,
        path: impl AsRef<Path>,
        anchor: &str,
        size: PictureSize,
    ) -> Result<RangeGeometry> {
        images::add_picture(&mut self.host, sheet, path.as_ref(), anchor, size)
    }

    /// See [`images::insert_all`]. Pictures cover their anchor ranges.
    pub fn insert_images(
        &mut self,
        entries: &IndexMap<String, String>,
        image_dir: impl AsRef<Path>,
        sheet: &SheetHandle,
    ) -> ImageBatch {
        images::insert_all(
            &mut self.host,
            entries,
            image_dir.as_ref(),
            sheet,
            PictureSize::FitRange,
        )
    }

    // -- application --

    pub fn debug_mode(&self) -> bool {
        self.config.debug_mode
    }

    pub fn set_debug_mode(&mut self, on: bool) -> Result<()> {
        apply_debug_mode(&mut self.host, on)?;
        self.config.debug_mode = on;
        Ok(())
    }

    /// Title shown in the application's window.
    pub fn set_caption(&mut self, caption: &str) -> Result<()> {
        self.host.set_caption(caption)?;
        self.config.caption = caption.to_string();
        Ok(())
    }

    /// Make the application window visible.
    pub fn show(&mut self) -> Result<()> {
        set_flag_if_changed(&mut self.host, AppFlag::Visible, true)
    }

    // -- teardown --

    /// Close everything and quit. The process is left alone if it lingers.
    pub fn exit(mut self) -> TeardownReport {
        let options = TeardownOptions::graceful(self.config.quit_grace);
        self.release(options)
    }

    /// Close everything, quit, and terminate the process if it lingers.
    pub fn kill(mut self) -> TeardownReport {
        let options = TeardownOptions::forced(self.config.quit_grace);
        self.release(options)
    }

    fn release(&mut self, options: TeardownOptions) -> TeardownReport {
        self.released = true;
        teardown::shutdown(&mut self.host, &mut self.processes, options)
    }
}

impl<H: SpreadsheetHost, P: ProcessControl> Drop for Session<H, P> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::debug!("Session dropped without exit, releasing host");
        let options = TeardownOptions {
            force_kill: self.config.force_kill_on_drop,
            quit_grace: self.config.quit_grace,
        };
        let report = self.release(options);
        if !report.is_clean() {
            tracing::warn!(
                "Teardown on drop ended {:?} with {} failure(s)",
                report.state,
                report.failures.len()
            );
        }
    }
}
