//! Excel object model on top of the IDispatch wrapper.

#![cfg(windows)]

use std::collections::HashMap;

use windows::Win32::System::Variant::VARIANT;

use excel_host_protocol::{
    AppFlag, CellError, CellValue, RangeGeometry, RangeLocation, SheetLocation, SheetRef,
};

use crate::dispatch::{
    variant_bool, variant_dispatch, variant_empty, variant_f64, variant_get_bool,
    variant_get_f64, variant_get_string, variant_i32, variant_is_empty, variant_is_error,
    variant_str, DispatchObject,
};

const PROG_ID: &str = "Excel.Application";

// XlDirection.xlUp
const XL_UP: i32 = -4162;
// XlLookAt.xlPart
const XL_PART: i32 = 2;
// XlSearchOrder.xlByRows
const XL_BY_ROWS: i32 = 1;
// XlPlacement.xlMoveAndSize
const XL_MOVE_AND_SIZE: i32 = 1;
// MsoTriState
const MSO_TRUE: i32 = -1;
const MSO_FALSE: i32 = 0;

/// One Excel.Application instance and the workbooks the client has seen.
pub struct ExcelApp {
    app: DispatchObject,
    workbooks: HashMap<u64, DispatchObject>,
    /// FullName -> handle, so a workbook keeps its handle across listings.
    handles_by_path: HashMap<String, u64>,
    next_handle: u64,
}

impl ExcelApp {
    /// Attach to the running instance, if there is one.
    pub fn attach() -> Result<Option<Self>, String> {
        Ok(DispatchObject::attach_from_progid(PROG_ID)?.map(Self::from_app))
    }

    /// Start a new instance.
    pub fn create(caption: &str, visible: bool) -> Result<Self, String> {
        let app = DispatchObject::create_from_progid(PROG_ID)?;
        app.set_property("Visible", variant_bool(visible))?;
        app.set_property("Caption", variant_str(caption))?;
        Ok(Self::from_app(app))
    }

    fn from_app(app: DispatchObject) -> Self {
        Self {
            app,
            workbooks: HashMap::new(),
            handles_by_path: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn version(&self) -> Result<String, String> {
        self.app.get_string("Version")
    }

    pub fn flag(&self, flag: AppFlag) -> Result<bool, String> {
        self.app.get_bool(flag.property_name())
    }

    pub fn set_flag(&self, flag: AppFlag, value: bool) -> Result<(), String> {
        self.app
            .set_property(flag.property_name(), variant_bool(value))
    }

    pub fn set_caption(&self, caption: &str) -> Result<(), String> {
        self.app.set_property("Caption", variant_str(caption))
    }

    pub fn window_handle(&self) -> Result<i64, String> {
        self.app.get_i64("Hwnd")
    }

    /// Give a workbook object a stable handle, keyed by its full path.
    fn register(&mut self, wb: DispatchObject) -> Result<u64, String> {
        let full_name = wb.get_string("FullName")?;
        if let Some(&handle) = self.handles_by_path.get(&full_name) {
            self.workbooks.insert(handle, wb);
            return Ok(handle);
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.workbooks.insert(handle, wb);
        self.handles_by_path.insert(full_name, handle);
        Ok(handle)
    }

    pub fn create_workbook(&mut self) -> Result<u64, String> {
        let wb = self.app.get_child("Workbooks")?.invoke_child("Add", &[])?;
        self.register(wb)
    }

    pub fn open_workbook(&mut self, path: &str) -> Result<u64, String> {
        let wb = self
            .app
            .get_child("Workbooks")?
            .invoke_child("Open", &[variant_str(path)])?;
        self.register(wb)
    }

    /// The workbook in the active window, if any.
    pub fn active_workbook(&mut self) -> Result<Option<u64>, String> {
        match self.app.get_optional_child("ActiveWorkbook")? {
            Some(wb) => self.register(wb).map(Some),
            None => Ok(None),
        }
    }

    /// Every workbook open in the application, in `Workbooks` order.
    pub fn list_workbooks(&mut self) -> Result<Vec<u64>, String> {
        let collection = self.app.get_child("Workbooks")?;
        let count = collection.get_i64("Count")?;
        let mut handles = Vec::with_capacity(count.max(0) as usize);
        for i in 1..=count {
            let wb = collection.get_indexed("Item", &[variant_i32(i as i32)])?;
            handles.push(self.register(wb)?);
        }
        Ok(handles)
    }

    fn workbook(&self, handle: u64) -> Result<&DispatchObject, String> {
        self.workbooks
            .get(&handle)
            .ok_or_else(|| format!("Unknown workbook handle: {handle}"))
    }

    pub fn workbook_name(&self, handle: u64) -> Result<String, String> {
        self.workbook(handle)?.get_string("Name")
    }

    pub fn sheet_names(&self, handle: u64) -> Result<Vec<String>, String> {
        let sheets = self.workbook(handle)?.get_child("Worksheets")?;
        let count = sheets.get_i64("Count")?;
        (1..=count)
            .map(|i| {
                sheets
                    .get_indexed("Item", &[variant_i32(i as i32)])?
                    .get_string("Name")
            })
            .collect()
    }

    fn get_sheet(&self, location: &SheetLocation) -> Result<DispatchObject, String> {
        let sheets = self.workbook(location.workbook)?.get_child("Worksheets")?;
        match &location.sheet {
            // Excel worksheets are 1-based, the protocol is 0-based
            SheetRef::Index(idx) => sheets.get_indexed("Item", &[variant_i32(*idx as i32 + 1)]),
            SheetRef::Name(name) => sheets.get_indexed("Item", &[variant_str(name)]),
        }
    }

    fn get_range(&self, location: &RangeLocation) -> Result<DispatchObject, String> {
        let ws = self.get_sheet(&SheetLocation {
            workbook: location.workbook,
            sheet: location.sheet.clone(),
        })?;
        ws.get_indexed("Range", &[variant_str(&location.address)])
    }

    pub fn used_row_count(&self, sheet: &SheetLocation) -> Result<u32, String> {
        let rows = self.get_sheet(sheet)?.get_child("UsedRange")?.get_child("Rows")?;
        Ok(rows.get_i64("Count")? as u32)
    }

    pub fn max_rows(&self, sheet: &SheetLocation) -> Result<u32, String> {
        let rows = self.get_sheet(sheet)?.get_child("Rows")?;
        Ok(rows.get_i64("Count")? as u32)
    }

    /// `Cells(from_row, column).End(xlUp)`, reporting an empty column as `None`.
    pub fn last_used_row(
        &self,
        sheet: &SheetLocation,
        column: u32,
        from_row: u32,
    ) -> Result<Option<u32>, String> {
        let cells = self.get_sheet(sheet)?.get_child("Cells")?;
        let start = cells.get_indexed(
            "Item",
            &[variant_i32(from_row as i32), variant_i32(column as i32)],
        )?;
        if !variant_is_empty(&start.get_property("Value")?) {
            return Ok(Some(from_row));
        }

        let end = start.get_indexed("End", &[variant_i32(XL_UP)])?;
        let row = end.get_i64("Row")? as u32;
        // End(xlUp) stops on row 1 whether or not it holds anything.
        if row == 1 && variant_is_empty(&end.get_property("Value")?) {
            return Ok(None);
        }
        Ok(Some(row))
    }

    pub fn copy_range(
        &self,
        source: &RangeLocation,
        destination: &RangeLocation,
    ) -> Result<(), String> {
        let src = self.get_range(source)?;
        let dst = self.get_range(destination)?;
        src.invoke_method("Copy", &[variant_dispatch(&dst)])?;
        Ok(())
    }

    pub fn transfer_values(
        &self,
        source: &RangeLocation,
        destination: &RangeLocation,
    ) -> Result<(), String> {
        let values = self.get_range(source)?.get_property("Value")?;
        self.get_range(destination)?.set_property("Value", values)
    }

    pub fn set_cell_value(&self, range: &RangeLocation, value: &CellValue) -> Result<(), String> {
        self.get_range(range)?
            .set_property("Value", cell_value_to_variant(value))
    }

    pub fn get_cell_value(&self, range: &RangeLocation) -> Result<CellValue, String> {
        let cell = self
            .get_range(range)?
            .get_indexed("Cells", &[variant_i32(1), variant_i32(1)])?;
        let variant = cell.get_property("Value")?;
        Ok(variant_to_cell_value(&variant))
    }

    pub fn range_geometry(&self, range: &RangeLocation) -> Result<RangeGeometry, String> {
        let r = self.get_range(range)?;
        Ok(RangeGeometry {
            left: r.get_f64("Left")?,
            top: r.get_f64("Top")?,
            width: r.get_f64("Width")?,
            height: r.get_f64("Height")?,
        })
    }

    pub fn insert_picture(
        &self,
        sheet: &SheetLocation,
        path: &str,
        geometry: RangeGeometry,
    ) -> Result<(), String> {
        let shape = self.get_sheet(sheet)?.get_child("Shapes")?.invoke_child(
            "AddPicture",
            &[
                variant_str(path),
                variant_i32(MSO_FALSE), // LinkToFile
                variant_i32(MSO_TRUE),  // SaveWithDocument
                variant_f64(geometry.left),
                variant_f64(geometry.top),
                variant_f64(geometry.width),
                variant_f64(geometry.height),
            ],
        )?;
        shape.set_property("Placement", variant_i32(XL_MOVE_AND_SIZE))
    }

    pub fn replace(&self, sheet: &SheetLocation, find: &str, replacement: &str) -> Result<(), String> {
        self.get_sheet(sheet)?.get_child("UsedRange")?.invoke_method(
            "Replace",
            &[
                variant_str(find),
                variant_str(replacement),
                variant_i32(XL_PART),
                variant_i32(XL_BY_ROWS),
            ],
        )?;
        Ok(())
    }

    pub fn save_workbook(&self, handle: u64, path: &str) -> Result<(), String> {
        // xlOpenXMLWorkbook = 51, xlWorkbookNormal (xls) = -4143, xlCSV = 6
        let format: i32 = if path.ends_with(".xls") {
            -4143
        } else if path.ends_with(".csv") {
            6
        } else {
            51
        };

        self.workbook(handle)?
            .invoke_method("SaveAs", &[variant_str(path), variant_i32(format)])?;
        Ok(())
    }

    pub fn close_workbook(&mut self, handle: u64, save_changes: bool) -> Result<(), String> {
        let wb = self
            .workbooks
            .remove(&handle)
            .ok_or_else(|| format!("Unknown workbook handle: {handle}"))?;
        self.handles_by_path.retain(|_, h| *h != handle);
        wb.invoke_method("Close", &[variant_bool(save_changes)])?;
        Ok(())
    }

    /// `Application.Quit()`. Workbook objects are dropped, the application
    /// object stays so flags can still be restored afterwards.
    pub fn quit(&mut self) -> Result<(), String> {
        self.workbooks.clear();
        self.handles_by_path.clear();
        self.app.invoke_method("Quit", &[])?;
        Ok(())
    }
}

fn cell_value_to_variant(value: &CellValue) -> VARIANT {
    match value {
        CellValue::Null => variant_empty(),
        CellValue::Bool(b) => variant_bool(*b),
        CellValue::Number(n) => variant_f64(*n),
        CellValue::String(s) => variant_str(s),
        CellValue::Error(_) => variant_empty(),
    }
}

fn variant_to_cell_value(variant: &VARIANT) -> CellValue {
    if variant_is_empty(variant) {
        CellValue::Null
    } else if let Some(b) = variant_get_bool(variant) {
        CellValue::Bool(b)
    } else if let Some(n) = variant_get_f64(variant) {
        CellValue::Number(n)
    } else if let Some(s) = variant_get_string(variant) {
        CellValue::String(s)
    } else if variant_is_error(variant) {
        CellValue::Error(CellError {
            code: "#ERR(VT_ERROR)".to_string(),
        })
    } else {
        CellValue::Null
    }
}
