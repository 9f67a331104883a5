//! Picture insertion at cell anchors.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::host::{RangeGeometry, SheetHandle, SpreadsheetHost};

/// How big an inserted picture is.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PictureSize {
    /// Cover the anchor range exactly.
    #[default]
    FitRange,
    /// Explicit size in points, placed at the anchor's top-left corner.
    Fixed { width: f64, height: f64 },
}

/// One picture that made it onto the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedImage {
    pub file_name: String,
    pub anchor: String,
    pub placement: RangeGeometry,
}

impl InsertedImage {
    /// `file \t anchor \t \t \t left \t top \n`
    pub fn audit_line(&self) -> String {
        format!(
            "{}\t{}\t\t\t{}\t{}\n",
            self.file_name, self.anchor, self.placement.left, self.placement.top
        )
    }
}

/// Outcome of a batch insertion.
#[derive(Debug, Default)]
pub struct ImageBatch {
    pub inserted: Vec<InsertedImage>,
    /// Entries left out, with the reason. Missing files land here as
    /// [`Error::ImageMissing`].
    pub skipped: Vec<(String, Error)>,
}

impl ImageBatch {
    /// One audit line per inserted picture, in insertion order.
    /// `None` when nothing was inserted.
    pub fn audit(&self) -> Option<String> {
        if self.inserted.is_empty() {
            return None;
        }
        let mut log = String::new();
        for image in &self.inserted {
            log.push_str(&image.audit_line());
        }
        Some(log)
    }
}

/// Insert one picture at `anchor`; returns where it was placed.
pub fn add_picture<H: SpreadsheetHost + ?Sized>(
    host: &mut H,
    sheet: &SheetHandle,
    path: &Path,
    anchor: &str,
    size: PictureSize,
) -> Result<RangeGeometry> {
    let range = host.range_geometry(sheet, anchor)?;
    let placement = match size {
        PictureSize::FitRange => range,
        PictureSize::Fixed { width, height } => RangeGeometry {
            width,
            height,
            ..range
        },
    };
    host.insert_picture(sheet, path, placement)?;
    Ok(placement)
}

/// Insert `image_dir/<file>` at each anchor of `entries`, in map order.
///
/// Files that do not exist are skipped without an audit line. A host failure
/// on one entry is logged and the batch moves on.
pub fn insert_all<H: SpreadsheetHost + ?Sized>(
    host: &mut H,
    entries: &IndexMap<String, String>,
    image_dir: &Path,
    sheet: &SheetHandle,
    size: PictureSize,
) -> ImageBatch {
    let mut batch = ImageBatch::default();

    for (anchor, file_name) in entries {
        let path: PathBuf = image_dir.join(file_name);
        if !path.is_file() {
            tracing::debug!("Skipping {anchor}: {} does not exist", path.display());
            batch
                .skipped
                .push((anchor.clone(), Error::ImageMissing(path)));
            continue;
        }

        match add_picture(host, sheet, &path, anchor, size) {
            Ok(placement) => batch.inserted.push(InsertedImage {
                file_name: file_name.clone(),
                anchor: anchor.clone(),
                placement,
            }),
            Err(e) => {
                tracing::warn!("Inserting {file_name} at {anchor} failed: {e}");
                batch.skipped.push((anchor.clone(), e));
            }
        }
    }

    tracing::info!(
        "Inserted {} of {} picture(s) on {sheet}",
        batch.inserted.len(),
        entries.len()
    );
    batch
}
