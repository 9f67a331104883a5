//! Spreadsheet host automation: one session, one running application.
//!
//! A [`Session`] acquires a host (attaching to a running application or
//! starting one), finds workbooks by path or wildcard, copies columns
//! between sheets, drops pictures onto cell ranges, and tears the host down
//! again, killing the process if it refuses to go.
//!
//! # Architecture
//!
//! ```text
//! Your Rust code
//!     └── Session (this crate)
//!           ├── SpreadsheetHost ── BridgeHost
//!           └── ProcessControl ─── BridgeProcessControl
//!                                      └── spawns: [wine] excel-host-bridge.exe
//!                                            └── COM: Excel.Application
//! ```
//!
//! Everything above the bridge talks to the [`SpreadsheetHost`] and
//! [`ProcessControl`] traits, so tests substitute in-memory fakes.
//!
//! # Example
//!
//! ```rust,no_run
//! use excel_host::{start_session, BridgeConfig, SessionConfig, SheetHandle};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = start_session(BridgeConfig::default(), SessionConfig::default())?;
//!     let source = session.resolve("/data/report.xlsx")?;
//!     let target = session.add_workbook()?;
//!     session.copy_columns(
//!         &SheetHandle::first(source),
//!         &["A", "C"],
//!         2,
//!         &SheetHandle::first(target),
//!         &["A", "B"],
//!         2,
//!     )?;
//!     session.save_workbook(target, "/data/summary.xlsx")?;
//!     let report = session.kill();
//!     println!("host released: {:?}", report.state);
//!     Ok(())
//! }
//! ```

pub mod address;
mod bridge;
pub mod config;
pub mod connector;
pub mod copy;
pub mod error;
pub mod host;
pub mod images;
pub mod process;
pub mod resolver;
mod session;
pub mod teardown;

pub use bridge::{
    linux_to_wine_path, start_session, BridgeConfig, BridgeConnector, BridgeError, BridgeHost,
    BridgeProcessControl, ExcelBridge,
};
pub use config::SessionConfig;
pub use connector::HostConnector;
pub use copy::CopySummary;
pub use error::{Error, Result};
pub use host::{
    AppFlag, CellValue, HostFactory, RangeGeometry, SheetHandle, SheetRef, SpreadsheetHost,
    WindowHandle, WorkbookId,
};
pub use images::{ImageBatch, InsertedImage, PictureSize};
pub use process::ProcessControl;
pub use resolver::{Locator, ResolvedPath};
pub use session::{Session, WorkbookHandler};
pub use teardown::{TeardownOptions, TeardownReport, TeardownState};
