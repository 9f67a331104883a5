//! Example: merge monthly reports into one summary workbook.
//!
//! For every `report-*.xlsx` in a directory this:
//! 1. Resolves the workbook (reusing it if Excel already has it open)
//! 2. Appends its ID and amount columns to a summary sheet
//! 3. Drops a logo onto the summary header
//! 4. Saves the summary and tears Excel down
//!
//! Prerequisites:
//!   - WINE installed and in PATH (not needed on Windows)
//!   - Microsoft Excel installed in the WINE prefix
//!   - excel-host-bridge.exe built:
//!     cargo build --target x86_64-pc-windows-gnu --manifest-path crates/excel-host-bridge/Cargo.toml --release
//!
//! Run:
//!   cargo run --example merge_reports -p excel-host -- <report-dir> <output.xlsx>

use std::path::PathBuf;

use anyhow::{bail, Context};
use excel_host::{start_session, BridgeConfig, Locator, SessionConfig, SheetHandle, TeardownState};
use indexmap::IndexMap;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(dir), Some(output)) = (args.next(), args.next()) else {
        bail!("usage: merge_reports <report-dir> <output.xlsx>");
    };
    let dir = PathBuf::from(dir);

    println!("Starting Excel bridge...");
    let config = SessionConfig {
        debug_mode: false,
        ..SessionConfig::default()
    };
    let mut session = start_session(BridgeConfig::default(), config)
        .context("no Excel available")?;

    let summary = session.add_workbook()?;
    let target = SheetHandle::first(summary);

    let mut reports: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("report-") && name.ends_with(".xlsx"))
        .collect();
    reports.sort();

    let mut merged = 0;
    for report in &reports {
        let book = session.resolve(Locator::in_directory(&dir, report))?;
        let source = SheetHandle::first(book);
        if merged == 0 {
            session.copy_header(&source, &target, 1)?;
        }

        let copied = session.copy_columns_indexed(&source, &[1, 4], 2, &target, &[1, 2], 2)?;
        println!("  {report}: {} row(s)", copied.rows);
        session.close_workbook(book)?;
        merged += 1;
    }

    let logo = IndexMap::from([("D1:E3".to_string(), "logo.png".to_string())]);
    let pictures = session.insert_images(&logo, &dir, &target);
    if let Some(audit) = pictures.audit() {
        print!("{audit}");
    }

    session.save_workbook(summary, &output)?;
    println!("Merged {merged} report(s) into {output}");

    let report = session.kill();
    if report.state != TeardownState::Terminated {
        eprintln!("Excel is still running: {:?}", report.failures);
    }
    Ok(())
}
