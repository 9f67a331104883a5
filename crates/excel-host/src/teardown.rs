//! Session teardown: close documents, quit, and kill the process if it stays.
//!
//! ```text
//! Running -> ClosingDocuments -> Quitting -> Terminated
//!                                         \-> Orphaned
//! ```
//!
//! Teardown never fails. Every step that goes wrong is logged and kept in
//! the report as [`Error::TeardownFailure`], and the next step still runs.

use std::time::Duration;

use crate::error::Error;
use crate::host::{AppFlag, SpreadsheetHost, WindowHandle};
use crate::process::{wait_for_exit, ProcessControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownState {
    Running,
    ClosingDocuments,
    Quitting,
    /// The host process is gone.
    Terminated,
    /// The host process is still resident after quitting.
    Orphaned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownOptions {
    /// Terminate the process when it is still resident after quitting.
    pub force_kill: bool,
    /// How long to wait for the process to exit on its own.
    pub quit_grace: Duration,
}

impl TeardownOptions {
    /// Quit and report, never kill.
    pub fn graceful(quit_grace: Duration) -> Self {
        Self {
            force_kill: false,
            quit_grace,
        }
    }

    /// Quit, then kill whatever is left.
    pub fn forced(quit_grace: Duration) -> Self {
        Self {
            force_kill: true,
            quit_grace,
        }
    }
}

#[derive(Debug)]
pub struct TeardownReport {
    pub state: TeardownState,
    pub closed_documents: usize,
    /// Process terminated by the forced-kill fallback.
    pub killed_pid: Option<u32>,
    pub failures: Vec<Error>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.state == TeardownState::Terminated && self.failures.is_empty()
    }
}

struct Run {
    report: TeardownReport,
}

impl Run {
    fn enter(&mut self, next: TeardownState) {
        tracing::debug!("teardown: {:?} -> {next:?}", self.report.state);
        self.report.state = next;
    }

    fn fail(&mut self, step: &str, err: Error) {
        tracing::warn!("teardown: {step} failed: {err}");
        self.report
            .failures
            .push(Error::TeardownFailure(format!("{step}: {err}")));
    }
}

/// Release the host: close every document without saving, quit, and when
/// `options.force_kill` is set terminate the process if it is still there.
pub fn shutdown<H, P>(host: &mut H, processes: &mut P, options: TeardownOptions) -> TeardownReport
where
    H: SpreadsheetHost + ?Sized,
    P: ProcessControl + ?Sized,
{
    let mut run = Run {
        report: TeardownReport {
            state: TeardownState::Running,
            closed_documents: 0,
            killed_pid: None,
            failures: Vec::new(),
        },
    };

    // Needed after quit, when the application may no longer answer.
    let window = match host.window_handle() {
        Ok(window) => Some(window),
        Err(e) => {
            run.fail("reading window handle", e);
            None
        }
    };

    run.enter(TeardownState::ClosingDocuments);
    match host.list_open_documents() {
        Ok(documents) if documents.is_empty() => {}
        Ok(documents) => {
            if let Err(e) = host.set_flag(AppFlag::DisplayAlerts, false) {
                run.fail("suppressing alerts", e);
            }
            for workbook in documents {
                match host.close_document(workbook, true) {
                    Ok(()) => run.report.closed_documents += 1,
                    Err(e) => run.fail(&format!("closing {workbook}"), e),
                }
            }
        }
        Err(e) => run.fail("listing documents", e),
    }

    run.enter(TeardownState::Quitting);
    let quit_ok = match host.quit() {
        Ok(()) => true,
        Err(e) => {
            run.fail("quit", e);
            false
        }
    };
    // Courtesy only: the application may already be gone.
    if let Err(e) = host.set_flag(AppFlag::DisplayAlerts, true) {
        tracing::debug!("teardown: restoring alerts after quit: {e}");
    }
    if let Err(e) = host.release_references() {
        run.fail("releasing references", e);
    }

    let final_state = match window {
        Some(window) => settle(&mut run, processes, window, options, quit_ok),
        None if quit_ok => TeardownState::Terminated,
        None => TeardownState::Orphaned,
    };
    run.enter(final_state);

    match run.report.state {
        TeardownState::Terminated => tracing::info!(
            "Host released ({} document(s) closed)",
            run.report.closed_documents
        ),
        _ => tracing::warn!("Host process left running"),
    }
    run.report
}

/// Decide between Terminated and Orphaned once quit has been sent.
fn settle<P: ProcessControl + ?Sized>(
    run: &mut Run,
    processes: &mut P,
    window: WindowHandle,
    options: TeardownOptions,
    quit_ok: bool,
) -> TeardownState {
    let resident = match wait_for_exit(processes, window, options.quit_grace) {
        Ok(pid) => pid,
        Err(e) => {
            run.fail("resolving host process", e);
            return if quit_ok {
                TeardownState::Terminated
            } else {
                TeardownState::Orphaned
            };
        }
    };

    let Some(pid) = resident else {
        return TeardownState::Terminated;
    };

    if !options.force_kill {
        tracing::warn!("Host process {pid} is still running after quit");
        return TeardownState::Orphaned;
    }

    tracing::info!("Host process {pid} still running after quit, terminating it");
    match processes.terminate(pid) {
        Ok(()) => {
            run.report.killed_pid = Some(pid);
            TeardownState::Terminated
        }
        Err(e) => {
            run.fail(&format!("terminating process {pid}"), e);
            TeardownState::Orphaned
        }
    }
}
