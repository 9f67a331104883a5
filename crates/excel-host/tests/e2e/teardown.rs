use std::time::Duration;

use excel_host::teardown::{shutdown, TeardownOptions, TeardownState};
use excel_host::{AppFlag, Error};
use pretty_assertions::assert_eq;

use crate::common::FakeHost;

const GRACE: Duration = Duration::from_millis(50);

#[test]
fn forced_shutdown_closes_everything_and_kills() {
    let mut host = FakeHost::stubborn();
    host.seed_book("a.xlsx", &["Sheet1"]);
    host.seed_book("b.xlsx", &["Sheet1"]);
    let mut processes = host.processes();
    let window = host.window();

    let report = shutdown(&mut host, &mut processes, TeardownOptions::forced(GRACE));

    assert_eq!(report.state, TeardownState::Terminated);
    assert_eq!(report.closed_documents, 2);
    assert_eq!(
        host.closed,
        vec![("a.xlsx".to_string(), true), ("b.xlsx".to_string(), true)]
    );
    assert_eq!(report.killed_pid, Some(4242));
    assert!(!processes.resolves(window));
    assert!(host.released);
    assert!(report.is_clean());
}

#[test]
fn alerts_suppressed_while_closing_then_restored() {
    let mut host = FakeHost::new();
    host.seed_book("a.xlsx", &["Sheet1"]);
    let mut processes = host.processes();

    shutdown(&mut host, &mut processes, TeardownOptions::graceful(GRACE));

    assert_eq!(
        host.flag_writes,
        vec![(AppFlag::DisplayAlerts, false), (AppFlag::DisplayAlerts, true)]
    );
    assert_eq!(host.quit_calls, 1);
}

#[test]
fn no_documents_skips_closing() {
    let mut host = FakeHost::new();
    let mut processes = host.processes();

    let report = shutdown(&mut host, &mut processes, TeardownOptions::forced(GRACE));

    assert_eq!(report.closed_documents, 0);
    assert!(host.closed.is_empty());
    assert_eq!(host.flag_writes, vec![(AppFlag::DisplayAlerts, true)]);
    assert_eq!(report.killed_pid, None);
    assert_eq!(report.state, TeardownState::Terminated);
}

#[test]
fn graceful_shutdown_leaves_resident_process() {
    let mut host = FakeHost::stubborn();
    let mut processes = host.processes();
    let window = host.window();

    let report = shutdown(&mut host, &mut processes, TeardownOptions::graceful(GRACE));

    assert_eq!(report.state, TeardownState::Orphaned);
    assert_eq!(report.killed_pid, None);
    assert!(processes.resolves(window));
    assert!(processes.terminated.borrow().is_empty());
}

#[test]
fn failed_kill_is_recorded_not_raised() {
    let mut host = FakeHost::stubborn();
    let mut processes = host.processes();
    processes.fail_terminate = true;

    let report = shutdown(&mut host, &mut processes, TeardownOptions::forced(GRACE));

    assert_eq!(report.state, TeardownState::Orphaned);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], Error::TeardownFailure(_)));
}

#[test]
fn failed_quit_still_kills() {
    let mut host = FakeHost::new();
    host.fail_quit = true;
    let mut processes = host.processes();
    let window = host.window();

    let report = shutdown(&mut host, &mut processes, TeardownOptions::forced(GRACE));

    assert_eq!(report.state, TeardownState::Terminated);
    assert_eq!(report.killed_pid, Some(4242));
    assert_eq!(report.failures.len(), 1);
    assert!(!processes.resolves(window));
}
