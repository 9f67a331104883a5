use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use excel_host::config::SessionConfig;
use excel_host::{
    AppFlag, CellValue, Error, Result, Session, SheetHandle, TeardownState, WorkbookId,
};
use pretty_assertions::assert_eq;

use crate::common::{text, texts, FakeFactory, FakeHost, FakeProcesses};

type FakeSession = Session<FakeHost, FakeProcesses>;

fn config() -> SessionConfig {
    SessionConfig {
        quit_grace: Duration::from_millis(50),
        ..SessionConfig::default()
    }
}

fn session_over(host: FakeHost) -> (FakeSession, FakeProcesses) {
    let processes = host.processes();
    let factory = FakeFactory {
        fresh: Some(host),
        ..FakeFactory::default()
    };
    let session = Session::connect(factory, processes.clone(), config()).unwrap();
    (session, processes)
}

#[test]
fn handler_runs_on_resolved_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("input.xlsx");
    fs::write(&file, b"").unwrap();
    let (session, _) = session_over(FakeHost::new());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let mut session = session.with_handler(move |s: &mut FakeSession, book: WorkbookId| -> Result<()> {
        let names = s.sheet_names(book)?;
        log.borrow_mut().push((s.host().books[&book.0].name.clone(), names));
        Ok(())
    });

    session.process(file.as_path()).unwrap();
    session.process(file.as_path()).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            ("input.xlsx".to_string(), vec!["Sheet1".to_string()]),
            ("input.xlsx".to_string(), vec!["Sheet1".to_string()]),
        ]
    );
    assert_eq!(session.host().opens, 1);
}

#[test]
fn handler_errors_are_returned() {
    let mut host = FakeHost::new();
    host.seed_book("Book1", &["Sheet1"]);
    let (session, _) = session_over(host);
    let mut session =
        session.with_handler(|_: &mut FakeSession, _: WorkbookId| -> Result<()> {
            Err(Error::host("bad data"))
        });

    let err = session.process("Book1").unwrap_err();
    assert!(matches!(err, Error::Host(ref msg) if msg == "bad data"));

    // The handler stays installed for the next call.
    assert!(session.process("Book1").is_err());
}

#[test]
fn process_without_handler_fails() {
    let mut host = FakeHost::new();
    host.seed_book("Book1", &["Sheet1"]);
    let (mut session, _) = session_over(host);

    assert!(session.process("Book1").is_err());
}

#[test]
fn dropping_session_tears_host_down() {
    let mut host = FakeHost::stubborn();
    host.seed_book("draft.xlsx", &["Sheet1"]);
    let window = host.window();
    let (session, processes) = session_over(host);

    drop(session);

    assert!(!processes.resolves(window));
    assert_eq!(*processes.terminated.borrow(), vec![4242]);
}

#[test]
fn exit_is_graceful_and_kill_is_forced() {
    let (session, processes) = session_over(FakeHost::stubborn());
    let report = session.exit();
    assert_eq!(report.state, TeardownState::Orphaned);
    assert!(processes.terminated.borrow().is_empty());

    let (session, processes) = session_over(FakeHost::stubborn());
    let report = session.kill();
    assert_eq!(report.state, TeardownState::Terminated);
    assert_eq!(*processes.terminated.borrow(), vec![4242]);
}

#[test]
fn replace_touches_every_sheet() {
    let mut host = FakeHost::new();
    let book = host.seed_book("budget.xlsx", &["Q1", "Q2"]);
    let q1 = SheetHandle::named(book, "Q1");
    let q2 = SheetHandle::named(book, "Q2");
    host.seed_column(&q1, "A1", &texts(&["FY2023 plan", "other"]));
    host.seed_column(&q2, "B2", &texts(&["FY2023 actual"]));
    let (mut session, _) = session_over(host);

    session.replace_in_workbook(book, "2023", "2024").unwrap();

    assert_eq!(session.host().cell(&q1, "A1"), text("FY2024 plan"));
    assert_eq!(session.host().cell(&q1, "A2"), text("other"));
    assert_eq!(session.host().cell(&q2, "B2"), text("FY2024 actual"));
}

#[test]
fn workbooks_by_name_and_position() {
    let mut host = FakeHost::new();
    let first = host.seed_book("first.xlsx", &["Sheet1"]);
    let second = host.seed_book("second.xlsx", &["Sheet1"]);
    let (mut session, _) = session_over(host);

    assert_eq!(session.workbook_by_name("Second.xlsx").unwrap(), second);
    assert_eq!(session.workbook_at(0).unwrap(), first);
    assert!(matches!(
        session.workbook_by_name("third.xlsx"),
        Err(Error::WorkbookNotFound(_))
    ));

    session.close_workbook(first).unwrap();
    assert_eq!(session.workbook_at(0).unwrap(), second);
    assert_eq!(session.host().closed, vec![("first.xlsx".to_string(), true)]);
}

#[test]
fn new_workbook_can_be_filled_and_saved() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _) = session_over(FakeHost::new());

    let book = session.add_workbook().unwrap();
    let sheet = SheetHandle::first(book);
    session.fill_column(&sheet, 1, 2, "pending").unwrap();
    assert_eq!(session.get_end_row(&sheet).unwrap(), 2);

    let target = dir.path().join("out.xlsx");
    session.save_workbook(book, &target).unwrap();
    assert_eq!(session.host().saved[0].1, target);
}

#[test]
fn debug_mode_toggles_and_show_makes_visible() {
    let (mut session, _) = session_over(FakeHost::new());
    assert!(session.debug_mode());

    session.set_debug_mode(false).unwrap();
    assert!(!session.debug_mode());
    assert_eq!(session.host().flags[&AppFlag::Visible], false);
    assert_eq!(session.host().flags[&AppFlag::DisplayAlerts], false);

    session.show().unwrap();
    assert_eq!(session.host().flags[&AppFlag::Visible], true);
    assert_eq!(session.host().flags[&AppFlag::ScreenUpdating], false);
}

#[test]
fn failed_setup_still_releases_host() {
    let mut host = FakeHost::stubborn();
    host.fail_set_flag = true;
    let window = host.window();
    let processes = host.processes();
    let factory = FakeFactory {
        fresh: Some(host),
        ..FakeFactory::default()
    };
    let config = SessionConfig {
        debug_mode: false,
        ..config()
    };

    let err = Session::connect(factory, processes.clone(), config).err().unwrap();

    assert!(matches!(err, Error::Host(_)), "got {err:?}");
    assert!(!processes.resolves(window));
    assert_eq!(*processes.terminated.borrow(), vec![4242]);
}

#[test]
fn active_workbook_follows_opens_and_closes() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("report.xlsx");
    fs::write(&file, b"").unwrap();
    let (mut session, _) = session_over(FakeHost::new());
    assert!(matches!(
        session.active_workbook(),
        Err(Error::WorkbookNotFound(_))
    ));

    let blank = session.add_workbook().unwrap();
    assert_eq!(session.active_workbook().unwrap(), blank);
    let report = session.resolve(file.as_path()).unwrap();
    assert_eq!(session.active_workbook().unwrap(), report);

    session.close_workbook(report).unwrap();
    assert_eq!(session.active_workbook().unwrap(), blank);
}

#[test]
fn caption_and_cell_reads_reach_the_host() {
    let (mut session, _) = session_over(FakeHost::new());
    session.set_caption("Quarterly merge").unwrap();
    assert_eq!(session.host().caption, "Quarterly merge");
    assert_eq!(session.config().caption, "Quarterly merge");

    let book = session.add_workbook().unwrap();
    let sheet = SheetHandle::first(book);
    session.fill_column(&sheet, 2, 3, "done").unwrap();

    assert_eq!(session.read_value(&sheet, "B3").unwrap(), text("done"));
    assert_eq!(session.read_value(&sheet, "B4").unwrap(), CellValue::Null);
    assert_eq!(session.read_value(&sheet, "B1:B3").unwrap(), text("done"));
}
