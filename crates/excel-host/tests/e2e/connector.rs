use excel_host::config::SessionConfig;
use excel_host::connector::apply_debug_mode;
use excel_host::{AppFlag, Error, HostConnector};
use pretty_assertions::assert_eq;

use crate::common::{FakeFactory, FakeHost};

fn attach_first() -> SessionConfig {
    SessionConfig {
        prefer_new: false,
        ..SessionConfig::default()
    }
}

#[test]
fn attaches_to_running_host() {
    let mut running = FakeHost::new();
    running.seed_book("open.xlsx", &["Sheet1"]);
    let factory = FakeFactory {
        running: Some(running),
        ..FakeFactory::default()
    };

    let host = HostConnector::new(factory, &attach_first())
        .acquire(false)
        .unwrap();

    assert_eq!(host.books.len(), 1);
    assert_eq!(host.caption, "");
}

#[test]
fn starts_new_host_when_none_running() {
    let host = HostConnector::new(FakeFactory::default(), &attach_first())
        .acquire(false)
        .unwrap();

    assert_eq!(host.caption, "New Application");
    assert!(host.books.is_empty());
}

#[test]
fn attach_error_falls_back_to_new_host() {
    let factory = FakeFactory {
        attach_fails: true,
        ..FakeFactory::default()
    };

    let host = HostConnector::new(factory, &attach_first())
        .acquire(false)
        .unwrap();

    assert_eq!(host.caption, "New Application");
}

#[test]
fn prefer_new_never_attaches() {
    let mut running = FakeHost::new();
    running.seed_book("open.xlsx", &["Sheet1"]);
    let factory = FakeFactory {
        running: Some(running),
        ..FakeFactory::default()
    };
    let config = SessionConfig {
        caption: "Nightly merge".to_string(),
        ..SessionConfig::default()
    };

    let host = HostConnector::new(factory, &config).acquire(true).unwrap();

    assert!(host.books.is_empty());
    assert_eq!(host.caption, "Nightly merge");
}

#[test]
fn no_host_at_all_is_unavailable() {
    let factory = FakeFactory {
        attach_fails: true,
        create_fails: true,
        ..FakeFactory::default()
    };

    let err = HostConnector::new(factory, &attach_first())
        .acquire(false)
        .unwrap_err();

    assert!(matches!(err, Error::HostUnavailable(_)), "got {err:?}");
    assert!(err.is_fatal());
}

#[test]
fn debug_mode_off_suppresses_everything() {
    let config = SessionConfig {
        debug_mode: false,
        ..SessionConfig::default()
    };

    let host = HostConnector::new(FakeFactory::default(), &config)
        .acquire(true)
        .unwrap();

    assert_eq!(
        host.flag_writes,
        vec![
            (AppFlag::DisplayAlerts, false),
            (AppFlag::Visible, false),
            (AppFlag::ScreenUpdating, false),
        ]
    );
}

#[test]
fn debug_mode_only_writes_changed_flags() {
    let mut host = FakeHost::new();
    // Fresh fake: invisible, alerts on, screen updating on.
    apply_debug_mode(&mut host, true).unwrap();

    assert_eq!(host.flag_writes, vec![(AppFlag::Visible, true)]);
    assert!(host.flags.values().all(|on| *on));
}

#[test]
fn host_that_rejects_flags_is_quit() {
    let mut host = FakeHost::new();
    host.fail_set_flag = true;
    let window = host.window();
    let processes = host.processes();
    let factory = FakeFactory {
        fresh: Some(host),
        ..FakeFactory::default()
    };
    let config = SessionConfig {
        debug_mode: false,
        ..SessionConfig::default()
    };

    let err = HostConnector::new(factory, &config)
        .acquire(true)
        .unwrap_err();

    assert!(matches!(err, Error::Host(_)), "got {err:?}");
    assert!(!processes.resolves(window));
}

#[test]
fn connect_leaves_flags_alone() {
    let config = SessionConfig {
        debug_mode: false,
        ..SessionConfig::default()
    };

    let host = HostConnector::new(FakeFactory::default(), &config)
        .connect(true)
        .unwrap();

    assert!(host.flag_writes.is_empty());
    assert!(host.flags[&AppFlag::Visible]);
}
