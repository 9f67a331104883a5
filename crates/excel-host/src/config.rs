//! Session configuration.

use std::time::Duration;

/// Caption given to application windows this crate starts.
pub const DEFAULT_CAPTION: &str = "New Application";

/// How a session acquires and releases its host.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// One switch for visibility, alerts and screen updating.
    /// On: visible, alerts shown, screen redrawn. Off: all three suppressed.
    pub debug_mode: bool,

    /// Always start a new application instead of attaching to a running one.
    pub prefer_new: bool,

    /// Window caption for newly started applications.
    pub caption: String,

    /// Whether an implicit teardown (session dropped without `exit`/`kill`)
    /// may terminate the host process when it stays resident.
    pub force_kill_on_drop: bool,

    /// How long teardown waits for the host to exit after quitting before it
    /// counts the process as resident.
    pub quit_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug_mode: true,
            prefer_new: true,
            caption: DEFAULT_CAPTION.to_string(),
            force_kill_on_drop: true,
            quit_grace: Duration::from_secs(2),
        }
    }
}
