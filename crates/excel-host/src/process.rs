//! Process identity: the OS process behind the host's window.
//!
//! Only the forced-kill fallback of teardown uses this; it is the one place
//! that needs native process calls.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::host::WindowHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Native process lookup and termination.
pub trait ProcessControl {
    /// Process owning `window`, or `None` once the window no longer exists.
    fn process_id_for_window(&mut self, window: WindowHandle) -> Result<Option<u32>>;

    fn terminate(&mut self, pid: u32) -> Result<()>;
}

impl<P: ProcessControl + ?Sized> ProcessControl for Box<P> {
    fn process_id_for_window(&mut self, window: WindowHandle) -> Result<Option<u32>> {
        (**self).process_id_for_window(window)
    }

    fn terminate(&mut self, pid: u32) -> Result<()> {
        (**self).terminate(pid)
    }
}

/// Poll until `window` stops resolving or `grace` runs out.
/// Returns the process still behind the window, if any.
pub fn wait_for_exit<P: ProcessControl + ?Sized>(
    processes: &mut P,
    window: WindowHandle,
    grace: Duration,
) -> Result<Option<u32>> {
    let deadline = Instant::now() + grace;
    loop {
        let pid = processes.process_id_for_window(window)?;
        if pid.is_none() || Instant::now() >= deadline {
            return Ok(pid);
        }
        thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
    }
}
