//! Subprocess management and JSON IPC for the automation bridge process.
//!
//! The bridge is a Windows executable. On Linux it runs under WINE; on
//! Windows it is started directly.

mod host;

use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use excel_host_protocol::{Command as BridgeCommand, Request, Response, ResponseData, ResponseResult};

pub use host::{start_session, BridgeConnector, BridgeHost, BridgeProcessControl};

const BRIDGE_EXE: &str = "excel-host-bridge.exe";

/// Errors from the bridge process.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to spawn bridge process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Bridge process not running")]
    NotRunning,

    #[error("Failed to send command to bridge: {0}")]
    SendFailed(String),

    #[error("Failed to read response from bridge: {0}")]
    ReadFailed(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Bridge returned error: {0}")]
    BridgeError(String),

    #[error("Unexpected response data for {0}")]
    UnexpectedResponse(&'static str),

    #[error("Bridge did not answer within {0:?}")]
    Timeout(Duration),

    #[error("WINE not found. Install WINE and ensure 'wine' is in PATH.")]
    WineNotFound,

    #[error("Bridge executable not found at: {0}")]
    BridgeExeNotFound(String),
}

/// Configuration for the bridge process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Path to `excel-host-bridge.exe`.
    /// If None, will search in common locations relative to the current binary.
    pub bridge_exe_path: Option<PathBuf>,

    /// Path to the WINE executable. Defaults to "wine". Unused on Windows.
    pub wine_path: PathBuf,

    /// Optional WINEPREFIX to use (for isolating the WINE environment).
    pub wine_prefix: Option<PathBuf>,

    /// How long to wait for each response before giving up on the call.
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bridge_exe_path: None,
            wine_path: PathBuf::from("wine"),
            wine_prefix: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A running bridge process.
///
/// Responses are read on a dedicated thread so every call can be bounded by
/// the configured timeout. A late answer to a timed-out call is discarded by
/// its request id.
pub struct ExcelBridge {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    responses: Mutex<Receiver<io::Result<String>>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl ExcelBridge {
    /// Start the bridge process and initialize COM in it.
    pub fn start(config: BridgeConfig) -> Result<Self, BridgeError> {
        let exe_path = config.bridge_exe_path.unwrap_or_else(find_bridge_exe);

        if !exe_path.exists() {
            return Err(BridgeError::BridgeExeNotFound(
                exe_path.display().to_string(),
            ));
        }

        let mut cmd = if cfg!(windows) {
            std::process::Command::new(&exe_path)
        } else {
            let mut cmd = std::process::Command::new(&config.wine_path);
            if let Some(prefix) = &config.wine_prefix {
                cmd.env("WINEPREFIX", prefix);
            }
            cmd.arg(&exe_path);
            cmd
        };
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit()); // Bridge diagnostics go to our stderr

        tracing::info!("Starting bridge: {:?}", cmd);
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound && !cfg!(windows) {
                BridgeError::WineNotFound
            } else {
                BridgeError::SpawnFailed(e)
            }
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(BridgeError::NotRunning);
        };

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("excel-host-bridge-reader".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(stdout);
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            if tx.send(Ok(line)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })?;

        let bridge = Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            responses: Mutex::new(rx),
            next_id: AtomicU64::new(1),
            timeout: config.timeout,
        };

        bridge.send_command(BridgeCommand::Init)?;

        Ok(bridge)
    }

    /// Send a command to the bridge and wait for its response.
    pub(crate) fn send_command(
        &self,
        command: BridgeCommand,
    ) -> Result<Option<ResponseData>, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let request = Request { id, command };
        let json = serde_json::to_string(&request)?;

        {
            let mut stdin = self
                .stdin
                .lock()
                .map_err(|_| BridgeError::SendFailed("stdin lock poisoned".into()))?;
            writeln!(stdin, "{json}").map_err(|e| BridgeError::SendFailed(e.to_string()))?;
            stdin
                .flush()
                .map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        }

        let response = self.wait_for(id)?;
        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { message } => Err(BridgeError::BridgeError(message)),
        }
    }

    fn wait_for(&self, id: u64) -> Result<Response, BridgeError> {
        let responses = self
            .responses
            .lock()
            .map_err(|_| BridgeError::ReadFailed("reader lock poisoned".into()))?;
        let deadline = Instant::now() + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let line = match responses.recv_timeout(remaining) {
                Ok(Ok(line)) => line,
                Ok(Err(e)) => return Err(BridgeError::ReadFailed(e.to_string())),
                Err(RecvTimeoutError::Timeout) => return Err(BridgeError::Timeout(self.timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(BridgeError::NotRunning),
            };

            let response: Response = serde_json::from_str(&line)?;
            if answers(&response, id) {
                return Ok(response);
            }
            tracing::debug!("Discarding stale bridge response {}", response.id);
        }
    }

    /// Tell the bridge to exit and reap it. Kills it if it does not answer.
    pub fn shutdown(&self) {
        let answered = self.send_command(BridgeCommand::Shutdown).is_ok();
        let Ok(mut child) = self.child.lock() else {
            return;
        };
        if !answered {
            tracing::warn!("Bridge did not acknowledge shutdown, killing it");
            let _ = child.kill();
        }
        let _ = child.wait();
    }

    fn is_running(&self) -> bool {
        self.child
            .lock()
            .map(|mut child| matches!(child.try_wait(), Ok(None)))
            .unwrap_or(false)
    }
}

impl Drop for ExcelBridge {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}

/// Convert a Linux filesystem path to a WINE (Windows) path.
///
/// WINE maps `/` to `Z:\`, so `/home/user/file.xlsx` becomes `Z:\home\user\file.xlsx`.
pub fn linux_to_wine_path(linux_path: &Path) -> String {
    let abs = if linux_path.is_absolute() {
        linux_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(linux_path)
    };

    format!("Z:{}", abs.display()).replace('/', "\\")
}

/// Path as the bridge process sees it.
pub(crate) fn host_path(path: &Path) -> String {
    if cfg!(windows) {
        path.display().to_string()
    } else {
        linux_to_wine_path(path)
    }
}

/// Look for the bridge exe next to the current executable, then in target/.
fn find_bridge_exe() -> PathBuf {
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        let candidate = exe.join(BRIDGE_EXE);
        if candidate.exists() {
            return candidate;
        }
    }

    for profile in ["release", "debug"] {
        let target_path = PathBuf::from(format!("target/x86_64-pc-windows-gnu/{profile}/{BRIDGE_EXE}"));
        if target_path.exists() {
            return target_path;
        }
    }

    PathBuf::from(BRIDGE_EXE)
}

/// The bridge answers a line it cannot parse with an error under id 0.
/// Only one request is in flight at a time, so that error belongs to it.
fn answers(response: &Response, pending: u64) -> bool {
    response.id == pending
        || (response.id == 0 && matches!(response.result, ResponseResult::Error { .. }))
}
