//! Host acquisition: attach to a running application or start a new one.

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::host::{AppFlag, HostFactory, SpreadsheetHost};

/// Flags driven together by debug mode, in the order they are applied.
const DEBUG_FLAGS: [AppFlag; 3] = [
    AppFlag::DisplayAlerts,
    AppFlag::Visible,
    AppFlag::ScreenUpdating,
];

/// Obtains a ready-to-use host from a [`HostFactory`].
pub struct HostConnector<F> {
    factory: F,
    caption: String,
    debug_mode: bool,
}

impl<F: HostFactory> HostConnector<F> {
    pub fn new(factory: F, config: &SessionConfig) -> Self {
        Self {
            factory,
            caption: config.caption.clone(),
            debug_mode: config.debug_mode,
        }
    }

    /// Get a host and apply the debug-mode policy to it.
    ///
    /// With `prefer_new` a new application is always started. Otherwise a
    /// running one is attached to first, falling back to starting one.
    /// Fails with [`Error::HostUnavailable`] when no host can be produced.
    /// A host whose flags cannot be set is told to quit before the error is
    /// returned.
    pub fn acquire(&mut self, prefer_new: bool) -> Result<F::Host> {
        let mut host = self.connect(prefer_new)?;
        if let Err(e) = apply_debug_mode(&mut host, self.debug_mode) {
            tracing::warn!("Configuring the host failed ({e}), quitting it");
            abandon(&mut host);
            return Err(e);
        }
        Ok(host)
    }

    /// Get a host without touching its flags.
    pub fn connect(&mut self, prefer_new: bool) -> Result<F::Host> {
        let mut host = if prefer_new {
            self.create()?
        } else {
            match self.factory.try_attach() {
                Ok(Some(host)) => {
                    tracing::info!("Attached to running spreadsheet host");
                    host
                }
                Ok(None) => {
                    tracing::debug!("No running spreadsheet host, starting a new one");
                    self.create()?
                }
                Err(e) => {
                    tracing::warn!("Attaching to a running host failed ({e}), starting a new one");
                    self.create()?
                }
            }
        };

        match host.version() {
            Ok(version) => tracing::info!("Spreadsheet host version {version}"),
            Err(e) => tracing::debug!("Could not read host version: {e}"),
        }
        Ok(host)
    }

    fn create(&mut self) -> Result<F::Host> {
        let host = self.factory.create_new(&self.caption).map_err(|e| match e {
            Error::HostUnavailable(_) => e,
            other => Error::HostUnavailable(other.to_string()),
        })?;
        tracing::info!("Started new spreadsheet host \"{}\"", self.caption);
        Ok(host)
    }
}

/// Best-effort quit of a host that will not be handed out.
fn abandon<H: SpreadsheetHost + ?Sized>(host: &mut H) {
    if let Err(e) = host.quit() {
        tracing::warn!("Quit failed: {e}");
    }
    if let Err(e) = host.release_references() {
        tracing::debug!("Releasing host references failed: {e}");
    }
}

/// Debug mode on: visible, alerts shown, screen redrawn. Off: all suppressed.
pub fn apply_debug_mode<H: SpreadsheetHost + ?Sized>(host: &mut H, on: bool) -> Result<()> {
    for flag in DEBUG_FLAGS {
        set_flag_if_changed(host, flag, on)?;
    }
    Ok(())
}

/// Write a flag only when its current value differs.
pub fn set_flag_if_changed<H: SpreadsheetHost + ?Sized>(
    host: &mut H,
    flag: AppFlag,
    value: bool,
) -> Result<()> {
    if host.flag(flag)? != value {
        tracing::debug!("Setting {} = {value}", flag.property_name());
        host.set_flag(flag, value)?;
    }
    Ok(())
}
