//! Cooperative interruption for graceful shutdown.
//!
//! A [`CancelToken`] wraps an `AtomicBool` that Ctrl+C (or SIGTERM/SIGHUP)
//! flips to `true`. The scan checks it between files: the file in flight is
//! always finished, then progress is flushed and the run returns normally.
//! Nothing is torn down from inside the signal handler.
//!
//! ```rust,no_run
//! use uniqsort::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//! if token.is_cancelled() {
//!     println!("Stopping after the current file");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared interruption flag.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previous stop request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The underlying flag, for components that poll an `AtomicBool`.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned token.
///
/// The process-wide handler can only be registered once. Later calls (for
/// example from tests) get the already-registered token back, reset.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the handler cannot be
/// registered and none was registered earlier by this module.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let flag = token.flag();

    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Finishing the current file and saving progress..."
        );
        let _ = std::io::stderr().flush();
    })?;

    let _ = GLOBAL_TOKEN.set(token.clone());
    log::debug!("Installed interrupt handler");
    Ok(token)
}
