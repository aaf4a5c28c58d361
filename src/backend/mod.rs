//! Injection backends: capabilities that commit key events to the host.
//!
//! A backend starts unprobed, and the first [`Backend::probe`] resolves it
//! to `Ready` (it acquired its device or session) or `Unavailable`
//! (terminal for this process run; probing again returns the cached state
//! without re-attempting). A `Ready` backend owns exactly one underlying
//! handle, released when the backend is dropped.

pub mod eis;
pub mod uinput;

use crate::config::Config;
use crate::error::InjectError;
use crate::sequence::KeyEvent;
use tracing::warn;

/// Terminal probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Ready,
    Unavailable,
}

/// A sink for ordered key events.
///
/// `submit` must preserve submission order exactly; `flush_sync` emits an
/// explicit synchronization boundary. Both block until the write completes
/// or fails, and a failure after `Ready` is a protocol error that aborts
/// the current injection.
pub trait Backend {
    fn name(&self) -> &'static str;

    fn probe(&mut self) -> BackendState;

    fn submit(&mut self, event: KeyEvent) -> Result<(), InjectError>;

    fn flush_sync(&mut self) -> Result<(), InjectError>;
}

/// Instantiate backends in the configured preference order. Unknown names
/// are logged and skipped rather than rejected, so a config written for a
/// newer build still works.
pub fn backends_from_config(config: &Config) -> Vec<Box<dyn Backend>> {
    let mut backends: Vec<Box<dyn Backend>> = Vec::new();
    for name in &config.backend.order {
        match name.as_str() {
            "uinput" => backends.push(Box::new(uinput::UinputBackend::new(config))),
            "eis" => backends.push(Box::new(eis::EisBackend::new(config))),
            other => warn!("Unknown backend '{}' in config, skipping", other),
        }
    }
    backends
}
