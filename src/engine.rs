//! Injection engine: decode, fold, resolve, sequence, and commit.
//!
//! One `inject` call processes one text to completion or first fatal fault.
//! Untypeable characters are absorbed into the report; backend faults abort
//! the remaining input but leave the engine usable for a fresh call (which
//! re-selects among the remaining unresolved backends).

use tracing::{debug, info, warn};

use crate::backend::{backends_from_config, Backend, BackendState};
use crate::config::Config;
use crate::error::InjectError;
use crate::layout;
use crate::sequence::{char_steps, Step};
use crate::text::decode::Codepoints;
use crate::text::fold::fold;

/// Aggregate outcome of one `inject` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    /// Characters fully typed (all events of the sequence committed).
    pub chars_typed: usize,
    /// Characters with no layout mapping, recorded and passed over.
    pub chars_skipped: usize,
    /// True when no backend was available or a backend fault aborted the
    /// remaining input.
    pub fatal: bool,
}

pub struct InjectionEngine {
    backends: Vec<Box<dyn Backend>>,
}

impl InjectionEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            backends: backends_from_config(config),
        }
    }

    /// Build an engine over an explicit backend list, bypassing config.
    pub fn with_backends(backends: Vec<Box<dyn Backend>>) -> Self {
        Self { backends }
    }

    /// First backend in preference order whose probe resolves `Ready`.
    fn select_backend(&mut self) -> Option<usize> {
        for (index, backend) in self.backends.iter_mut().enumerate() {
            match backend.probe() {
                BackendState::Ready => {
                    info!("Injecting through the '{}' backend", backend.name());
                    return Some(index);
                }
                BackendState::Unavailable => {
                    debug!("Backend '{}' is unavailable", backend.name());
                }
            }
        }
        None
    }

    /// Type `text` (a UTF-8 byte sequence, tolerantly decoded) on the first
    /// available backend.
    pub fn inject(&mut self, text: &[u8]) -> InjectionReport {
        let mut report = InjectionReport::default();

        let Some(index) = self.select_backend() else {
            warn!("{}", InjectError::NoBackendAvailable);
            report.fatal = true;
            return report;
        };
        let backend = &mut self.backends[index];

        for codepoint in Codepoints::new(text) {
            let resolved = fold(codepoint).and_then(layout::resolve);
            let Some(resolved) = resolved else {
                debug!("Skipping untypeable codepoint U+{:04X}", codepoint);
                report.chars_skipped += 1;
                continue;
            };

            for step in char_steps(resolved) {
                let result = match step {
                    Step::Key(event) => backend.submit(event),
                    Step::Sync => backend.flush_sync(),
                };
                if let Err(e) = result {
                    warn!(
                        "Injection aborted after {} characters: {}",
                        report.chars_typed, e
                    );
                    report.fatal = true;
                    return report;
                }
            }
            report.chars_typed += 1;
        }

        info!(
            "Typed {} characters, skipped {}",
            report.chars_typed, report.chars_skipped
        );
        report
    }

    pub fn inject_str(&mut self, text: &str) -> InjectionReport {
        self.inject(text.as_bytes())
    }
}
