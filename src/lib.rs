//! Synthetic keyboard text injection for Linux.
//!
//! Takes a UTF-8 byte sequence and types it as synthetic key events:
//! tolerant codepoint decoding, accent folding to a US layout, shift-aware
//! key resolution, and deterministic event sequencing committed through the
//! first available backend (a kernel uinput virtual keyboard, or an EIS
//! compositor session).

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod sequence;
pub mod text;

pub use backend::{Backend, BackendState};
pub use config::{load_config, load_config_from, Config};
pub use engine::{InjectionEngine, InjectionReport};
pub use error::InjectError;
pub use layout::{Key, ResolvedKey};
pub use sequence::{KeyEvent, Step};
