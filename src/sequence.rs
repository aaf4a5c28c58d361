//! Event sequencing: one resolved character to an ordered event list.
//!
//! Every event is followed by a synchronization boundary, and shifted
//! characters are bracketed so that shift-down strictly precedes the key
//! press and shift-up strictly follows the release. Sequences are never
//! coalesced across characters: a fault mid-string loses at most one
//! partially typed character and can never leave a shift half-open.

use crate::layout::{Key, ResolvedKey};

/// One atomic key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

/// A step in a character's event sequence, as consumed by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Key(KeyEvent),
    Sync,
}

fn press(key: Key) -> Step {
    Step::Key(KeyEvent { key, pressed: true })
}

fn release(key: Key) -> Step {
    Step::Key(KeyEvent { key, pressed: false })
}

/// The exact ordered step list that types one resolved character.
///
/// Shifted: `shift↓ sync key↓ sync key↑ sync shift↑ sync`.
/// Unshifted: `key↓ sync key↑ sync`.
pub fn char_steps(resolved: ResolvedKey) -> Vec<Step> {
    let key = resolved.key;
    if resolved.shift {
        vec![
            press(Key::LeftShift),
            Step::Sync,
            press(key),
            Step::Sync,
            release(key),
            Step::Sync,
            release(Key::LeftShift),
            Step::Sync,
        ]
    } else {
        vec![press(key), Step::Sync, release(key), Step::Sync]
    }
}
