//! US layout tables: ASCII character to physical key resolution.
//!
//! Two immutable tables map a typeable ASCII character to the key that
//! produces it: one for characters typed bare, one for characters that need
//! shift held. The tables are disjoint by construction; a character appears
//! in at most one of them. Letters map by identity regardless of physical
//! row, digits and punctuation follow the fixed US ASCII layout.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Backend-independent identifier for one physical keyboard key.
///
/// The set is closed: letters, digits, the punctuation reachable on a US
/// layout, space/enter/tab, and both shift keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9, Num0,
    Space, Enter, Tab,
    Minus, Equal, LeftBrace, RightBrace, Backslash,
    Semicolon, Apostrophe, Grave, Comma, Dot, Slash,
    LeftShift, RightShift,
}

impl Key {
    /// Every key the layout and accent tables can ever produce, plus both
    /// shift keys. Backends declare exactly this capability set.
    pub const ALL: [Key; 52] = [
        Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H,
        Key::I, Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P,
        Key::Q, Key::R, Key::S, Key::T, Key::U, Key::V, Key::W, Key::X,
        Key::Y, Key::Z,
        Key::Num1, Key::Num2, Key::Num3, Key::Num4, Key::Num5,
        Key::Num6, Key::Num7, Key::Num8, Key::Num9, Key::Num0,
        Key::Space, Key::Enter, Key::Tab,
        Key::Minus, Key::Equal, Key::LeftBrace, Key::RightBrace,
        Key::Backslash, Key::Semicolon, Key::Apostrophe, Key::Grave,
        Key::Comma, Key::Dot, Key::Slash,
        Key::LeftShift, Key::RightShift,
    ];

    /// Linux evdev key code (input-event-codes.h). Both backends speak
    /// evdev codes on the wire, so the mapping lives on the key itself.
    pub fn code(self) -> u16 {
        match self {
            Key::A => 30,
            Key::B => 48,
            Key::C => 46,
            Key::D => 32,
            Key::E => 18,
            Key::F => 33,
            Key::G => 34,
            Key::H => 35,
            Key::I => 23,
            Key::J => 36,
            Key::K => 37,
            Key::L => 38,
            Key::M => 50,
            Key::N => 49,
            Key::O => 24,
            Key::P => 25,
            Key::Q => 16,
            Key::R => 19,
            Key::S => 31,
            Key::T => 20,
            Key::U => 22,
            Key::V => 47,
            Key::W => 17,
            Key::X => 45,
            Key::Y => 21,
            Key::Z => 44,
            Key::Num1 => 2,
            Key::Num2 => 3,
            Key::Num3 => 4,
            Key::Num4 => 5,
            Key::Num5 => 6,
            Key::Num6 => 7,
            Key::Num7 => 8,
            Key::Num8 => 9,
            Key::Num9 => 10,
            Key::Num0 => 11,
            Key::Space => 57,
            Key::Enter => 28,
            Key::Tab => 15,
            Key::Minus => 12,
            Key::Equal => 13,
            Key::LeftBrace => 26,
            Key::RightBrace => 27,
            Key::Backslash => 43,
            Key::Semicolon => 39,
            Key::Apostrophe => 40,
            Key::Grave => 41,
            Key::Comma => 51,
            Key::Dot => 52,
            Key::Slash => 53,
            Key::LeftShift => 42,
            Key::RightShift => 54,
        }
    }
}

/// Resolution result for one ASCII character: which key, and whether shift
/// must be held while it is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedKey {
    pub key: Key,
    pub shift: bool,
}

/// Characters typed without shift.
const UNSHIFTED: &[(char, Key)] = &[
    ('a', Key::A), ('b', Key::B), ('c', Key::C), ('d', Key::D),
    ('e', Key::E), ('f', Key::F), ('g', Key::G), ('h', Key::H),
    ('i', Key::I), ('j', Key::J), ('k', Key::K), ('l', Key::L),
    ('m', Key::M), ('n', Key::N), ('o', Key::O), ('p', Key::P),
    ('q', Key::Q), ('r', Key::R), ('s', Key::S), ('t', Key::T),
    ('u', Key::U), ('v', Key::V), ('w', Key::W), ('x', Key::X),
    ('y', Key::Y), ('z', Key::Z),
    ('1', Key::Num1), ('2', Key::Num2), ('3', Key::Num3), ('4', Key::Num4),
    ('5', Key::Num5), ('6', Key::Num6), ('7', Key::Num7), ('8', Key::Num8),
    ('9', Key::Num9), ('0', Key::Num0),
    (' ', Key::Space), ('\n', Key::Enter), ('\t', Key::Tab),
    ('-', Key::Minus), ('=', Key::Equal),
    ('[', Key::LeftBrace), (']', Key::RightBrace), ('\\', Key::Backslash),
    (';', Key::Semicolon), ('\'', Key::Apostrophe), ('`', Key::Grave),
    (',', Key::Comma), ('.', Key::Dot), ('/', Key::Slash),
];

/// Characters typed with shift held. Uppercase letters share key codes with
/// their lowercase entries above; the tables stay disjoint because the
/// *characters* differ.
const SHIFTED: &[(char, Key)] = &[
    ('A', Key::A), ('B', Key::B), ('C', Key::C), ('D', Key::D),
    ('E', Key::E), ('F', Key::F), ('G', Key::G), ('H', Key::H),
    ('I', Key::I), ('J', Key::J), ('K', Key::K), ('L', Key::L),
    ('M', Key::M), ('N', Key::N), ('O', Key::O), ('P', Key::P),
    ('Q', Key::Q), ('R', Key::R), ('S', Key::S), ('T', Key::T),
    ('U', Key::U), ('V', Key::V), ('W', Key::W), ('X', Key::X),
    ('Y', Key::Y), ('Z', Key::Z),
    ('!', Key::Num1), ('@', Key::Num2), ('#', Key::Num3), ('$', Key::Num4),
    ('%', Key::Num5), ('^', Key::Num6), ('&', Key::Num7), ('*', Key::Num8),
    ('(', Key::Num9), (')', Key::Num0),
    ('_', Key::Minus), ('+', Key::Equal),
    ('{', Key::LeftBrace), ('}', Key::RightBrace), ('|', Key::Backslash),
    (':', Key::Semicolon), ('"', Key::Apostrophe), ('~', Key::Grave),
    ('<', Key::Comma), ('>', Key::Dot), ('?', Key::Slash),
];

fn unshifted_map() -> &'static HashMap<char, Key> {
    static MAP: OnceLock<HashMap<char, Key>> = OnceLock::new();
    MAP.get_or_init(|| UNSHIFTED.iter().copied().collect())
}

fn shifted_map() -> &'static HashMap<char, Key> {
    static MAP: OnceLock<HashMap<char, Key>> = OnceLock::new();
    MAP.get_or_init(|| SHIFTED.iter().copied().collect())
}

/// Resolve an ASCII character to a key and shift requirement.
///
/// The unshifted table is consulted first, then the shifted one. Characters
/// in neither table have no resolution and must be reported by the caller.
pub fn resolve(ch: char) -> Option<ResolvedKey> {
    if let Some(&key) = unshifted_map().get(&ch) {
        return Some(ResolvedKey { key, shift: false });
    }
    if let Some(&key) = shifted_map().get(&ch) {
        return Some(ResolvedKey { key, shift: true });
    }
    None
}

/// Inverse of [`resolve`]: the character a key produces with or without
/// shift. Returns `None` for keys with no character on that level (the
/// shift keys themselves, or e.g. shift+space).
pub fn char_for(key: Key, shift: bool) -> Option<char> {
    let table = if shift { SHIFTED } else { UNSHIFTED };
    table.iter().find(|(_, k)| *k == key).map(|(ch, _)| *ch)
}
