//! Best-effort accent folding.
//!
//! Maps common accented Latin codepoints to a plain ASCII letter so they can
//! be typed on a US layout. This is a lossy transliteration, not Unicode
//! normalization: codepoints outside the table and outside ASCII are
//! untypeable.

/// Accent folding table, case-preserving.
const ACCENT_FOLD: &[(u32, char)] = &[
    // Lowercase letters
    (0x00E0, 'a'), // à
    (0x00E1, 'a'), // á
    (0x00E2, 'a'), // â
    (0x00E3, 'a'), // ã
    (0x00E4, 'a'), // ä
    (0x00E5, 'a'), // å
    (0x00E8, 'e'), // è
    (0x00E9, 'e'), // é
    (0x00EA, 'e'), // ê
    (0x00EB, 'e'), // ë
    (0x00EC, 'i'), // ì
    (0x00ED, 'i'), // í
    (0x00EE, 'i'), // î
    (0x00EF, 'i'), // ï
    (0x00F2, 'o'), // ò
    (0x00F3, 'o'), // ó
    (0x00F4, 'o'), // ô
    (0x00F5, 'o'), // õ
    (0x00F6, 'o'), // ö
    (0x00F8, 'o'), // ø
    (0x00F9, 'u'), // ù
    (0x00FA, 'u'), // ú
    (0x00FB, 'u'), // û
    (0x00FC, 'u'), // ü
    (0x00F1, 'n'), // ñ
    (0x00E7, 'c'), // ç
    (0x00FF, 'y'), // ÿ
    (0x00FD, 'y'), // ý
    (0x00E6, 'a'), // æ, folded to a single letter
    (0x0153, 'o'), // œ, folded to a single letter
    // Uppercase letters
    (0x00C0, 'A'),
    (0x00C1, 'A'),
    (0x00C2, 'A'),
    (0x00C3, 'A'),
    (0x00C4, 'A'),
    (0x00C5, 'A'),
    (0x00C8, 'E'),
    (0x00C9, 'E'),
    (0x00CA, 'E'),
    (0x00CB, 'E'),
    (0x00CC, 'I'),
    (0x00CD, 'I'),
    (0x00CE, 'I'),
    (0x00CF, 'I'),
    (0x00D2, 'O'),
    (0x00D3, 'O'),
    (0x00D4, 'O'),
    (0x00D5, 'O'),
    (0x00D6, 'O'),
    (0x00D8, 'O'),
    (0x00D9, 'U'),
    (0x00DA, 'U'),
    (0x00DB, 'U'),
    (0x00DC, 'U'),
    (0x00D1, 'N'),
    (0x00C7, 'C'),
    (0x00DD, 'Y'),
    (0x00C6, 'A'), // Æ
    (0x0152, 'O'), // Œ
];

/// Fold a codepoint to a typeable ASCII character.
///
/// Lookup order: exact match in the accent table, then ASCII passthrough.
/// Returns `None` for everything else; the caller decides how to report the
/// untypeable character.
pub fn fold(codepoint: u32) -> Option<char> {
    if let Some((_, ascii)) = ACCENT_FOLD.iter().find(|(cp, _)| *cp == codepoint) {
        return Some(*ascii);
    }

    if codepoint < 128 {
        // Safe: every value below 128 is a valid char.
        return char::from_u32(codepoint);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(fold('a' as u32), Some('a'));
        assert_eq!(fold('Z' as u32), Some('Z'));
        assert_eq!(fold('!' as u32), Some('!'));
        assert_eq!(fold(' ' as u32), Some(' '));
    }

    #[test]
    fn test_lowercase_accents_fold() {
        for (cp, expected) in [
            (0x00E9, 'e'), // é
            (0x00E0, 'a'), // à
            (0x00F1, 'n'), // ñ
            (0x00E7, 'c'), // ç
            (0x00FC, 'u'), // ü
            (0x00EF, 'i'), // ï
            (0x00F8, 'o'), // ø
            (0x00FF, 'y'), // ÿ
        ] {
            assert_eq!(fold(cp), Some(expected), "U+{:04X}", cp);
        }
    }

    #[test]
    fn test_uppercase_accents_fold_case_preserved() {
        for (cp, expected) in [
            (0x00C9, 'E'), // É
            (0x00C5, 'A'), // Å
            (0x00D1, 'N'), // Ñ
            (0x00C7, 'C'), // Ç
            (0x00DC, 'U'), // Ü
            (0x00DD, 'Y'), // Ý
        ] {
            assert_eq!(fold(cp), Some(expected), "U+{:04X}", cp);
        }
    }

    #[test]
    fn test_ligatures_fold() {
        assert_eq!(fold(0x00E6), Some('a')); // æ
        assert_eq!(fold(0x0153), Some('o')); // œ
        assert_eq!(fold(0x00C6), Some('A')); // Æ
        assert_eq!(fold(0x0152), Some('O')); // Œ
    }

    #[test]
    fn test_every_table_entry_folds_to_documented_letter() {
        for (cp, expected) in ACCENT_FOLD {
            assert_eq!(fold(*cp), Some(*expected), "U+{:04X}", cp);
            assert!(expected.is_ascii_alphabetic());
        }
    }

    #[test]
    fn test_unmapped_codepoints_are_untypeable() {
        assert_eq!(fold(0x20AC), None); // €
        assert_eq!(fold(0x4F60), None); // 你
        assert_eq!(fold(0x1F30D), None); // 🌍
        assert_eq!(fold(0x00DF), None); // ß has no single-letter fold
    }

    #[test]
    fn test_zero_codepoint_passes_through_as_nul() {
        // Decoder error recovery yields codepoint 0; it passes through here
        // and is rejected later by the layout resolver.
        assert_eq!(fold(0), Some('\0'));
    }
}
