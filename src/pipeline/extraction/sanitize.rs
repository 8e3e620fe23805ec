/// Clean text coming out of an extraction collaborator: line endings are
/// unified, control and zero-width characters removed, lines trimmed and
/// blank lines dropped. Printable punctuation and symbols are kept as-is.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| *c == '\n' || *c == '\t' || !(c.is_control() || is_invisible(*c)))
        .collect::<String>()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Zero-width and bidi-control code points that survive `is_control`.
pub(crate) fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}' | '\u{00AD}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let clean = sanitize_extracted_text("Dose: 500mg\x01\x02\x00\nDate: 2024-01-15");
        assert_eq!(clean, "Dose: 500mg\nDate: 2024-01-15");
    }

    #[test]
    fn keeps_clinical_symbols() {
        let raw = "Temp: 37.5°C, BP: 120/80 mmHg (normal); K+ 4.2 µmol/L";
        assert_eq!(sanitize_extracted_text(raw), raw);
    }

    #[test]
    fn unifies_line_endings_and_drops_blank_lines() {
        let raw = "  one \r\n\r\n two\rthree\n\n";
        assert_eq!(sanitize_extracted_text(raw), "one\ntwo\nthree");
    }

    #[test]
    fn removes_zero_width_characters() {
        assert_eq!(sanitize_extracted_text("he\u{200B}art rate\u{FEFF}"), "heart rate");
    }

    #[test]
    fn only_control_chars_returns_empty() {
        assert_eq!(sanitize_extracted_text("\x00\x01\x02"), "");
        assert_eq!(sanitize_extracted_text(""), "");
    }
}
