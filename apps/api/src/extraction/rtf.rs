//! Minimal RTF to plain text conversion.
//!
//! Handles what resumes exported from word processors actually contain: groups,
//! control words, ignorable destinations (`\*`, font/colour tables, metadata),
//! `\'hh` escapes (decoded as Latin-1) and `\uN` unicode escapes with their
//! `\ucN` fallback characters.

/// Destinations whose content is never document text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "headerl",
    "headerr",
    "footerl",
    "footerr",
    "footnote",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "themedata",
    "colorschememapping",
    "latentstyles",
    "datastore",
    "object",
    "fldinst",
    "xmlnstbl",
];

struct Writer {
    out: String,
    skipping: bool,
    /// Fallback characters still to drop after a `\uN` escape.
    pending_fallback: usize,
}

impl Writer {
    fn emit(&mut self, ch: char) {
        if self.skipping {
            return;
        }
        if self.pending_fallback > 0 {
            self.pending_fallback -= 1;
            return;
        }
        self.out.push(ch);
    }
}

pub fn rtf_to_text(input: &str) -> String {
    let mut writer = Writer {
        out: String::with_capacity(input.len() / 2),
        skipping: false,
        pending_fallback: 0,
    };
    let mut groups: Vec<(bool, usize)> = Vec::new();
    let mut unicode_fallback = 1usize;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => groups.push((writer.skipping, unicode_fallback)),
            '}' => {
                let (skipping, fallback) = groups.pop().unwrap_or((false, 1));
                writer.skipping = skipping;
                unicode_fallback = fallback;
            }
            '\r' | '\n' => {}
            '\\' => match chars.peek().copied() {
                Some(ch @ ('\\' | '{' | '}')) => {
                    chars.next();
                    writer.emit(ch);
                }
                Some('\'') => {
                    chars.next();
                    let hex: String = chars.by_ref().take(2).collect();
                    if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                        writer.emit(char::from(byte));
                    }
                }
                Some('*') => {
                    chars.next();
                    writer.skipping = true;
                }
                Some('~') => {
                    chars.next();
                    writer.emit(' ');
                }
                Some('_') => {
                    chars.next();
                    writer.emit('-');
                }
                Some('-') => {
                    chars.next();
                }
                Some('\r' | '\n') => {
                    chars.next();
                    writer.emit('\n');
                }
                Some(ch) if ch.is_ascii_alphabetic() => {
                    let mut word = String::new();
                    while let Some(&ch) = chars.peek() {
                        if !ch.is_ascii_alphabetic() {
                            break;
                        }
                        word.push(ch);
                        chars.next();
                    }

                    let mut digits = String::new();
                    if chars.peek() == Some(&'-') {
                        digits.push('-');
                        chars.next();
                    }
                    while let Some(&ch) = chars.peek() {
                        if !ch.is_ascii_digit() {
                            break;
                        }
                        digits.push(ch);
                        chars.next();
                    }
                    let param = digits.parse::<i32>().ok();

                    // A single space delimits the control word and is not text.
                    if chars.peek() == Some(&' ') {
                        chars.next();
                    }

                    control_word(&mut writer, &mut unicode_fallback, &word, param);
                }
                _ => {}
            },
            other => writer.emit(other),
        }
    }

    writer.out
}

fn control_word(writer: &mut Writer, unicode_fallback: &mut usize, word: &str, param: Option<i32>) {
    match word {
        "par" | "line" | "row" | "sect" | "page" => writer.emit('\n'),
        "tab" | "cell" => writer.emit('\t'),
        "emdash" => writer.emit('\u{2014}'),
        "endash" => writer.emit('\u{2013}'),
        "bullet" => writer.emit('\u{2022}'),
        "lquote" => writer.emit('\u{2018}'),
        "rquote" => writer.emit('\u{2019}'),
        "ldblquote" => writer.emit('\u{201C}'),
        "rdblquote" => writer.emit('\u{201D}'),
        "uc" => *unicode_fallback = param.and_then(|n| usize::try_from(n).ok()).unwrap_or(1),
        "u" => {
            if let Some(code) = param {
                // Code points above 32767 are written as negative 16-bit values.
                let code = if code < 0 { code + 65_536 } else { code };
                if let Some(ch) = u32::try_from(code).ok().and_then(char::from_u32) {
                    writer.emit(ch);
                }
                if !writer.skipping {
                    writer.pending_fallback = *unicode_fallback;
                }
            }
        }
        w if SKIPPED_DESTINATIONS.contains(&w) => writer.skipping = true,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tables_and_formatting() {
        let rtf = r"{\rtf1\ansi{\fonttbl\f0\fswiss Helvetica;}\f0\pard Hello {\b World}!\par Second line\par}";
        assert_eq!(rtf_to_text(rtf), "Hello World!\nSecond line\n");
    }

    #[test]
    fn test_decodes_unicode_escapes_and_skips_fallback() {
        let rtf = r"{\rtf1\uc1 \u1055?\u1088?\u1080?\u1074?\u1077?\u1090?}";
        assert_eq!(rtf_to_text(rtf), "Привет");
    }

    #[test]
    fn test_decodes_hex_escapes() {
        assert_eq!(rtf_to_text(r"{\rtf1 caf\'e9}"), "café");
    }

    #[test]
    fn test_ignorable_destination_is_skipped() {
        let rtf = r"{\rtf1 Name{\*\generator Riched20 10.0;} Surname}";
        assert_eq!(rtf_to_text(rtf), "Name Surname");
    }

    #[test]
    fn test_escaped_braces_and_backslash() {
        assert_eq!(rtf_to_text(r"{\rtf1 a\{b\}c\\d}"), r"a{b}c\d");
    }
}
