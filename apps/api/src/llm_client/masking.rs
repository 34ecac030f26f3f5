//! Masking for anything that may carry credentials or model output before it
//! reaches the logs.

/// Fixed mask placed between the visible edges, and returned alone for short input.
pub const MASK: &str = "****";

/// Number of characters kept visible at each end of the masked text.
const VISIBLE_CHARS: usize = 4;

/// Returns the first and last four characters of `text` with [`MASK`] between them.
/// Inputs shorter than eight characters collapse to the bare mask.
///
/// Works on `char`s, so multi-byte text is never split mid-codepoint.
pub fn mask_sensitive(text: &str) -> String {
    let len = text.chars().count();
    if len < VISIBLE_CHARS * 2 {
        return MASK.to_string();
    }

    let head: String = text.chars().take(VISIBLE_CHARS).collect();
    let tail: String = text.chars().skip(len - VISIBLE_CHARS).collect();
    format!("{head}{MASK}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_edges_of_long_text() {
        assert_eq!(
            mask_sensitive(r#"{"error":"invalid credentials"}"#),
            r#"{"er****ls"}"#
        );
    }

    #[test]
    fn test_mask_exactly_eight_chars() {
        assert_eq!(mask_sensitive("abcdefgh"), "abcd****efgh");
    }

    #[test]
    fn test_mask_short_text_is_fully_hidden() {
        assert_eq!(mask_sensitive("abcdefg"), MASK);
        assert_eq!(mask_sensitive("tok"), MASK);
        assert_eq!(mask_sensitive(""), MASK);
    }

    #[test]
    fn test_mask_multibyte_text() {
        assert_eq!(mask_sensitive("Ошибка доступа"), "Ошиб****тупа");
    }
}
