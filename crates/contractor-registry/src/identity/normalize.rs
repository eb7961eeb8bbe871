//! Name normalization shared by alias keys, canonical comparisons, clustering and
//! conflict checks. Every comparison in the crate goes through [`normalize_name`].

/// Case-fold, trim and flatten punctuation so that `"Acme Pty. Ltd"` and
/// `"ACME PTY LTD"` share one key.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else if ch == '&' {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("and");
            pending_space = true;
        } else if ch.is_whitespace() || matches!(ch, '-' | '/' | '_') {
            pending_space = true;
        }
    }

    out
}
