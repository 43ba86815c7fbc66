//! Composite keys and log redaction.

/// Delimiter joining a parent identifier and a child key.
pub const KEY_DELIMITER: &str = "__";

/// Join a parent identifier and child key into the stored composite key.
pub fn composite_key(parent: &str, child: &str) -> String {
    format!("{parent}{KEY_DELIMITER}{child}")
}

/// Split a composite key back into `(parent, child)` at the first
/// delimiter. A key without a delimiter is its own parent with an empty
/// child.
pub fn split_composite(key: &str) -> (&str, &str) {
    key.split_once(KEY_DELIMITER).unwrap_or((key, ""))
}

/// Leading characters left readable in redacted tokens.
const UNREDACTED_LEN: usize = 4;
/// Fixed output length; hides the real token length from log readers.
const REDACTED_LEN: usize = 10;

/// Censor a token before it reaches logs or error messages: the first few
/// characters are kept, the rest replaced by a fixed-length mask.
pub fn redact(token: &str) -> String {
    let keep: String = token.chars().take(UNREDACTED_LEN).collect();
    let mask = REDACTED_LEN.saturating_sub(keep.chars().count());
    format!("{keep}{}", "*".repeat(mask))
}
