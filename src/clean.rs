//! Text normalization shared by the ingest and search paths.
//!
//! Cleaning collapses whitespace runs to single spaces and strips characters
//! outside a conservative allow-list: word characters, whitespace, and the
//! punctuation set `. , ! ? - : ; ( )`. Queries and documents go through the
//! same rules so their embeddings stay comparable.

const ALLOWED_PUNCTUATION: &str = ".,!?-:;()";

/// Normalize raw extracted text for chunking and embedding.
pub fn clean_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c)
            {
                c
            } else {
                ' '
            }
        })
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Best-effort page number from an inline `[Page N]` marker.
///
/// Cleaning strips the brackets, so this matches the surviving `Page N`
/// token sequence. Returns 1 when no marker is present.
pub fn page_of(text: &str) -> u32 {
    let mut rest = text;
    while let Some(pos) = rest.find("Page ") {
        let after = &rest[pos + 5..];
        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<u32>() {
            if n > 0 {
                return n;
            }
        }
        rest = after;
    }
    1
}
