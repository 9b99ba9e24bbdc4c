//! Overlapping text chunker.
//!
//! Splits cleaned document text into chunks no longer than `max_chars`,
//! preferring natural boundaries in priority order: paragraph break, line
//! break, sentence-ending punctuation, whitespace, hard character cut.
//! Each chunk after the first starts with the tail of its predecessor
//! (`overlap_chars` bytes) so local context survives chunk boundaries.
//!
//! Splitting is a pure function: with zero overlap, concatenating the
//! returned chunks reproduces the input exactly.

/// Separator levels, coarsest first. Splitting falls through to the next
/// level only when a unit still exceeds `max_chars`.
const SEPARATOR_LEVELS: usize = 4;

#[derive(Debug, Clone)]
pub struct Chunker {
    max_chars: usize,
    overlap_chars: usize,
}

impl Chunker {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        debug_assert!(max_chars > 0);
        debug_assert!(overlap_chars < max_chars);
        Self {
            max_chars,
            overlap_chars,
        }
    }

    /// Split `text` into an ordered sequence of chunk strings.
    /// Empty or whitespace-only input yields an empty sequence.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let pieces = self.split_recursive(text, 0);
        self.merge(pieces)
    }

    fn split_recursive(&self, text: &str, level: usize) -> Vec<String> {
        if text.len() <= self.max_chars {
            return vec![text.to_string()];
        }
        if level >= SEPARATOR_LEVELS {
            return hard_cut(text, self.max_chars);
        }

        let parts = split_level(text, level);
        if parts.len() <= 1 {
            return self.split_recursive(text, level + 1);
        }

        let mut out = Vec::new();
        for part in parts {
            if part.len() > self.max_chars {
                out.extend(self.split_recursive(part, level + 1));
            } else {
                out.push(part.to_string());
            }
        }
        out
    }

    /// Greedily merge pieces into chunks up to `max_chars`, carrying the
    /// overlap tail of each flushed chunk into the next buffer.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buf = String::new();

        for piece in pieces {
            if !buf.is_empty() && buf.len() + piece.len() > self.max_chars {
                chunks.push(buf.clone());
                let mut tail = suffix_chars(&buf, self.overlap_chars).to_string();
                // The tail yields to the piece when both cannot fit.
                if tail.len() + piece.len() > self.max_chars {
                    let keep = self.max_chars.saturating_sub(piece.len());
                    tail = suffix_chars(&tail, keep).to_string();
                }
                buf = tail;
            }
            buf.push_str(&piece);
        }

        if !buf.trim().is_empty() {
            chunks.push(buf);
        }
        chunks
    }
}

fn split_level(text: &str, level: usize) -> Vec<&str> {
    match level {
        0 => text.split_inclusive("\n\n").collect(),
        1 => text.split_inclusive('\n').collect(),
        2 => text.split_inclusive(['.', '!', '?']).collect(),
        _ => text.split_inclusive(' ').collect(),
    }
}

/// Cut at `max` byte boundaries, backing up to the nearest char boundary.
fn hard_cut(text: &str, max: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + max).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // max is smaller than one UTF-8 char; take the whole char.
            end = start + 1;
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        out.push(text[start..end].to_string());
        start = end;
    }
    out
}

/// The last `n` bytes of `text`, aligned forward to a char boundary.
fn suffix_chars(text: &str, n: usize) -> &str {
    if n == 0 || text.is_empty() {
        return "";
    }
    let mut start = text.len().saturating_sub(n);
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
