//! Line-then-character splitting of oversized diff fragments.

use crate::tokens::TokenCounter;

/// Token cost charged for the newline joining a line onto a buffer.
const LINE_JOINER_TOKENS: usize = 1;

/// Cuts an oversized fragment into pieces that each fit `max_tokens`.
///
/// Works at line granularity: lines accumulate into a buffer until
/// adding one more would exceed the budget, at which point the buffer is
/// flushed as a piece. A single line that alone exceeds the budget is
/// cut into `max_tokens`-character sub-lines, each emitted as its own
/// piece; at that granularity character count stands in for token count,
/// a deliberate last-resort imprecision for pathological lines.
///
/// Output order equals input line order, and for inputs without
/// pathological lines, rejoining the pieces with `"\n"` reproduces the
/// fragment.
pub fn split_fragment(
    fragment: &str,
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buffer: Option<String> = None;

    for line in fragment.split('\n') {
        let mut line = line;

        // Last-resort character split for a single pathological line. The
        // pending buffer flushes first so output order follows line order.
        while !line.is_empty() && counter.count(line) > max_tokens {
            if let Some(buf) = buffer.take() {
                if !buf.is_empty() {
                    pieces.push(buf);
                }
            }
            let (head, tail) = split_at_chars(line, max_tokens);
            pieces.push(head.to_string());
            line = tail;
        }

        buffer = match buffer.take() {
            None => Some(line.to_string()),
            Some(mut buf)
                if counter.count(&buf) + counter.count(line) + LINE_JOINER_TOKENS
                    <= max_tokens =>
            {
                buf.push('\n');
                buf.push_str(line);
                Some(buf)
            }
            Some(buf) => {
                pieces.push(buf);
                Some(line.to_string())
            }
        };
    }

    if let Some(buf) = buffer {
        if !buf.is_empty() {
            pieces.push(buf);
        }
    }

    pieces
}

/// Splits `s` after `chars` characters, respecting UTF-8 boundaries.
fn split_at_chars(s: &str, chars: usize) -> (&str, &str) {
    match s.char_indices().nth(chars) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}
