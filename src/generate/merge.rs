//! Greedy repacking of diff fragments under a token ceiling.

use crate::tokens::TokenCounter;

/// Merges consecutive fragments into fewer, larger fragments without
/// exceeding `max_tokens`, to minimize request count.
///
/// Greedy left-to-right accumulation: a piece joins the running fragment
/// while the concatenation stays within budget, otherwise the running
/// fragment is emitted and the piece starts a new one. Input order is
/// preserved and pieces are concatenated verbatim, so joining the output
/// reproduces the joined input. A single piece that alone exceeds
/// `max_tokens` is emitted standalone; breaking it down further is the
/// splitter's job.
///
/// This never issues a completion call. It repacks strings by token
/// length, not by semantic content.
pub fn merge_fragments(
    fragments: &[String],
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> Vec<String> {
    let mut merged = Vec::new();
    let mut running = String::new();

    for piece in fragments {
        if running.is_empty() {
            running.push_str(piece);
            continue;
        }

        let candidate = format!("{running}{piece}");
        if counter.count(&candidate) <= max_tokens {
            running = candidate;
        } else {
            merged.push(std::mem::take(&mut running));
            running.push_str(piece);
        }
    }

    if !running.is_empty() {
        merged.push(running);
    }

    merged
}
