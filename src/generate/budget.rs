//! Request token budget computation.
//!
//! The budget is the maximum number of tokens one request's diff content
//! may occupy: the model context window minus everything else the
//! request must carry. Computed once per run and treated as read-only.

use anyhow::Result;

use crate::generate::error::GenerateError;

/// Minimum usable request budget in tokens.
///
/// Below this there is no room for a meaningful diff fragment and the
/// run aborts before any network call.
pub const MIN_REQUEST_BUDGET: usize = 100;

/// Fixed allowance for drift between the local token counter and the
/// tokenizer the completion service bills against.
pub const SAFETY_MARGIN_TOKENS: usize = 20;

/// Computes the maximum tokens one request's diff content may occupy.
///
/// `preamble_tokens` is the precomputed cost of the fixed instruction
/// messages that accompany every fragment.
pub fn compute_budget(
    context_limit: usize,
    reserved_completion_tokens: usize,
    preamble_tokens: usize,
    safety_margin: usize,
) -> Result<usize> {
    let budget = context_limit as i64
        - safety_margin as i64
        - preamble_tokens as i64
        - reserved_completion_tokens as i64;

    if budget < MIN_REQUEST_BUDGET as i64 {
        return Err(GenerateError::BudgetTooSmall { budget }.into());
    }

    Ok(budget as usize)
}
