//! Generation-specific error handling.

use thiserror::Error;

/// Errors raised by the decomposition layer before any network call.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The per-request budget left after fixed costs is unusably small.
    #[error("request token budget is too small ({budget} tokens): decrease the reserved completion tokens or increase the model context limit")]
    BudgetTooSmall {
        /// The computed budget, possibly negative.
        budget: i64,
    },

    /// Nothing staged to describe.
    #[error("staged diff is empty, nothing to generate a message from")]
    EmptyDiff,
}
