//! Diff decomposition and commit message generation.
//!
//! The orchestrator turns one staged diff into one commit message. A
//! diff that fits the request budget goes out as a single completion
//! request. An oversized diff is cut at `diff --git` boundaries,
//! repacked by the [`merge`] pass, recursively broken down at hunk and
//! line granularity by the [`split`] pass, fanned out as concurrent
//! completion requests, and the partial messages are joined back in
//! original fragment order, never in arrival order.

pub mod budget;
pub mod error;
pub mod merge;
pub mod prompt;
pub mod split;

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::ai::client::CompletionClient;
use crate::generate::error::GenerateError;
use crate::generate::prompt::PromptTemplate;
use crate::tokens::TokenCounter;

/// Marker that begins a per-file section in unified diff output.
const FILE_DIFF_MARKER: &str = "diff --git ";

/// Marker that begins a hunk within a file diff.
const HUNK_MARKER: &str = "@@ ";

/// Joiner between partial commit messages.
const MESSAGE_JOINER: &str = "\n\n";

/// Default cap on concurrently in-flight completion requests.
///
/// Bounded fan-out: requests overlap, but the cap plus the client-side
/// rate limiter keeps a huge diff from firing dozens of requests at
/// once.
const DEFAULT_CONCURRENCY: usize = 4;

/// Commit message generator for staged diffs.
pub struct Generator {
    client: CompletionClient,
    counter: Arc<dyn TokenCounter>,
    template: PromptTemplate,
    budget: usize,
    concurrency: usize,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("budget", &self.budget)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Generator {
    /// Builds a generator, computing the per-request budget up front.
    ///
    /// Fails with [`GenerateError::BudgetTooSmall`] before any network
    /// call when the model's context window cannot accommodate the fixed
    /// preamble, the completion reserve, and a useful diff fragment.
    pub fn new(
        client: CompletionClient,
        counter: Arc<dyn TokenCounter>,
        template: PromptTemplate,
    ) -> Result<Self> {
        let meta = client.metadata();
        let preamble_tokens = template.preamble_tokens(counter.as_ref());
        let budget = budget::compute_budget(
            meta.context_limit,
            meta.max_completion_tokens,
            preamble_tokens,
            budget::SAFETY_MARGIN_TOKENS,
        )?;

        debug!(
            budget,
            preamble_tokens,
            context_limit = meta.context_limit,
            "computed request budget"
        );

        Ok(Self {
            client,
            counter,
            template,
            budget,
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    /// Overrides the cap on concurrently in-flight requests.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The per-request diff content budget, in tokens.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Generates a commit message for the staged diff.
    ///
    /// Any failing fragment fails the whole run; there is no
    /// partial-success mode.
    pub async fn generate(&self, diff: &str) -> Result<String> {
        if diff.trim().is_empty() {
            return Err(GenerateError::EmptyDiff.into());
        }

        if self.counter.count(diff) < self.budget {
            debug!("diff fits in a single request");
            return self.client.complete(&self.template.request_for(diff)).await;
        }

        info!(
            budget = self.budget,
            "diff exceeds the request budget, splitting by file"
        );

        let file_fragments = split_by_file_marker(diff);
        let plans: Vec<Vec<String>> = if file_fragments.is_empty() {
            // No file markers to split on; fall back to mechanical line
            // splitting of the whole diff.
            vec![split::split_fragment(
                diff,
                self.budget,
                self.counter.as_ref(),
            )]
        } else {
            merge::merge_fragments(&file_fragments, self.budget, self.counter.as_ref())
                .iter()
                .map(|fragment| {
                    if self.counter.count(fragment) >= self.budget {
                        self.decompose_file_fragment(fragment)
                    } else {
                        vec![format!("{FILE_DIFF_MARKER}{fragment}")]
                    }
                })
                .collect()
        };

        let request_count: usize = plans.iter().map(Vec::len).sum();
        debug!(
            fragments = plans.len(),
            requests = request_count,
            "dispatching fragment requests"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let futures: Vec<_> = plans
            .iter()
            .flatten()
            .map(|payload| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| anyhow::anyhow!("semaphore closed: {e}"))?;
                    self.client
                        .complete(&self.template.request_for(payload))
                        .await
                }
            })
            .collect();

        let mut results = join_all(futures).await.into_iter();

        // Fan-in: join_all keeps positional identity, so partial messages
        // regroup by fragment and join in original split order regardless
        // of completion order.
        let mut fragment_messages = Vec::with_capacity(plans.len());
        for pieces in &plans {
            let mut partials = Vec::with_capacity(pieces.len());
            for _ in pieces {
                let message = results.next().ok_or_else(|| {
                    anyhow::anyhow!("completion result missing for a dispatched fragment")
                })??;
                partials.push(message);
            }
            fragment_messages.push(partials.join(MESSAGE_JOINER));
        }

        Ok(fragment_messages.join(MESSAGE_JOINER))
    }

    /// Hunk-level decomposition of one merged file fragment that exceeds
    /// the budget.
    ///
    /// The file header is split off at the first hunk marker, hunks are
    /// repacked under the budget, and any `header + hunk-group` still too
    /// large is cut at line granularity. Every payload is re-prefixed
    /// with the file marker the file-level split removed.
    fn decompose_file_fragment(&self, fragment: &str) -> Vec<String> {
        let (header, hunks) = split_by_hunk_marker(fragment);

        if hunks.is_empty() {
            // No hunk markers to regroup by; split mechanically.
            return split::split_fragment(fragment, self.budget, self.counter.as_ref())
                .into_iter()
                .map(|piece| format!("{FILE_DIFF_MARKER}{piece}"))
                .collect();
        }

        let merged_hunks = merge::merge_fragments(&hunks, self.budget, self.counter.as_ref());

        let mut payloads = Vec::new();
        for change in &merged_hunks {
            let total = format!("{header}{change}");
            if self.counter.count(&total) > self.budget {
                debug!("hunk group exceeds the budget, splitting by line");
                for piece in split::split_fragment(&total, self.budget, self.counter.as_ref()) {
                    payloads.push(format!("{FILE_DIFF_MARKER}{piece}"));
                }
            } else {
                payloads.push(format!("{FILE_DIFF_MARKER}{total}"));
            }
        }
        payloads
    }
}

/// Splits a flat unified diff at `diff --git ` line boundaries.
///
/// Returned fragments have the marker stripped, matching how they are
/// re-prefixed when prompts are assembled. Text before the first marker
/// is dropped.
fn split_by_file_marker(diff: &str) -> Vec<String> {
    let positions = marker_positions(diff, FILE_DIFF_MARKER);

    positions
        .iter()
        .enumerate()
        .map(|(i, &pos)| {
            let end = positions.get(i + 1).copied().unwrap_or(diff.len());
            diff[pos + FILE_DIFF_MARKER.len()..end].to_string()
        })
        .collect()
}

/// Splits one file fragment at `@@ ` line boundaries into its header and
/// marker-prefixed hunks.
///
/// A fragment with no hunk markers (binary files, mode-only changes)
/// returns the whole fragment as the header and no hunks.
fn split_by_hunk_marker(fragment: &str) -> (String, Vec<String>) {
    let positions = marker_positions(fragment, HUNK_MARKER);

    if positions.is_empty() {
        return (fragment.to_string(), Vec::new());
    }

    let header = fragment[..positions[0]].to_string();
    let hunks = positions
        .iter()
        .enumerate()
        .map(|(i, &pos)| {
            let end = positions.get(i + 1).copied().unwrap_or(fragment.len());
            fragment[pos..end].to_string()
        })
        .collect();

    (header, hunks)
}

/// Finds the byte positions where `marker` starts a line in `text`.
fn marker_positions(text: &str, marker: &str) -> Vec<usize> {
    let mut positions = Vec::new();

    if text.starts_with(marker) {
        positions.push(0);
    }
    let search = format!("\n{marker}");
    let mut start = 0;
    while let Some(pos) = text[start..].find(&search) {
        // +1 to skip the newline; the section starts at the marker.
        positions.push(start + pos + 1);
        start += pos + 1;
    }

    positions
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ai::error::CompletionError;
    use crate::ai::test_utils::{CallLogHandle, ScriptedApi};
    use crate::generate::budget::SAFETY_MARGIN_TOKENS;
    use crate::i18n::Language;

    /// Exact counter: one token per byte.
    struct ByteTokens;

    impl TokenCounter for ByteTokens {
        fn count(&self, text: &str) -> usize {
            text.len()
        }
    }

    const RESERVED_COMPLETION_TOKENS: usize = 500;

    /// Builds a generator whose request budget is exactly `budget`.
    fn make_generator(api: ScriptedApi, budget: usize) -> (Generator, CallLogHandle) {
        let calls = api.call_log();
        let counter = Arc::new(ByteTokens);
        let template = PromptTemplate::new(Language::En, false, false);
        let preamble = template.preamble_tokens(&ByteTokens);
        let context_limit =
            budget + SAFETY_MARGIN_TOKENS + preamble + RESERVED_COMPLETION_TOKENS;
        let api = api.with_limits(context_limit, RESERVED_COMPLETION_TOKENS);
        let client = CompletionClient::new(Box::new(api), counter.clone());
        let generator = Generator::new(client, counter, template).unwrap();
        assert_eq!(generator.budget(), budget);
        (generator, calls)
    }

    /// Builds a file fragment (marker already stripped) of exactly `len`
    /// bytes, ending in a newline.
    fn file_fragment(name: &str, len: usize) -> String {
        let header = format!("a/{name} b/{name}\n");
        let body = "x".repeat(len - header.len() - 1);
        format!("{header}{body}\n")
    }

    // ── scanners ───────────────────────────────────────────────

    #[test]
    fn file_marker_split_drops_marker_and_preserves_order() {
        let diff = "diff --git a/a b/a\n+one\ndiff --git a/b b/b\n+two\n";
        let fragments = split_by_file_marker(diff);
        assert_eq!(
            fragments,
            vec!["a/a b/a\n+one\n".to_string(), "a/b b/b\n+two\n".to_string()]
        );
    }

    #[test]
    fn file_marker_split_ignores_mid_line_text() {
        let diff = "diff --git a/a b/a\n+mentions diff --git in a line\n";
        let fragments = split_by_file_marker(diff);
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn file_marker_split_without_markers_is_empty() {
        assert!(split_by_file_marker("no markers here\n").is_empty());
    }

    #[test]
    fn hunk_split_separates_header_from_hunks() {
        let fragment = "a/f b/f\nindex 1..2\n@@ -1 +1 @@\n+x\n@@ -5 +5 @@\n+y\n";
        let (header, hunks) = split_by_hunk_marker(fragment);
        assert_eq!(header, "a/f b/f\nindex 1..2\n");
        assert_eq!(hunks, vec!["@@ -1 +1 @@\n+x\n", "@@ -5 +5 @@\n+y\n"]);
    }

    #[test]
    fn hunk_split_without_hunks_returns_header_only() {
        let fragment = "a/img.png b/img.png\nBinary files differ\n";
        let (header, hunks) = split_by_hunk_marker(fragment);
        assert_eq!(header, fragment);
        assert!(hunks.is_empty());
    }

    // ── orchestration ──────────────────────────────────────────

    #[tokio::test]
    async fn small_diff_issues_exactly_one_request() {
        let api = ScriptedApi::new(vec![Ok("feat: add main entry point".to_string())]);
        let (generator, calls) = make_generator(api, 2000);

        let diff = "diff --git a/a.rs b/a.rs\n+fn main() {}\n";
        let message = generator.generate(diff).await.unwrap();

        assert_eq!(message, "feat: add main entry point");
        assert_eq!(calls.payloads(), vec![diff.to_string()]);
    }

    #[tokio::test]
    async fn empty_diff_is_rejected_without_requests() {
        let api = ScriptedApi::new(vec![]);
        let (generator, calls) = make_generator(api, 2000);

        let err = generator.generate("  \n ").await.unwrap_err();
        let err = err.downcast::<GenerateError>().unwrap();
        assert!(matches!(err, GenerateError::EmptyDiff));
        assert_eq!(calls.count(), 0);
    }

    #[tokio::test]
    async fn oversized_diff_merges_files_and_requests_in_file_order() {
        // Fragments of 1500, 200 and 300 tokens with a budget of 1600:
        // the first stays alone, the second and third repack together.
        let api = ScriptedApi::new(vec![
            Ok("refactor: rework parser".to_string()),
            Ok("test: cover edge cases".to_string()),
        ]);
        let (generator, calls) = make_generator(api, 1600);

        let f1 = file_fragment("one.rs", 1500);
        let f2 = file_fragment("two.rs", 200);
        let f3 = file_fragment("three.rs", 300);
        let diff = format!("diff --git {f1}diff --git {f2}diff --git {f3}");

        let message = generator.generate(&diff).await.unwrap();

        assert_eq!(message, "refactor: rework parser\n\ntest: cover edge cases");
        assert_eq!(
            calls.payloads(),
            vec![
                format!("diff --git {f1}"),
                format!("diff --git {f2}{f3}"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn join_order_is_independent_of_completion_order() {
        // Completions resolve in reverse dispatch order; the joined
        // message must still follow file order.
        let api = ScriptedApi::with_delays(vec![
            (Duration::from_millis(300), Ok("first".to_string())),
            (Duration::from_millis(200), Ok("second".to_string())),
            (Duration::from_millis(100), Ok("third".to_string())),
        ]);
        let (generator, _calls) = make_generator(api, 300);

        let f1 = file_fragment("a.rs", 250);
        let f2 = file_fragment("b.rs", 250);
        let f3 = file_fragment("c.rs", 250);
        let diff = format!("diff --git {f1}diff --git {f2}diff --git {f3}");

        let message = generator.generate(&diff).await.unwrap();
        assert_eq!(message, "first\n\nsecond\n\nthird");
    }

    #[tokio::test]
    async fn oversized_file_fragment_splits_by_hunk() {
        let api = ScriptedApi::new(vec![
            Ok("fix: first hunk".to_string()),
            Ok("fix: second hunk".to_string()),
        ]);
        let (generator, calls) = make_generator(api, 150);

        let header = "a/big.rs b/big.rs\n";
        let hunk1 = format!("@@ -1 +1 @@\n+{}\n", "x".repeat(85));
        let hunk2 = format!("@@ -9 +9 @@\n+{}\n", "y".repeat(85));
        let diff = format!("diff --git {header}{hunk1}{hunk2}");

        let message = generator.generate(&diff).await.unwrap();

        assert_eq!(message, "fix: first hunk\n\nfix: second hunk");
        let payloads = calls.payloads();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0], format!("diff --git {header}{hunk1}"));
        assert_eq!(payloads[1], format!("diff --git {header}{hunk2}"));
    }

    #[tokio::test]
    async fn diff_without_markers_falls_back_to_line_splitting() {
        let api = ScriptedApi::new(vec![
            Ok("chore: part one".to_string()),
            Ok("chore: part two".to_string()),
        ]);
        let (generator, calls) = make_generator(api, 120);

        // Four 50-byte lines: pairs of lines pack to 101 tokens, so the
        // 203-token diff becomes exactly two pieces.
        let lines: Vec<String> = (0..4).map(|_| format!("+{}", "z".repeat(49))).collect();
        let diff = lines.join("\n");
        assert!(diff.len() >= 120);

        let message = generator.generate(&diff).await.unwrap();
        assert_eq!(message, "chore: part one\n\nchore: part two");
        assert_eq!(calls.count(), 2);
    }

    #[tokio::test]
    async fn empty_completion_fails_the_whole_run() {
        let api = ScriptedApi::new(vec![
            Ok("feat: good fragment".to_string()),
            Err(CompletionError::EmptyMessage),
        ]);
        let (generator, _calls) = make_generator(api, 300);

        let f1 = file_fragment("a.rs", 250);
        let f2 = file_fragment("b.rs", 250);
        let diff = format!("diff --git {f1}diff --git {f2}");

        let err = generator.generate(&diff).await.unwrap_err();
        let err = err.downcast::<CompletionError>().unwrap();
        assert!(matches!(err, CompletionError::EmptyMessage));
    }

    #[tokio::test]
    async fn serialized_fan_out_still_preserves_order() {
        let api = ScriptedApi::new(vec![
            Ok("one".to_string()),
            Ok("two".to_string()),
        ]);
        let (generator, _calls) = make_generator(api, 300);
        let generator = generator.with_concurrency(1);

        let f1 = file_fragment("a.rs", 250);
        let f2 = file_fragment("b.rs", 250);
        let diff = format!("diff --git {f1}diff --git {f2}");

        let message = generator.generate(&diff).await.unwrap();
        assert_eq!(message, "one\n\ntwo");
    }

    #[tokio::test]
    async fn budget_too_small_fails_before_any_request() {
        let api = ScriptedApi::new(vec![]).with_limits(600, 500);
        let calls = api.call_log();
        let counter = Arc::new(ByteTokens);
        let template = PromptTemplate::new(Language::En, false, false);
        let client = CompletionClient::new(Box::new(api), counter.clone());

        let err = Generator::new(client, counter, template).unwrap_err();
        let err = err.downcast::<GenerateError>().unwrap();
        assert!(matches!(err, GenerateError::BudgetTooSmall { .. }));
        assert_eq!(calls.count(), 0);
    }
}
