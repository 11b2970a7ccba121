//! Prompt assembly for commit message requests.
//!
//! Every completion request carries the same fixed instruction preamble:
//! a system message with the commit message rules and a one-shot
//! exemplar exchange, followed by the diff fragment as the final user
//! message. The preamble's token cost is computed once per run and
//! subtracted from the request budget.

use crate::ai::{ChatMessage, CompletionRequest};
use crate::i18n::Language;
use crate::tokens::{request_tokens, TokenCounter};

/// Exemplar diff shown to the model so it sees the expected input shape
/// before the real fragment arrives.
const EXAMPLE_DIFF: &str = r"diff --git a/src/server.ts b/src/server.ts
index ad4db42..f3b18a9 100644
--- a/src/server.ts
+++ b/src/server.ts
@@ -10,7 +10,7 @@
  const app = express();
 -const port = 7799;
 +const PORT = 7799;

  app.use(express.json());

@@ -34,6 +34,6 @@
  app.use(PROTECTED_ROUTER_URL, protectedRouter);

 -app.listen(port, () => {
 -  console.log(`Server listening on port ${port}`);
 +app.listen(process.env.PORT || PORT, () => {
 +  console.log(`Server listening on port ${PORT}`);
  });";

/// Fixed instruction preamble plus per-fragment request assembly.
pub struct PromptTemplate {
    preamble: Vec<ChatMessage>,
}

impl PromptTemplate {
    /// Builds the template from the run's style configuration.
    pub fn new(language: Language, emoji: bool, description: bool) -> Self {
        let emoji_rule = if emoji {
            "Use GitMoji convention to preface the commit."
        } else {
            "Do not preface the commit with anything."
        };
        let description_rule = if description {
            "Add a short description of WHY the changes are done after the commit message. Don't start it with \"This commit\", just describe the changes."
        } else {
            "Don't add any descriptions to the commit, only commit message."
        };

        let system = format!(
            "You are to act as the author of a commit message in git. Your mission is to create clean and comprehensive commit messages in the conventional commit convention and explain WHAT were the changes and WHY the changes were done. I'll send you an output of 'git diff --staged' command, and you convert it into a commit message.\n{emoji_rule}\n{description_rule}\nUse the present tense. Lines must not be longer than 74 characters. Use {language} to answer."
        );

        let mut example_reply = String::new();
        if emoji {
            example_reply.push_str("🐛 ");
        }
        example_reply.push_str(language.example_fix());
        example_reply.push('\n');
        if emoji {
            example_reply.push_str("✨ ");
        }
        example_reply.push_str(language.example_feat());
        if description {
            example_reply.push('\n');
            example_reply.push_str(language.example_description());
        }

        Self {
            preamble: vec![
                ChatMessage::system(system),
                ChatMessage::user(EXAMPLE_DIFF),
                ChatMessage::assistant(example_reply),
            ],
        }
    }

    /// Token cost of the fixed preamble, including message framing.
    pub fn preamble_tokens(&self, counter: &dyn TokenCounter) -> usize {
        request_tokens(counter, &self.preamble)
    }

    /// Wraps one diff fragment into a full completion request.
    pub fn request_for(&self, diff_fragment: &str) -> CompletionRequest {
        let mut messages = self.preamble.clone();
        messages.push(ChatMessage::user(diff_fragment));
        CompletionRequest { messages }
    }
}
