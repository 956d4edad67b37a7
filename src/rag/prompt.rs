//! Prompt construction for the generative model

use super::models::Profile;
use super::token_estimator::TokenEstimator;
use crate::config::Config;
use crate::generation::ChatMessage;
use crate::vector_db::ScoredDocument;
use tracing::warn;

/// Placeholder for fields a document does not carry
const NO_VALUE: &str = "NO VALUE";

pub const NO_RESULTS_FOUND: &str = "No relevant information found in our knowledge database.";

const CI_SYSTEM_PROMPT: &str = r#"# Purpose
You are a Continuous Integration (CI) assistant. You help engineers diagnose CI
failures, find their root cause and propose fixes. Decline requests that are not
about CI failures.

## Instructions
1. When the user describes a CI failure, answer with:
**Root Cause of the Failure:**
<why the failure happened>

**Steps to Resolve:**
<steps that could fix it>

2. When the user does not describe a CI failure, explain your purpose and ask
for a failure description or log excerpt.

Keep answers concise and accurate. Use bullet points where they help.

## Knowledge base data
Each retrieved passage looks like:

---
kind: <section of the source ticket, e.g. comment, summary, description>
text: <content of that section, possibly in Jira markup>
score: <similarity to the user input>
components: <software components related to the ticket>
---

Other fields such as url or collection may follow. Missing values are written as
"NO VALUE". When nothing relevant was found you will see "No relevant information
found in our knowledge database."; then fall back to general CI triage: rule out
job misconfiguration, then infrastructure problems, then product or operator bugs,
and suggest filing a ticket.
"#;

const RCA_SYSTEM_PROMPT_SUFFIX: &str = r#"
## Tempest failures
The user input is a single failing Tempest test: its name followed by the end of
its traceback. Name the failing operation, the most likely root cause and the
component responsible.
"#;

const DOCS_SYSTEM_PROMPT: &str = r#"# Purpose
You are a documentation assistant. You answer questions about product
documentation and errata using the retrieved passages, and say so when the
passages do not cover the question.
"#;

/// System prompt for `profile`; `custom` replaces the built-in CI prompt
pub fn system_prompt(profile: Profile, custom: Option<&str>) -> String {
    let ci = custom.unwrap_or(CI_SYSTEM_PROMPT);
    match profile {
        Profile::CiLogs => ci.to_string(),
        Profile::RcaFull => format!("{}{}", ci, RCA_SYSTEM_PROMPT_SUFFIX),
        Profile::Documentation => DOCS_SYSTEM_PROMPT.to_string(),
    }
}

/// Render one retrieved passage
pub fn render_document(doc: &ScoredDocument) -> String {
    let components = if doc.components.is_empty() {
        NO_VALUE.to_string()
    } else {
        doc.components.join(",")
    };

    let mut chunk = format!(
        "---\nkind: {}\ntext: {}\nscore: {}\ncomponents: {}\n",
        doc.kind.as_deref().unwrap_or(NO_VALUE),
        doc.text.as_deref().unwrap_or(NO_VALUE),
        doc.score,
        components,
    );
    if let Some(url) = &doc.url {
        chunk.push_str(&format!("url: {}\n", url));
    }
    chunk.push_str(&format!("collection: {}\n---\n", doc.collection));
    chunk
}

fn truncated_notice(text: &str) -> String {
    format!(
        "\nThe following piece of information was truncated because it was too long:\n\n{}\n---\n",
        text
    )
}

/// Drop the last `n` characters of `text`
fn drop_tail_chars(text: &str, n: usize) -> &str {
    let keep = text.chars().count().saturating_sub(n);
    match text.char_indices().nth(keep) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Chat messages ready for generation
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub messages: Vec<ChatMessage>,

    /// Whether retrieved context had to be cut to fit the model
    pub truncated: bool,
}

/// Builds prompts within the generation model's context window
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    header: String,
    custom_system_prompt: Option<String>,
    char_budget: usize,
}

impl PromptBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            header: config.search.prompt_header.clone(),
            custom_system_prompt: config.search.system_prompt.clone(),
            char_budget: TokenEstimator::default().prompt_char_budget(config.generation.max_context),
        }
    }

    /// Override the character budget
    pub fn with_char_budget(mut self, char_budget: usize) -> Self {
        self.char_budget = char_budget;
        self
    }

    /// Build system and user messages; the user content is never cut
    pub fn build(&self, profile: Profile, documents: &[ScoredDocument], content: &str) -> BuiltPrompt {
        let system = system_prompt(profile, self.custom_system_prompt.as_deref());

        if documents.is_empty() {
            let user = format!("{}{}\n{}", self.header, NO_RESULTS_FOUND, content);
            return BuiltPrompt {
                messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
                truncated: false,
            };
        }

        let mut user = format!("{}\n", self.header);
        let content_len = content.chars().count();
        let mut used = system.chars().count() + user.chars().count();
        let mut truncated = false;

        for doc in documents {
            let chunk = render_document(doc);
            let chunk_len = chunk.chars().count();
            let needed = used + chunk_len + content_len;

            if needed > self.char_budget {
                let cut = drop_tail_chars(&chunk, needed - self.char_budget);
                let notice = truncated_notice(cut);
                used += notice.chars().count();
                user.push_str(&notice);
                truncated = true;
                warn!(
                    "Retrieved context truncated to fit {} characters",
                    self.char_budget
                );
                break;
            }

            user.push_str(&chunk);
            used += chunk_len;
        }

        user.push('\n');
        user.push_str(content);

        BuiltPrompt {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            truncated,
        }
    }
}
