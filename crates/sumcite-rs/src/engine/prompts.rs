//! System prompts and per-turn user-message construction.
//!
//! The summary system prompt fixes the JSON output contract: a `summary`
//! array whose blocks each cite the `S<n>` IDs of the source sentences they
//! came from, and nothing outside the JSON envelope. The markdown context
//! built by the renderer carries those IDs inline, which is what makes the
//! citation scheme learnable.

use super::records::PromptType;

/// System prompt for single-document (and child) summary conversations.
pub const SUMMARY_SYSTEM_PROMPT: &str = "\
You will be provided with an article in markdown format with each sentence \
that ends with a sentence ID in the form of \"(S1)\", \"(S2)\", and so on. \
Ensure that you read the article carefully before providing a summary.

You will be prompted to provide a summary of the article.
The summary must be a list of sentences that are present in the article.
Each sentence in the summary must be attributed to sentences in the original \
article by citing the sentence IDs.
Maintain the markdown format.

Use the following json format to answer.
{
    \"summary\": [
        {\"text\": \"Sentence 1\", \"sources\": [\"S1\", \"S2\"]},
        {\"text\": \"Sentence 2\", \"sources\": [\"S3\", \"S4\"]},
        {\"text\": \"Sentence 3\", \"sources\": [\"S5\", \"S6\"]}
    ]
}

Do not include any text outside of the JSON format.";

/// System prompt for the meta-conversation over per-document summaries.
pub const GLOBAL_SUMMARY_SYSTEM_PROMPT: &str = "\
You will be provided with summaries of several documents. Each document's \
summary is tagged with a 1-based document index, and each summary sentence \
carries the sentence IDs it was derived from.

You will be prompted to provide a combined summary across all documents.
Each sentence in the combined summary must be attributed to source sentences \
by citing their sentence IDs.

Use the following json format to answer.
{
    \"summary\": [
        {\"text\": \"Sentence 1\", \"sources\": [\"S1\", \"S2\"]},
        {\"text\": \"Sentence 2\", \"sources\": [\"S3\", \"S4\"]}
    ]
}

Do not include any text outside of the JSON format.";

/// System prompt for email-style rewrites (no document context).
pub const EMAIL_REWRITE_SYSTEM_PROMPT: &str = "\
You rewrite the user's draft as a clear, professional email. Preserve the \
meaning and any factual content; improve tone, structure, and brevity. \
Respond with the rewritten email only.";

/// System prompt for chart explanation (multimodal turns).
pub const CHART_EXPLANATION_SYSTEM_PROMPT: &str = "\
You will be shown a chart image. Explain what the chart shows: the axes, the \
trends, and the most notable data points. Answer follow-up questions about \
the same chart using the conversation history.";

/// The first user message of a document conversation.
pub fn original_article_message(markdown: &str) -> String {
    format!("Original Article:\n\n{markdown}")
}

/// Tag one document's summary text with its 1-based index for the
/// meta-conversation context.
pub fn tagged_document_summary(index: usize, summary_text: &str) -> String {
    format!("Document {index}:\n{summary_text}")
}

/// Build the turn's user message from the caller's prompt and scope.
///
/// Source- and summary-scoped prompts are wrapped with an instruction
/// naming the targeted sentence; general prompts pass through unmodified.
/// Target presence has already been validated.
pub fn wrap_user_prompt(
    prompt_type: PromptType,
    prompt: &str,
    source_target_text: Option<&str>,
    summary_target_text: Option<&str>,
) -> String {
    match prompt_type {
        PromptType::Source => format!(
            "Provide response specific to the following sentence from the \
             original article: {}\n\n----------\n{prompt}",
            source_target_text.unwrap_or_default(),
        ),
        PromptType::Summary => format!(
            "Provide response specific to the following sentence from the \
             current summary: {}\n\n----------\n{prompt}",
            summary_target_text.unwrap_or_default(),
        ),
        PromptType::General => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_prompt_passes_through() {
        let wrapped = wrap_user_prompt(PromptType::General, "Summarize", None, None);
        assert_eq!(wrapped, "Summarize");
    }

    #[test]
    fn source_prompt_embeds_target() {
        let wrapped = wrap_user_prompt(
            PromptType::Source,
            "Expand on this",
            Some("Revenue grew."),
            None,
        );
        assert!(wrapped.contains("Revenue grew."));
        assert!(wrapped.contains("original article"));
        assert!(wrapped.ends_with("Expand on this"));
    }

    #[test]
    fn summary_prompt_embeds_target() {
        let wrapped = wrap_user_prompt(
            PromptType::Summary,
            "Shorten",
            None,
            Some("The company did well."),
        );
        assert!(wrapped.contains("The company did well."));
        assert!(wrapped.contains("current summary"));
    }

    #[test]
    fn article_message_prefix() {
        let msg = original_article_message("# Title (S1)");
        assert!(msg.starts_with("Original Article:\n\n"));
        assert!(msg.contains("(S1)"));
    }

    #[test]
    fn document_tagging_uses_one_based_index() {
        let tagged = tagged_document_summary(1, "First summary.");
        assert!(tagged.starts_with("Document 1:\n"));
    }

    #[test]
    fn system_prompt_fixes_json_envelope() {
        assert!(SUMMARY_SYSTEM_PROMPT.contains("\"summary\""));
        assert!(SUMMARY_SYSTEM_PROMPT.contains("\"sources\""));
        assert!(SUMMARY_SYSTEM_PROMPT.contains("(S1)"));
    }
}
