//! Prompts for the LLM inference backend.
//!
//! The seq2seq models need no prompt; a chat model does. Keeping the prompts
//! here lets unit tests inspect them without a provider.

use crate::language::LanguageCode;

/// System prompt for abstractive summarization.
///
/// `{max_words}` is replaced with the summary budget.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an expert summarizer of legal and technical documents.

Write an abstractive summary of the document the user provides.

Rules:
1. Write in the same language as the document.
2. Keep parties, obligations, amounts, dates and deadlines.
3. Use plain prose in one or more short paragraphs. No headings, no lists.
4. Do not exceed {max_words} words.
5. Output ONLY the summary. No preamble, no commentary, no quotation marks."#;

/// System prompt for translation.
///
/// `{source}` and `{target}` are replaced with English language names.
pub const TRANSLATION_SYSTEM_PROMPT: &str = r#"You are a professional translator.

Translate the text the user provides from {source} into {target}.

Rules:
1. Preserve the meaning, names, numbers and dates exactly.
2. Do not summarise, shorten or extend the text.
3. Output ONLY the translation. No preamble, no notes, no quotation marks."#;

/// Render the summary system prompt for a word budget.
pub fn summary_prompt(max_words: usize) -> String {
    SUMMARY_SYSTEM_PROMPT.replace("{max_words}", &max_words.to_string())
}

/// Render the translation system prompt for a language pair.
pub fn translation_prompt(source: &LanguageCode, target: &LanguageCode) -> String {
    TRANSLATION_SYSTEM_PROMPT
        .replace("{source}", &language_label(source))
        .replace("{target}", &language_label(target))
}

fn language_label(code: &LanguageCode) -> String {
    let name = code.english_name();
    if name == code.as_str() {
        name
    } else {
        format!("{name} ({code})")
    }
}
