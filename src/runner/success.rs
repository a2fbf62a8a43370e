use crate::lexicon::pattern::TokenList;
use crate::text::normalize;

/// Whether visible page text contains a success phrase.
pub fn looks_like_success(page_text: &str, phrases: &TokenList) -> bool {
    let text = normalize(page_text);
    !text.is_empty() && phrases.any_in(&text)
}
