//! Fact-extraction policies built on the dispatch and policy layers.

pub mod function_signature;
pub mod param_type;

pub use function_signature::{FunctionSignaturePolicy, SignatureCollector, SignatureData};
pub use param_type::{ParamData, ParamTypePolicy};

/// Appends a token to reconstructed source text, separating two word-like
/// tokens with a space (`unsigned` + `int`) and gluing everything else
/// (`std` + `::` + `string`).
pub(crate) fn append_token(text: &mut String, token: &str) {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let needs_space = text.chars().last().is_some_and(is_word)
        && token.chars().next().is_some_and(is_word);
    if needs_space {
        text.push(' ');
    }
    text.push_str(token);
}
