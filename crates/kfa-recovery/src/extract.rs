//! Structural extraction and text repair (stages before JSON decoding).

use std::sync::LazyLock;

use regex::Regex;

/// First `{...}` span inside a fenced code block, optional language tag.
static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z0-9_-]*\s*(\{.*?\})\s*```")
        .unwrap_or_else(|e| panic!("invalid fence regex: {e}"))
});

/// A quoted string value immediately followed by a structural delimiter.
static STRING_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(:\s*")((?:[^"\\]|\\.)*)("\s*[,}\]])"#)
        .unwrap_or_else(|e| panic!("invalid repair regex: {e}"))
});

/// Extract the first fenced JSON object, if any.
pub(crate) fn extract_fenced(text: &str) -> Option<String> {
    FENCED_OBJECT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Escape physical newlines inside repair-eligible string values.
///
/// Models emitting long prose routinely put raw line breaks inside JSON
/// string values, which makes the document unparsable. This is a
/// best-effort regex pass over `: "<content>"` spans followed by `,`,
/// `}`, or `]`; anything it cannot match is left untouched and the
/// strict parser gets the final say.
pub(crate) fn repair_newlines(text: &str) -> String {
    if !text.contains('\n') && !text.contains('\r') {
        return text.to_string();
    }
    STRING_VALUE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let content = caps[2].replace('\r', "").replace('\n', "\\n");
            format!("{}{}{}", &caps[1], content, &caps[3])
        })
        .into_owned()
}
