//! Lexical sanitizer for the second prompt variant.
//!
//! Some providers refuse messages containing explicit terms. The sanitized
//! variant swaps those terms for neutral placeholders while leaving the rest
//! of the message untouched.

/// Flagged terms and their replacements, longest first.
///
/// No replacement contains a flagged term, so one pass per entry leaves
/// none behind.
pub const FLAGGED_TERMS: [(&str, &str); 9] = [
    ("asshole", "[insult]"),
    ("bastard", "[insult]"),
    ("vagina", "[inappropriate reference]"),
    ("deport", "remove from country"),
    ("bitch", "[expletive]"),
    ("fuck", "[strong expletive]"),
    ("shit", "[expletive]"),
    ("kill", "harm"),
    ("die", "pass away"),
];

/// Replace every flagged term, ignoring ASCII case.
pub fn sanitize(text: &str) -> String {
    FLAGGED_TERMS
        .iter()
        .fold(text.to_string(), |acc, (term, replacement)| {
            replace_ignore_ascii_case(&acc, term, replacement)
        })
}

/// `needle` must be ASCII, which keeps every match on a char boundary.
fn replace_ignore_ascii_case(text: &str, needle: &str, replacement: &str) -> String {
    let haystack = text.as_bytes();
    let pattern = needle.as_bytes();
    if pattern.is_empty() || haystack.len() < pattern.len() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i + pattern.len() <= haystack.len() {
        if haystack[i..i + pattern.len()].eq_ignore_ascii_case(pattern) {
            out.push_str(&text[copied..i]);
            out.push_str(replacement);
            i += pattern.len();
            copied = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}
