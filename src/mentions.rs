//! Extracts `@`-prefixed alias tokens from free-form message text.

/// A mention is `@` followed by one or more characters from
/// `[A-Za-z0-9:_./-]`. Matching is greedy; the leading `@` is stripped.
/// Tokens are deduplicated preserving first-seen order; empty tokens (a `@`
/// with nothing valid following it) are dropped.
pub fn parse_mentions(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '@' {
            let mut j = i + 1;
            while j < chars.len() && is_mention_char(chars[j]) {
                j += 1;
            }
            if j > i + 1 {
                let token: String = chars[i + 1..j].iter().collect();
                if seen.insert(token.clone()) {
                    out.push(token);
                }
                i = j;
                continue;
            }
        }
        i += 1;
    }
    out
}

fn is_mention_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '/' | '-')
}
