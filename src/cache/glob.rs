//! Glob matching for cache keys
//!
//! Same dialect Redis `SCAN MATCH` understands for the characters we emit:
//! `*` matches any run of characters, `?` matches exactly one, and `\`
//! makes the next character literal.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Literal(char),
    One,
    Many,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '*' => Token::Many,
            '?' => Token::One,
            // A trailing backslash matches itself
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        };
        // Collapse runs of `*`
        if token == Token::Many && tokens.last() == Some(&Token::Many) {
            continue;
        }
        tokens.push(token);
    }
    tokens
}

/// Check whether `key` matches the glob `pattern`
pub fn matches(pattern: &str, key: &str) -> bool {
    let tokens = tokenize(pattern);
    let key: Vec<char> = key.chars().collect();

    let (mut ti, mut ki) = (0usize, 0usize);
    // Position of the last `*` and the key index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < key.len() {
        match tokens.get(ti) {
            Some(Token::Many) => {
                backtrack = Some((ti, ki));
                ti += 1;
                continue;
            }
            Some(Token::One) => {
                ti += 1;
                ki += 1;
                continue;
            }
            Some(Token::Literal(c)) if *c == key[ki] => {
                ti += 1;
                ki += 1;
                continue;
            }
            _ => {}
        }
        match backtrack {
            // Let the last `*` swallow one more character
            Some((star, at)) => {
                ti = star + 1;
                ki = at + 1;
                backtrack = Some((star, at + 1));
            }
            None => return false,
        }
    }

    tokens[ti..].iter().all(|t| *t == Token::Many)
}

/// Escape glob metacharacters so `s` only matches itself
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Glob matching any key that contains `needle`
pub fn contains_pattern(needle: &str) -> String {
    format!("*{}*", escape(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert!(matches("tasks", "tasks"));
        assert!(!matches("tasks", "task"));
        assert!(!matches("task", "tasks"));
        assert!(matches("", ""));
        assert!(!matches("", "a"));
    }

    #[test]
    fn test_star() {
        assert!(matches("resp:*", "resp:1:/api/tasks"));
        assert!(matches("*", ""));
        assert!(matches("*tasks*", "/api/tasks/3"));
        assert!(matches("a*b*c", "axxbyyc"));
        assert!(!matches("a*b*c", "axxbyy"));
        assert!(matches("**x", "abcx"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches("user:?:profile", "user:1:profile"));
        assert!(!matches("user:?:profile", "user:10:profile"));
    }

    #[test]
    fn test_escape() {
        assert!(matches(r"a\*b", "a*b"));
        assert!(!matches(r"a\*b", "axb"));
        assert!(matches(r"\?", "?"));
        assert_eq!(escape("/api/tasks?mood=*"), r"/api/tasks\?mood=\*");
    }

    #[test]
    fn test_contains_pattern() {
        let pattern = contains_pattern("/api/tasks?mood=happy");
        assert!(matches(&pattern, "resp:1:/api/tasks?mood=happy&page=2"));
        assert!(!matches(&pattern, "resp:1:/api/tasks?moodXhappy"));
        assert!(matches(&contains_pattern(""), "anything"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn contains_pattern_agrees_with_str_contains(
            needle in "[a-z/?*]{0,6}",
            key in "[a-z/?*]{0,16}",
        ) {
            prop_assert_eq!(matches(&contains_pattern(&needle), &key), key.contains(&needle));
        }

        #[test]
        fn escaped_string_matches_itself(s in ".{0,20}") {
            prop_assert!(matches(&escape(&s), &s));
        }
    }
}
