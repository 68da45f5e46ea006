//! Command-line tokenizer and variable expansion.
//!
//! Quoting rules:
//! - `'...'` and `"..."` suppress word splitting until the matching quote.
//! - A backslash escapes the next character, inside or outside quotes. A
//!   trailing lone backslash is kept as-is.
//! - `""` produces an empty token.
//! - An unterminated quote runs to the end of the line.

use std::collections::BTreeMap;

/// Tokens of one line plus the quote left open, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLine {
    pub tokens: Vec<String>,
    pub unterminated: Option<char>,
}

/// Split a line into tokens.
pub fn parse(line: &str) -> Vec<String> {
    parse_line(line).tokens
}

/// Split a line into tokens and report an unterminated quote.
pub fn parse_line(line: &str) -> ParsedLine {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(chars.next().unwrap_or('\\'));
            in_token = true;
            continue;
        }
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_token = true;
                },
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                },
                _ => {
                    current.push(ch);
                    in_token = true;
                },
            },
        }
    }
    if in_token {
        tokens.push(current);
    }

    ParsedLine {
        tokens,
        unterminated: quote,
    }
}

/// Quote a token so that [`parse`] reads it back unchanged.
pub fn quote(token: &str) -> String {
    let plain = !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\' | '$'));
    if plain {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('\'');
    for c in token.chars() {
        if matches!(c, '\'' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Substitute `$NAME`, `${NAME}` and `$?`. Unknown names expand to nothing.
/// Single-quoted spans and backslash-escaped `$` are left alone.
///
/// Substituted values are escaped so that [`parse`] keeps their quotes and
/// backslashes literal. Outside double quotes a value still splits on
/// whitespace.
pub fn expand_variables(input: &str, vars: &BTreeMap<String, String>, last_exit: i32) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\\' {
            out.push(ch);
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
            }
            i += 2;
            continue;
        }
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            _ => {},
        }
        if ch != '$' || in_single {
            out.push(ch);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('?') => {
                out.push_str(&last_exit.to_string());
                i += 2;
            },
            Some('{') => match chars[i + 2..].iter().position(|&c| c == '}') {
                Some(len) => {
                    let name: String = chars[i + 2..i + 2 + len].iter().collect();
                    push_value(&mut out, vars.get(&name), in_double);
                    i += len + 3;
                },
                None => {
                    out.push('$');
                    i += 1;
                },
            },
            _ => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                if end > start {
                    let name: String = chars[start..end].iter().collect();
                    push_value(&mut out, vars.get(&name), in_double);
                } else {
                    out.push('$');
                }
                i = end.max(start);
            },
        }
    }
    out
}

fn push_value(out: &mut String, value: Option<&String>, in_double: bool) {
    for c in value.map_or("", String::as_str).chars() {
        if matches!(c, '\\' | '"') || (c == '\'' && !in_double) {
            out.push('\\');
        }
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<String, String> {
        let mut v = BTreeMap::new();
        v.insert("USER".to_string(), "dev".to_string());
        v.insert("HOME".to_string(), "/home/dev".to_string());
        v
    }

    #[test]
    fn simple_words() {
        assert_eq!(parse("ls -la /tmp"), ["ls", "-la", "/tmp"]);
    }

    #[test]
    fn double_quotes_group() {
        assert_eq!(parse("echo \"a b\" c"), ["echo", "a b", "c"]);
    }

    #[test]
    fn single_quotes_group() {
        assert_eq!(parse("git commit -m 'fix: it'"), ["git", "commit", "-m", "fix: it"]);
    }

    #[test]
    fn backslash_escapes_everywhere() {
        assert_eq!(parse(r"echo a\ b"), ["echo", "a b"]);
        assert_eq!(parse(r#"echo "say \"hi\"""#), ["echo", "say \"hi\""]);
        assert_eq!(parse(r"echo 'it\'s'"), ["echo", "it's"]);
    }

    #[test]
    fn trailing_backslash_kept() {
        assert_eq!(parse(r"echo a\"), ["echo", r"a\"]);
    }

    #[test]
    fn empty_quotes_make_empty_token() {
        assert_eq!(parse(r#"echo "" x"#), ["echo", "", "x"]);
        assert_eq!(parse("echo ''"), ["echo", ""]);
    }

    #[test]
    fn adjacent_quotes_join() {
        assert_eq!(parse(r#"a"b c"'d'"#), ["ab cd"]);
    }

    #[test]
    fn blank_input() {
        assert!(parse("").is_empty());
        assert!(parse(" \t  ").is_empty());
    }

    #[test]
    fn unterminated_quote_is_tolerated() {
        let parsed = parse_line("echo \"hello world");
        assert_eq!(parsed.tokens, ["echo", "hello world"]);
        assert_eq!(parsed.unterminated, Some('"'));
        assert_eq!(parse_line("echo ok").unterminated, None);
    }

    #[test]
    fn quote_round_trips() {
        for token in ["plain", "a b", "it's", "", r"back\slash", "$HOME"] {
            assert_eq!(parse(&quote(token)), [token]);
        }
    }

    #[test]
    fn expands_plain_and_braced() {
        assert_eq!(expand_variables("echo $USER ${HOME}/x", &vars(), 0), "echo dev /home/dev/x");
    }

    #[test]
    fn expands_exit_code() {
        assert_eq!(expand_variables("echo $?", &vars(), 1), "echo 1");
    }

    #[test]
    fn unknown_variable_is_empty() {
        assert_eq!(expand_variables("a$NOPE-b", &vars(), 0), "a-b");
    }

    #[test]
    fn lone_dollar_kept() {
        assert_eq!(expand_variables("cost $ 5 ${", &vars(), 0), "cost $ 5 ${");
    }

    #[test]
    fn single_quotes_and_escapes_block_expansion() {
        assert_eq!(expand_variables("echo '$USER'", &vars(), 0), "echo '$USER'");
        assert_eq!(expand_variables("echo \"it's $USER\"", &vars(), 0), "echo \"it's dev\"");
        assert_eq!(expand_variables(r"echo \$USER", &vars(), 0), r"echo \$USER");
        assert_eq!(parse(&expand_variables(r"echo \$USER", &vars(), 0)), ["echo", "$USER"]);
    }

    #[test]
    fn substituted_values_are_not_reparsed() {
        let mut v = vars();
        v.insert("Q".to_string(), "\"".to_string());
        v.insert("MSG".to_string(), "it's a \\ b".to_string());
        assert_eq!(parse(&expand_variables("echo $Q hi", &v, 0)), ["echo", "\"", "hi"]);
        assert_eq!(parse(&expand_variables("echo \"$Q\" hi", &v, 0)), ["echo", "\"", "hi"]);
        assert_eq!(parse(&expand_variables("echo $MSG", &v, 0)), ["echo", "it's", "a", "\\", "b"]);
        assert_eq!(parse(&expand_variables("echo \"${MSG}\"", &v, 0)), ["echo", "it's a \\ b"]);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reparse_is_identity(line in "[a-z0-9 ]{0,40}|[a-z ]{0,10}\"[a-z ]{0,10}\"[a-z ]{0,10}") {
                let once = parse(&line);
                let rejoined = once.iter().map(|t| quote(t)).collect::<Vec<_>>().join(" ");
                prop_assert_eq!(parse(&rejoined), once);
            }

            #[test]
            fn quoted_tokens_survive(tokens in proptest::collection::vec(".{0,8}", 0..6)) {
                let line = tokens.iter().map(|t| quote(t)).collect::<Vec<_>>().join(" ");
                prop_assert_eq!(parse(&line), tokens);
            }
        }
    }
}
