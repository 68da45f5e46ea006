//! Code-enhancement seam used by `enhance`.

use devterm_types::error::Result;

/// Something that proposes an improved version of a source file.
pub trait CodeEnhancer {
    fn name(&self) -> &str;

    fn enhance(&self, code: &str, language: &str) -> Result<String>;
}

/// Deterministic local rewrites: trailing whitespace, tabs to two spaces,
/// `var` to `let` in JavaScript/TypeScript, `==` to `===` outside strings in
/// JavaScript/TypeScript, and a final newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEnhancer;

impl CodeEnhancer for OfflineEnhancer {
    fn name(&self) -> &str {
        "offline"
    }

    fn enhance(&self, code: &str, language: &str) -> Result<String> {
        let js = matches!(language, "javascript" | "typescript");
        let mut out = String::with_capacity(code.len());
        for line in code.lines() {
            let mut line = line.trim_end().replace('\t', "  ");
            if js {
                line = modernize_js_line(&line);
            }
            out.push_str(&line);
            out.push('\n');
        }
        while out.ends_with("\n\n") {
            out.pop();
        }
        Ok(out)
    }
}

fn modernize_js_line(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let (lead, body) = line.split_at(indent);
    let body = match body.strip_prefix("var ") {
        Some(rest) => format!("let {rest}"),
        None => body.to_string(),
    };
    format!("{lead}{}", strict_equality(&body))
}

/// Rewrite loose `==`/`!=` to strict forms outside string literals.
fn strict_equality(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len() + 4);
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == '\\' {
                    out.push(c);
                    if let Some(&n) = chars.get(i + 1) {
                        out.push(n);
                    }
                    i += 2;
                    continue;
                }
                if c == q {
                    quote = None;
                }
                out.push(c);
            },
            None => {
                if matches!(c, '\'' | '"' | '`') {
                    quote = Some(c);
                    out.push(c);
                } else if (c == '=' || c == '!')
                    && chars.get(i + 1) == Some(&'=')
                    && chars.get(i + 2) != Some(&'=')
                    && (c == '!' || i == 0 || !matches!(chars[i - 1], '=' | '!' | '<' | '>'))
                {
                    out.push(c);
                    out.push_str("==");
                    i += 2;
                    continue;
                } else {
                    out.push(c);
                }
            },
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_detabs() {
        let out = OfflineEnhancer.enhance("a  \n\tb\n\n\n", "python").unwrap();
        assert_eq!(out, "a\n  b\n");
    }

    #[test]
    fn js_modernized() {
        let out = OfflineEnhancer
            .enhance("var x = 1;\nif (x == 1 && y != '==') {}\n", "javascript")
            .unwrap();
        assert_eq!(out, "let x = 1;\nif (x === 1 && y !== '==') {}\n");
    }

    #[test]
    fn strict_forms_untouched() {
        assert_eq!(strict_equality("a === b !== c <= d"), "a === b !== c <= d");
    }

    #[test]
    fn non_js_keeps_operators() {
        let out = OfflineEnhancer.enhance("if a == b:\n    pass\n", "python").unwrap();
        assert_eq!(out, "if a == b:\n    pass\n");
    }
}
