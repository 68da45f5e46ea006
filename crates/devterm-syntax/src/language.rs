//! Per-language pattern tables.
//!
//! Tables list their patterns in `TokenType::PRIORITY` order. Languages that
//! have no notion of a type simply leave it out.

use devterm_types::error::Result;
use regex::Regex;

use crate::token::TokenType;

/// One compiled token pattern. When `group` is non-zero the token is the
/// first participating capture group numbered `group` or higher, so a
/// pattern can match context it does not highlight.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: TokenType,
    pub regex: Regex,
    pub group: usize,
}

/// A named language and its ordered pattern table.
#[derive(Debug, Clone)]
pub struct Language {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub patterns: Vec<Pattern>,
}

impl Language {
    fn compile(
        name: &'static str,
        aliases: &'static [&'static str],
        defs: &[(TokenType, &str, usize)],
    ) -> Result<Self> {
        let patterns = defs
            .iter()
            .map(|&(kind, src, group)| {
                Ok(Pattern {
                    kind,
                    regex: Regex::new(src)?,
                    group,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name,
            aliases,
            patterns,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

impl Pattern {
    /// Byte ranges this pattern highlights in `code`, empty spans dropped.
    pub fn spans<'a>(&'a self, code: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.regex.captures_iter(code).filter_map(move |caps| {
            let m = if self.group == 0 {
                caps.get(0)
            } else {
                (self.group..caps.len()).find_map(|i| caps.get(i))
            }?;
            (m.start() < m.end()).then_some((m.start(), m.end()))
        })
    }
}

/// The set of supported languages, in detection tie-break order.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    languages: Vec<Language>,
}

const JS_KEYWORDS: &str = r"\b(?:async|await|break|case|catch|class|const|continue|debugger|default|delete|do|else|export|extends|false|finally|for|from|function|if|import|in|instanceof|let|new|null|of|return|super|switch|this|throw|true|try|typeof|undefined|var|void|while|with|yield)\b";

const TS_KEYWORDS: &str = r"\b(?:abstract|any|as|async|await|boolean|break|case|catch|class|const|continue|declare|default|delete|do|else|enum|export|extends|false|finally|for|from|function|if|implements|import|in|instanceof|interface|keyof|let|namespace|never|new|null|number|of|private|protected|public|readonly|return|string|super|switch|this|throw|true|try|type|typeof|undefined|unknown|var|void|while|yield)\b";

const C_STRINGS: &str = r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|`(?:[^`\\]|\\.)*`"#;
const C_COMMENTS: &str = r"//[^\n]*|/\*[\s\S]*?\*/";
const C_NUMBERS: &str = r"\b(?:0[xX][0-9a-fA-F]+|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)\b";
const C_OPERATORS: &str = r"=>|===|!==|==|!=|<=|>=|&&|\|\||\?\?|[+\-*/%=<>!&|^~?]";
const JS_FUNCTIONS: &str = r"\b([A-Za-z_$][\w$]*)\s*\(";
const JS_VARIABLES: &str = r"\b(?:let|const|var)\s+([A-Za-z_$][\w$]*)";
const PASCAL_CASE: &str = r"\b[A-Z][A-Za-z0-9_]*\b";

impl LanguageTable {
    /// Compile the built-in language tables.
    pub fn builtin() -> Result<Self> {
        use TokenType::*;

        let javascript = Language::compile(
            "javascript",
            &["js", "jsx", "mjs", "node"],
            &[
                (Keyword, JS_KEYWORDS, 0),
                (String, C_STRINGS, 0),
                (Number, C_NUMBERS, 0),
                (Comment, C_COMMENTS, 0),
                (Function, JS_FUNCTIONS, 1),
                (Operator, C_OPERATORS, 0),
                (Variable, JS_VARIABLES, 1),
                (Class, PASCAL_CASE, 0),
            ],
        )?;

        let typescript = Language::compile(
            "typescript",
            &["ts", "tsx"],
            &[
                (Keyword, TS_KEYWORDS, 0),
                (String, C_STRINGS, 0),
                (Number, C_NUMBERS, 0),
                (Comment, C_COMMENTS, 0),
                (Function, JS_FUNCTIONS, 1),
                (Operator, C_OPERATORS, 0),
                (Variable, JS_VARIABLES, 1),
                (Class, PASCAL_CASE, 0),
            ],
        )?;

        let python = Language::compile(
            "python",
            &["py", "python3"],
            &[
                (
                    Keyword,
                    r"\b(?:False|None|True|and|as|assert|async|await|break|class|continue|def|del|elif|else|except|finally|for|from|global|if|import|in|is|lambda|nonlocal|not|or|pass|raise|return|try|while|with|yield)\b",
                    0,
                ),
                (
                    String,
                    r#""""[\s\S]*?"""|'''[\s\S]*?'''|[fbr]?"(?:[^"\\\n]|\\.)*"|[fbr]?'(?:[^'\\\n]|\\.)*'"#,
                    0,
                ),
                (Number, r"\b(?:0[xX][0-9a-fA-F]+|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?j?)\b", 0),
                (Comment, r"#[^\n]*", 0),
                (Function, r"\b([A-Za-z_]\w*)\s*\(", 1),
                (Operator, r"\*\*|//|==|!=|<=|>=|->|:=|[+\-*/%=<>&|^~@]", 0),
                (Variable, r"\b(?:(self|cls)\b|([A-Za-z_]\w*)\s*=[^=])", 1),
                (Class, PASCAL_CASE, 0),
            ],
        )?;

        let rust = Language::compile(
            "rust",
            &["rs"],
            &[
                (
                    Keyword,
                    r"\b(?:as|async|await|break|const|continue|crate|dyn|else|enum|extern|false|fn|for|if|impl|in|let|loop|match|mod|move|mut|pub|ref|return|self|Self|static|struct|super|trait|true|type|unsafe|use|where|while)\b",
                    0,
                ),
                (String, r#"b?"(?:[^"\\]|\\.)*"|'(?:[^'\\\n]|\\.)'"#, 0),
                (
                    Number,
                    r"\b(?:0[xX][0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?)(?:[iu](?:8|16|32|64|128|size)|f32|f64)?\b",
                    0,
                ),
                (Comment, C_COMMENTS, 0),
                (Function, r"\b([a-z_][A-Za-z0-9_]*!?)\s*(?:::<[^>]*>)?\(", 1),
                (Operator, r"=>|->|::|==|!=|<=|>=|&&|\|\||\.\.=?|[+\-*/%=<>!&|^?]", 0),
                (Variable, r"\blet\s+(?:mut\s+)?([a-z_][A-Za-z0-9_]*)", 1),
                (Class, PASCAL_CASE, 0),
            ],
        )?;

        let bash = Language::compile(
            "bash",
            &["sh", "shell", "zsh"],
            &[
                (
                    Keyword,
                    r"\b(?:if|then|else|elif|fi|for|while|until|do|done|case|esac|function|in|return|exit|export|local|readonly|source|echo|cd)\b",
                    0,
                ),
                (String, r#""(?:[^"\\]|\\.)*"|'[^']*'"#, 0),
                (Number, r"\b\d+\b", 0),
                (Comment, r"(?m)(?:^|\s)(#[^\n]*)", 1),
                (Function, r"\b([A-Za-z_][\w-]*)\s*\(\)", 1),
                (Operator, r"&&|\|\||>>|<<|[|&;<>]", 0),
                (Variable, r"\$\{[^}\n]+\}|\$[A-Za-z_]\w*|\$[0-9#?@*$!]", 0),
            ],
        )?;

        let json = Language::compile(
            "json",
            &["jsonc"],
            &[
                (Keyword, r"\b(?:true|false|null)\b", 0),
                (String, r#""(?:[^"\\]|\\.)*""#, 0),
                (Number, r"-?\b\d+(?:\.\d+)?(?:[eE][+-]?\d+)?\b", 0),
                (Operator, r"[:,]", 0),
            ],
        )?;

        let css = Language::compile(
            "css",
            &["scss", "less"],
            &[
                (Keyword, r"@[a-z-]+\b|!important\b", 0),
                (String, r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#, 0),
                (
                    Number,
                    r"-?\b\d+(?:\.\d+)?(?:px|em|rem|vh|vw|ms|s|deg|%)?",
                    0,
                ),
                (Comment, r"/\*[\s\S]*?\*/", 0),
                (Function, r"\b([a-z-]+)\(", 1),
                (Operator, r"[:;{},>+~]", 0),
                (Variable, r"--[A-Za-z0-9-]+", 0),
                (Class, r"\.[A-Za-z_][\w-]*", 0),
            ],
        )?;

        Ok(Self {
            languages: vec![javascript, typescript, python, rust, bash, json, css],
        })
    }

    /// Look a language up by name or alias (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.matches(name))
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Canonical names, in table order.
    pub fn names(&self) -> Vec<&'static str> {
        self.languages.iter().map(|l| l.name).collect()
    }

    /// Guess a language from a file name's extension.
    pub fn for_file_name(&self, file_name: &str) -> Option<&Language> {
        let ext = file_name.rsplit_once('.')?.1;
        self.find(ext)
    }
}
