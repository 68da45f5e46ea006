//! Built-in candidate lists.

/// Commands offered before the host registers its own.
pub(crate) const COMMANDS: &[(&str, &str)] = &[
    ("cat", "Print file contents"),
    ("cd", "Change directory"),
    ("clear", "Clear the terminal"),
    ("docker", "Container tooling"),
    ("echo", "Print arguments"),
    ("git", "Version control"),
    ("grep", "Search file contents"),
    ("head", "Print the first lines of a file"),
    ("help", "List available commands"),
    ("history", "Show command history"),
    ("ls", "List directory contents"),
    ("mkdir", "Create a directory"),
    ("node", "Run JavaScript"),
    ("npm", "Node package manager"),
    ("npx", "Run a package binary"),
    ("pwd", "Print working directory"),
    ("python", "Run Python"),
    ("rm", "Remove files"),
    ("touch", "Create an empty file"),
    ("yarn", "Yarn package manager"),
];

/// Shown for an empty word after recent history.
pub(crate) const COMMON: &[&str] = &[
    "ls",
    "cd",
    "git status",
    "npm install",
    "npm run dev",
    "npm test",
    "help",
    "clear",
    "pwd",
    "cat",
];

pub(crate) const KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "default", "else",
    "export", "extends", "finally", "for", "function", "if", "import", "let", "new", "return",
    "switch", "this", "throw", "try", "typeof", "while",
];

pub(crate) const FUNCTIONS: &[&str] = &[
    "Array.from",
    "JSON.parse",
    "JSON.stringify",
    "Object.entries",
    "Object.keys",
    "Promise.all",
    "console.error",
    "console.log",
    "fetch",
    "parseInt",
    "require",
    "setInterval",
    "setTimeout",
];
