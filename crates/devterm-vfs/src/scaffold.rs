//! Default workspace contents for a fresh terminal session.

use devterm_types::error::Result;

use crate::memory::MemoryVfs;

const PACKAGE_JSON: &str = r#"{
  "name": "my-app",
  "version": "0.1.0",
  "private": true,
  "scripts": {
    "dev": "vite",
    "build": "vite build",
    "test": "vitest run",
    "lint": "eslint src"
  },
  "dependencies": {
    "react": "^18.2.0",
    "react-dom": "^18.2.0"
  },
  "devDependencies": {
    "eslint": "^8.57.0",
    "typescript": "^5.4.0",
    "vite": "^5.2.0",
    "vitest": "^1.5.0"
  }
}
"#;

const README: &str = "# my-app\n\nA sample project living in the devterm virtual file system.\n\nRun `npm install` then `npm run dev`.\n";

const INDEX_JS: &str = r#"import { greet } from './utils.js';

const name = process.env.USER || 'world';
console.log(greet(name));
"#;

const UTILS_JS: &str = r#"export function greet(name) {
  return `Hello, ${name}!`;
}

export const sum = (a, b) => a + b;
"#;

const APP_TSX: &str = r#"import React from 'react';

interface Props {
  title: string;
}

export default function App({ title }: Props) {
  const [count, setCount] = React.useState(0);
  return <button onClick={() => setCount(count + 1)}>{title}: {count}</button>;
}
"#;

const INDEX_TEST_JS: &str = r#"import { describe, it, expect } from 'vitest';
import { sum } from '../src/utils.js';

describe('sum', () => {
  it('adds numbers', () => {
    expect(sum(1, 2)).toBe(3);
  });
});
"#;

const GITIGNORE: &str = "node_modules/\ndist/\n.env\n";

impl MemoryVfs {
    /// A VFS seeded with `/home/<user>/project` holding a small web project,
    /// plus `/tmp`.
    pub fn with_scaffold(user: &str) -> Result<Self> {
        let mut vfs = Self::with_owner(user, "staff");
        let home = format!("/home/{user}");
        let project = format!("{home}/project");
        vfs.mkdir_all("/tmp")?;
        vfs.mkdir_all(&format!("{project}/src"))?;
        vfs.mkdir_all(&format!("{project}/tests"))?;
        vfs.write(&format!("{project}/package.json"), PACKAGE_JSON)?;
        vfs.write(&format!("{project}/README.md"), README)?;
        vfs.write(&format!("{project}/.gitignore"), GITIGNORE)?;
        vfs.write(&format!("{project}/src/index.js"), INDEX_JS)?;
        vfs.write(&format!("{project}/src/utils.js"), UTILS_JS)?;
        vfs.write(&format!("{project}/src/App.tsx"), APP_TSX)?;
        vfs.write(&format!("{project}/tests/index.test.js"), INDEX_TEST_JS)?;
        log::debug!("scaffolded {} entries under {home}", vfs.len());
        Ok(vfs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_has_project_files() {
        let mut vfs = MemoryVfs::with_scaffold("dev").unwrap();
        assert!(vfs.exists("/home/dev/project/src/index.js"));
        assert!(vfs.exists("/tmp"));
        let pkg = vfs.read_to_string("/home/dev/project/package.json").unwrap();
        let json: serde_json::Value = serde_json::from_str(&pkg).unwrap();
        assert_eq!(json["scripts"]["test"], "vitest run");
    }

    #[test]
    fn scaffold_entries_owned_by_user() {
        let vfs = MemoryVfs::with_scaffold("dev").unwrap();
        assert_eq!(vfs.peek("/home/dev/project/README.md").unwrap().owner, "dev");
    }
}
