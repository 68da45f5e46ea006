//! Path helpers. All VFS keys are absolute, `/`-separated, without `.`/`..`
//! segments, duplicate slashes, or a trailing slash (except the root).

use std::borrow::Cow;

/// Check whether a path is already in normal form.
fn is_normalized(path: &str) -> bool {
    if !path.starts_with('/') {
        return false;
    }
    if path.len() > 1 && path.ends_with('/') {
        return false;
    }
    !path.contains("//")
        && !path
            .split('/')
            .any(|segment| segment == "." || segment == "..")
}

/// Normalize a path: leading `/`, collapsed separators, `.` and `..` resolved,
/// no trailing `/`. Returns the input unchanged (zero-alloc) when already in
/// normal form.
pub fn normalize(path: &str) -> Cow<'_, str> {
    if is_normalized(path) {
        return Cow::Borrowed(path);
    }
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", parts.join("/")))
    }
}

/// Return the parent of a normalized path. The root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

/// Final component of a normalized path (`""` for the root).
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Resolve a possibly-relative path against the current working directory.
/// A leading `~` expands to `home`.
pub fn resolve_path(cwd: &str, home: &str, input: &str) -> String {
    let raw = if input == "~" {
        home.to_string()
    } else if let Some(rest) = input.strip_prefix("~/") {
        format!("{home}/{rest}")
    } else if input.starts_with('/') {
        input.to_string()
    } else {
        format!("{cwd}/{input}")
    };
    normalize(&raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_strips() {
        assert_eq!(normalize("//a///b/"), "/a/b");
        assert_eq!(normalize("a/b"), "/a/b");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn normalize_dot_segments() {
        assert_eq!(normalize("/a/./b/../c"), "/a/c");
        assert_eq!(normalize("/../.."), "/");
    }

    #[test]
    fn normalized_input_is_borrowed() {
        assert!(matches!(normalize("/home/user"), Cow::Borrowed(_)));
    }

    #[test]
    fn parent_of_paths() {
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("/home"), "/");
        assert_eq!(parent("/home/user/x.txt"), "/home/user");
    }

    #[test]
    fn file_name_of_paths() {
        assert_eq!(file_name("/home/user/x.txt"), "x.txt");
        assert_eq!(file_name("/"), "");
    }

    #[test]
    fn resolve_relative_and_absolute() {
        assert_eq!(resolve_path("/home", "/home", "docs"), "/home/docs");
        assert_eq!(resolve_path("/home", "/home", "/etc"), "/etc");
        assert_eq!(resolve_path("/", "/home", "x"), "/x");
        assert_eq!(resolve_path("/a/b", "/home", ".."), "/a");
    }

    #[test]
    fn resolve_tilde() {
        assert_eq!(resolve_path("/tmp", "/home/dev", "~"), "/home/dev");
        assert_eq!(resolve_path("/tmp", "/home/dev", "~/src"), "/home/dev/src");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalize_is_idempotent(path in "[/a-z0-9_.]{1,50}") {
                let once = normalize(&path);
                let twice = normalize(&once);
                prop_assert_eq!(&once, &twice, "normalize must be idempotent");
            }

            #[test]
            fn normalize_never_has_double_slashes(path in "[/a-z0-9_.]{1,50}") {
                let normed = normalize(&path);
                prop_assert!(!normed.contains("//"), "normalized path must not contain //: {normed}");
            }

            #[test]
            fn normalize_starts_with_slash(path in "[a-z0-9_./]{0,50}") {
                let normed = normalize(&path);
                prop_assert!(normed.starts_with('/'), "normalized path must start with /: {normed}");
            }

            #[test]
            fn normalize_no_trailing_slash_unless_root(path in "[/a-z0-9_.]{1,50}") {
                let normed = normalize(&path);
                if normed != "/" {
                    prop_assert!(!normed.ends_with('/'), "non-root normalized path must not end with /: {normed}");
                }
            }
        }
    }
}
