//! Entry path sanitization.

use std::path::PathBuf;

use thiserror::Error;

/// Why an entry path was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsafePath {
    /// The path is rooted or carries a drive prefix.
    #[error("unsafe path: absolute path '{0}'")]
    Absolute(String),

    /// The path contains a `..` component.
    #[error("unsafe path: parent traversal in '{0}'")]
    ParentTraversal(String),

    /// The path contains a NUL byte.
    #[error("unsafe path: null byte in '{0}'")]
    NullByte(String),
}

/// Turns an intra-archive path into a relative path below the output root.
///
/// Both `/` and `\` separate components. Empty and `.` components are
/// dropped. With `reject_unsafe` set, `..` components and rooted or
/// drive-prefixed paths are refused; otherwise they are stripped. NUL bytes
/// are always refused.
///
/// The result may be empty, in which case the caller picks a default name.
///
/// # Examples
///
/// ```
/// use arkive_core::security::sanitize_entry_path;
/// use std::path::PathBuf;
///
/// assert_eq!(
///     sanitize_entry_path("dir\\./sub//file.txt", true).unwrap(),
///     PathBuf::from("dir/sub/file.txt")
/// );
/// assert!(sanitize_entry_path("../etc/passwd", true).is_err());
/// assert_eq!(
///     sanitize_entry_path("/../etc/passwd", false).unwrap(),
///     PathBuf::from("etc/passwd")
/// );
/// ```
pub fn sanitize_entry_path(raw: &str, reject_unsafe: bool) -> Result<PathBuf, UnsafePath> {
    if raw.contains('\0') {
        return Err(UnsafePath::NullByte(raw.replace('\0', "\\0")));
    }

    let mut rest = raw;
    if let Some(stripped) = strip_drive_prefix(rest) {
        if reject_unsafe {
            return Err(UnsafePath::Absolute(raw.to_string()));
        }
        rest = stripped;
    }
    if rest.starts_with(['/', '\\']) && reject_unsafe {
        return Err(UnsafePath::Absolute(raw.to_string()));
    }

    let mut safe = PathBuf::new();
    for component in rest.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => {
                if reject_unsafe {
                    return Err(UnsafePath::ParentTraversal(raw.to_string()));
                }
            }
            name => safe.push(name),
        }
    }
    Ok(safe)
}

/// Returns the remainder after a `X:` drive prefix.
fn strip_drive_prefix(path: &str) -> Option<&str> {
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => Some(&path[2..]),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_relative_path() {
        assert_eq!(
            sanitize_entry_path("a/b/c.txt", true).unwrap(),
            PathBuf::from("a/b/c.txt")
        );
    }

    #[test]
    fn test_backslash_separator() {
        assert_eq!(
            sanitize_entry_path("a\\b\\c.txt", true).unwrap(),
            PathBuf::from("a/b/c.txt")
        );
    }

    #[test]
    fn test_dot_and_empty_components_dropped() {
        assert_eq!(
            sanitize_entry_path("./a//./b/", true).unwrap(),
            PathBuf::from("a/b")
        );
    }

    #[test]
    fn test_parent_traversal_rejected() {
        assert!(matches!(
            sanitize_entry_path("a/../../b", true),
            Err(UnsafePath::ParentTraversal(_))
        ));
        assert!(matches!(
            sanitize_entry_path("..\\evil", true),
            Err(UnsafePath::ParentTraversal(_))
        ));
    }

    #[test]
    fn test_absolute_rejected() {
        assert!(matches!(
            sanitize_entry_path("/etc/passwd", true),
            Err(UnsafePath::Absolute(_))
        ));
        assert!(matches!(
            sanitize_entry_path("\\\\server\\share", true),
            Err(UnsafePath::Absolute(_))
        ));
        assert!(matches!(
            sanitize_entry_path("C:\\Windows\\evil.dll", true),
            Err(UnsafePath::Absolute(_))
        ));
        assert!(matches!(
            sanitize_entry_path("c:relative", true),
            Err(UnsafePath::Absolute(_))
        ));
    }

    #[test]
    fn test_unsafe_components_stripped_when_lenient() {
        assert_eq!(
            sanitize_entry_path("C:\\a\\..\\b.txt", false).unwrap(),
            PathBuf::from("a/b.txt")
        );
        assert_eq!(
            sanitize_entry_path("/abs/file", false).unwrap(),
            PathBuf::from("abs/file")
        );
    }

    #[test]
    fn test_null_byte_always_rejected() {
        assert!(matches!(
            sanitize_entry_path("a\0b", false),
            Err(UnsafePath::NullByte(_))
        ));
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(sanitize_entry_path("", true).unwrap(), PathBuf::new());
        assert_eq!(sanitize_entry_path("./", true).unwrap(), PathBuf::new());
    }

    #[test]
    fn test_file_named_with_colon_later_is_relative() {
        assert_eq!(
            sanitize_entry_path("notes:v2.txt", true).unwrap(),
            PathBuf::from("notes:v2.txt")
        );
    }

    #[test]
    fn test_error_message_mentions_unsafe() {
        let err = sanitize_entry_path("../x", true).unwrap_err();
        assert!(err.to_string().starts_with("unsafe path"));
    }
}
