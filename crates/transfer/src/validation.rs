use crate::TransferError;

/// Reduces a requested file name to its final path component.
///
/// Both `/` and `\` count as separators so a peer on another platform cannot
/// smuggle a directory through. Rejects names that end up empty, `.` or `..`.
pub fn sanitize_file_name(file_name: &str) -> Result<String, TransferError> {
    let last = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    match last {
        "" => Err(TransferError::InvalidFileName(format!(
            "no file name in {file_name:?}"
        ))),
        "." | ".." => Err(TransferError::InvalidFileName(format!(
            "not a file name: {file_name:?}"
        ))),
        name => Ok(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_simple_name() {
        assert_eq!(sanitize_file_name("game.exe").unwrap(), "game.exe");
    }

    #[test]
    fn strips_unix_directories() {
        assert_eq!(sanitize_file_name("a/b/c.txt").unwrap(), "c.txt");
        assert_eq!(sanitize_file_name("/etc/passwd").unwrap(), "passwd");
    }

    #[test]
    fn strips_parent_traversal() {
        assert_eq!(sanitize_file_name("../../secret.key").unwrap(), "secret.key");
    }

    #[test]
    fn strips_windows_directories() {
        assert_eq!(sanitize_file_name("C:\\Windows\\evil.dll").unwrap(), "evil.dll");
        assert_eq!(sanitize_file_name("..\\up.txt").unwrap(), "up.txt");
    }

    #[test]
    fn keeps_dotfile() {
        assert_eq!(sanitize_file_name(".bashrc").unwrap(), ".bashrc");
    }

    #[test]
    fn rejects_empty() {
        assert!(sanitize_file_name("").is_err());
    }

    #[test]
    fn rejects_trailing_separator() {
        assert!(sanitize_file_name("dir/").is_err());
    }

    #[test]
    fn rejects_dot_components() {
        assert!(sanitize_file_name("..").is_err());
        assert!(sanitize_file_name("a/..").is_err());
        assert!(sanitize_file_name(".").is_err());
    }
}
