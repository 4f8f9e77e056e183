//! Lexical path helpers

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically
///
/// Removes `.` components and folds `..` into its parent where possible.
/// A non-empty path that folds away entirely becomes `.`, so only an empty
/// input normalizes to an empty path. The file system is never consulted,
/// so symlinks are not resolved.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !matches!(
                    out.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_))
                ) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() && !path.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Make a path absolute against the working directory, then normalize it
#[must_use]
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => normalize(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_current_dir_components() {
        assert_eq!(normalize(Path::new("a/./b/./c.ma")), PathBuf::from("a/b/c.ma"));
    }

    #[test]
    fn folds_parent_components() {
        assert_eq!(normalize(Path::new("a/b/../c.ma")), PathBuf::from("a/c.ma"));
        assert_eq!(normalize(Path::new("../a/../../b")), PathBuf::from("../../b"));
    }

    #[cfg(unix)]
    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn absolutize_is_absolute() {
        let path = absolutize(Path::new("scenes/./hero.ma"));
        assert!(path.is_absolute());
        assert!(path.ends_with("scenes/hero.ma"));
    }

    #[test]
    fn collapsed_path_is_current_dir() {
        assert_eq!(normalize(Path::new(".")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("./a/../.")), PathBuf::from("."));
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize(Path::new("")), PathBuf::new());
    }
}
