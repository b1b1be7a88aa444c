use std::fmt::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Make a remote-supplied name safe to use as a single path component.
///
/// Strips separators and characters invalid on common filesystems, and
/// refuses `.`/`..`. Returns `None` when nothing usable is left.
pub fn clean_component(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned)
    }
}

/// Local file name for an item, falling back to its identity.
pub fn local_filename(filename: &str, id: &str) -> String {
    clean_component(filename)
        .or_else(|| clean_component(id))
        .unwrap_or_else(|| hashed_id(id))
}

/// Per-caller download directory: `<root>/<caller>`.
pub fn caller_directory(root: &Path, caller: &str) -> anyhow::Result<PathBuf> {
    match clean_component(caller) {
        Some(component) => Ok(root.join(component)),
        None => anyhow::bail!("Caller identity {:?} cannot be used as a directory name", caller),
    }
}

/// Temporary path a transfer writes to before the final rename.
///
/// Derived from the item identity, so two items never share a `.part` file.
pub fn part_path(directory: &Path, id: &str) -> PathBuf {
    directory.join(format!(".{}.part", hashed_id(id)))
}

fn hashed_id(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    let mut hex = String::with_capacity(32);
    for byte in &digest[..16] {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_component_strips_separators() {
        assert_eq!(clean_component("a/b\\c.jpg").as_deref(), Some("abc.jpg"));
        assert_eq!(clean_component("IMG:001?.heic").as_deref(), Some("IMG001.heic"));
    }

    #[test]
    fn test_clean_component_rejects_traversal_and_empty() {
        assert_eq!(clean_component(".."), None);
        assert_eq!(clean_component("../"), None);
        assert_eq!(clean_component("."), None);
        assert_eq!(clean_component("   "), None);
        assert_eq!(clean_component("//"), None);
    }

    #[test]
    fn test_clean_component_keeps_unicode() {
        assert_eq!(clean_component("café.jpg").as_deref(), Some("café.jpg"));
    }

    #[test]
    fn test_local_filename_falls_back_to_id() {
        assert_eq!(local_filename("photo.jpg", "ID1"), "photo.jpg");
        assert_eq!(local_filename("..", "ID1"), "ID1");
        let hashed = local_filename("", "/");
        assert_eq!(hashed.len(), 32);
    }

    #[test]
    fn test_caller_directory() {
        let root = Path::new("/data");
        assert_eq!(
            caller_directory(root, "1234567890").unwrap(),
            PathBuf::from("/data/1234567890")
        );
        assert!(caller_directory(root, "..").is_err());
        assert_eq!(
            caller_directory(root, "../../etc").unwrap(),
            PathBuf::from("/data/....etc")
        );
    }

    #[test]
    fn test_part_path_is_per_identity() {
        let dir = Path::new("/data/u");
        let a = part_path(dir, "A");
        let b = part_path(dir, "B");
        assert_ne!(a, b);
        assert_eq!(a, part_path(dir, "A"));
        assert!(a.to_string_lossy().ends_with(".part"));
        assert_eq!(a.parent(), Some(dir));
    }
}
