use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::error::Result;

/// Lexically normalize a path, folding `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Express `target` relative to the directory `base_dir`, with `/` separators.
///
/// Both paths must be anchored the same way (both absolute or both relative
/// to one working directory).
pub fn relative_href(target: &Path, base_dir: &Path) -> String {
    let target = normalize(target);
    let base = normalize(base_dir);
    let t: Vec<_> = target.components().collect();
    let b: Vec<_> = base.components().collect();
    let common = t.iter().zip(&b).take_while(|(x, y)| x == y).count();

    let mut parts: Vec<String> = Vec::with_capacity(b.len() - common + t.len() - common);
    parts.extend(std::iter::repeat_n("..".to_string(), b.len() - common));
    parts.extend(
        t[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Pretty-print a catalog document to `path`, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text)?;
    info!("Wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_and_nested_targets() {
        let base = Path::new("/out/items/LS-DF/X_1");
        assert_eq!(
            relative_href(Path::new("/out/items/LS-DF/X_1/X_1.json"), base),
            "X_1.json"
        );
        assert_eq!(
            relative_href(Path::new("/out/items/LS-DF/collection.json"), base),
            "../collection.json"
        );
        assert_eq!(
            relative_href(Path::new("/out/assets/LS-DF/X_1/thumbnail.jpg"), base),
            "../../../assets/LS-DF/X_1/thumbnail.jpg"
        );
    }

    #[test]
    fn dot_segments_are_folded() {
        assert_eq!(
            relative_href(Path::new("./out/./a/../b.json"), Path::new("out")),
            "b.json"
        );
        assert_eq!(relative_href(Path::new("out"), Path::new("out")), ".");
    }

    #[test]
    fn writes_pretty_json_with_parents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a/b/doc.json");
        write_json(&path, &serde_json::json!({"id": "x"})).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"id\": \"x\""));
    }
}
