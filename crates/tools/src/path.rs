//! Project-root path resolution and shared argument helpers.

use serde::{Deserialize, Deserializer};
use std::path::{Component, Path, PathBuf};

/// Directory names skipped by the search tools.
const IGNORED_DIRS: &[&str] = &["__pycache__", "node_modules"];

/// The directory every relative tool path resolves against.
#[derive(Debug, Clone)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path: `~` expands to the home directory,
    /// absolute paths are kept, anything else is joined onto the root.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let raw = raw.trim();
        if raw == "~" {
            return home_dir();
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            return home_dir().join(rest);
        }
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Resolve an optional base directory, defaulting to the root.
    pub fn resolve_base(&self, raw: Option<&str>) -> PathBuf {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(p) => self.resolve(p),
            None => self.root.clone(),
        }
    }

    /// How a path is shown to the model: relative to the root when inside it.
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Whether `path` (relative to `base`) passes through a hidden or ignored
/// directory, or is itself a hidden file.
pub(crate) fn is_ignored(base: &Path, path: &Path) -> bool {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components().any(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || IGNORED_DIRS.contains(&name.as_ref())
        }
        _ => false,
    })
}

/// Accept a line number given as a JSON number or a numeric string.
pub(crate) fn lenient_usize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(d)? {
        None => Ok(None),
        Some(Raw::Int(n)) => Ok(Some(n as usize)),
        Some(Raw::Float(f)) if f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as usize)),
        Some(Raw::Float(f)) => Err(serde::de::Error::custom(format!("invalid line number {f}"))),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid line number '{s}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_the_root() {
        let root = ProjectRoot::new("/work/proj");
        assert_eq!(root.resolve("src/lib.rs"), PathBuf::from("/work/proj/src/lib.rs"));
        assert_eq!(root.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(root.resolve_base(None), PathBuf::from("/work/proj"));
        assert_eq!(root.resolve_base(Some("  ")), PathBuf::from("/work/proj"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let root = ProjectRoot::new("/work/proj");
        let resolved = root.resolve("~/notes.md");
        assert!(resolved.ends_with("notes.md"));
        assert!(!resolved.starts_with("/work/proj"));
    }

    #[test]
    fn display_is_root_relative() {
        let root = ProjectRoot::new("/work/proj");
        assert_eq!(root.display(Path::new("/work/proj/src/a.rs")), "src/a.rs");
        assert_eq!(root.display(Path::new("/tmp/x")), "/tmp/x");
    }

    #[test]
    fn ignored_components() {
        let base = Path::new("/home/me/.projects/app");
        assert!(!is_ignored(base, Path::new("/home/me/.projects/app/src/main.rs")));
        assert!(is_ignored(base, Path::new("/home/me/.projects/app/.git/HEAD")));
        assert!(is_ignored(base, Path::new("/home/me/.projects/app/web/node_modules/x.js")));
        assert!(is_ignored(base, Path::new("/home/me/.projects/app/pkg/__pycache__/m.pyc")));
    }

    #[test]
    fn lenient_line_numbers() {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default, deserialize_with = "lenient_usize")]
            start: Option<usize>,
        }
        let parse = |v: serde_json::Value| serde_json::from_value::<Args>(v).map(|a| a.start);
        assert_eq!(parse(serde_json::json!({"start": 3})).unwrap(), Some(3));
        assert_eq!(parse(serde_json::json!({"start": "12"})).unwrap(), Some(12));
        assert_eq!(parse(serde_json::json!({"start": 4.0})).unwrap(), Some(4));
        assert_eq!(parse(serde_json::json!({})).unwrap(), None);
        assert_eq!(parse(serde_json::json!({"start": null})).unwrap(), None);
        assert!(parse(serde_json::json!({"start": "ten"})).is_err());
    }
}
