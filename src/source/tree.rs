//
//  tree.rs
//  RouteLens
//

use ignore::WalkBuilder;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::language::SupportedLanguage;
use crate::config::ScanConfig;
use crate::error::{Result, RouteError};

/// Tool and VCS directories, skipped wherever they appear.
const ALWAYS_IGNORED: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".gradle",
    "__pycache__",
    ".tox",
    ".venv",
    ".env",
    ".mypy_cache",
    ".pytest_cache",
    ".cache",
];

/// Build output and environment directories. Skipped at the project root
/// or beside a build manifest; anywhere else they are ordinary package
/// names (`com/acme/build`).
const BUILD_OUTPUT: &[&str] = &[
    "vendor", "dist", "build", "out", "venv", "env", "target", "coverage",
];

const BUILD_MANIFESTS: &[&str] = &[
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "Pipfile",
    "package.json",
];

/// The project being scanned.
///
/// Walking is done on every call to [`SourceTree::files`], so a new scan
/// always sees the current state of disk.
#[derive(Debug, Clone)]
pub struct SourceTree {
    backing: Backing,
}

#[derive(Debug, Clone)]
enum Backing {
    Disk {
        root: PathBuf,
        ignore_filename: String,
        extra_ignored: Vec<String>,
    },
    Memory {
        files: Vec<(PathBuf, String)>,
    },
}

impl SourceTree {
    /// A tree rooted at a directory on disk.
    pub fn open(root: impl Into<PathBuf>, config: &ScanConfig) -> Self {
        Self {
            backing: Backing::Disk {
                root: root.into(),
                ignore_filename: config.ignore_filename.clone(),
                extra_ignored: config.extra_ignored_dirs.clone(),
            },
        }
    }

    /// A tree held entirely in memory. Paths are relative to a virtual root.
    pub fn in_memory<I, P, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let mut files: Vec<(PathBuf, String)> = files
            .into_iter()
            .map(|(p, s)| (p.into(), s.into()))
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            backing: Backing::Memory { files },
        }
    }

    /// Root directory for on-disk trees.
    pub fn root(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Disk { root, .. } => Some(root),
            Backing::Memory { .. } => None,
        }
    }

    /// All files in a supported language, in a stable order.
    pub fn files(&self) -> Vec<PathBuf> {
        match &self.backing {
            Backing::Disk {
                root,
                ignore_filename,
                extra_ignored,
            } => WalkBuilder::new(root)
                .hidden(true)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .add_custom_ignore_filename(ignore_filename)
                .sort_by_file_name(|a, b| a.cmp(b))
                .build()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
                .filter(|entry| {
                    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                    !is_ignored(relative, extra_ignored, |dir| {
                        BUILD_MANIFESTS.iter().any(|m| root.join(dir).join(m).is_file())
                    })
                })
                .filter(|entry| SupportedLanguage::from_path(entry.path()).is_some())
                .map(|entry| entry.into_path())
                .collect(),
            Backing::Memory { files } => files
                .iter()
                .map(|(p, _)| p)
                .filter(|p| {
                    !is_ignored(p, &[], |dir| {
                        BUILD_MANIFESTS
                            .iter()
                            .any(|m| files.iter().any(|(f, _)| *f == dir.join(m)))
                    })
                })
                .filter(|p| SupportedLanguage::from_path(p).is_some())
                .cloned()
                .collect(),
        }
    }

    /// Files of one language, in a stable order.
    pub fn files_of(&self, language: SupportedLanguage) -> Vec<PathBuf> {
        self.files()
            .into_iter()
            .filter(|p| SupportedLanguage::from_path(p) == Some(language))
            .collect()
    }

    /// Read one file's contents.
    pub fn read(&self, path: &Path) -> Result<String> {
        match &self.backing {
            Backing::Disk { .. } => {
                fs::read_to_string(path).map_err(|e| RouteError::io(path, e))
            }
            Backing::Memory { files } => files
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, s)| s.clone())
                .ok_or_else(|| {
                    RouteError::io(path, std::io::Error::from(std::io::ErrorKind::NotFound))
                }),
        }
    }

    /// Contents of a build or dependency manifest at the project root
    /// (`pom.xml`, `requirements.txt`, ...).
    pub fn manifest(&self, name: &str) -> Option<String> {
        match &self.backing {
            Backing::Disk { root, .. } => fs::read_to_string(root.join(name)).ok(),
            Backing::Memory { files } => files
                .iter()
                .find(|(p, _)| p.as_path() == Path::new(name))
                .map(|(_, s)| s.clone()),
        }
    }

    /// True when any of the named root manifests mentions any needle
    /// (case-insensitive).
    pub fn manifests_mention(&self, manifests: &[&str], needles: &[&str]) -> bool {
        manifests.iter().filter_map(|m| self.manifest(m)).any(|text| {
            let text = text.to_lowercase();
            needles.iter().any(|n| text.contains(&n.to_lowercase()))
        })
    }
}

/// Check a root-relative path against the ignore lists. `has_manifest`
/// tells whether a root-relative directory holds a build manifest.
fn is_ignored(path: &Path, extra: &[String], has_manifest: impl Fn(&Path) -> bool) -> bool {
    let mut parent = PathBuf::new();
    for component in path.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        let dir = name.to_str().unwrap_or("");
        if ALWAYS_IGNORED.contains(&dir) || extra.iter().any(|e| e == dir) {
            return true;
        }
        if BUILD_OUTPUT.contains(&dir)
            && (parent.as_os_str().is_empty() || has_manifest(&parent))
        {
            return true;
        }
        parent.push(name);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_files_are_sorted_and_filtered() {
        let tree = SourceTree::in_memory([
            ("src/b/Users.java", "class Users {}"),
            ("src/a/app.py", "app = 1"),
            ("README.md", "# readme"),
            ("node_modules/pkg/x.py", "x = 1"),
        ]);
        assert_eq!(
            tree.files(),
            vec![PathBuf::from("src/a/app.py"), PathBuf::from("src/b/Users.java")]
        );
        assert_eq!(
            tree.files_of(SupportedLanguage::Java),
            vec![PathBuf::from("src/b/Users.java")]
        );
    }

    #[test]
    fn test_build_output_names_only_ignored_beside_manifests() {
        let tree = SourceTree::in_memory([
            ("build/generated/Gen.java", "class Gen {}"),
            ("service/build.gradle", "plugins {}"),
            ("service/build/classes/Api.java", "class Api {}"),
            ("service/src/main/java/com/acme/build/BuildController.java", "class B {}"),
            ("src/main/java/com/acme/vendor/VendorApi.java", "class V {}"),
            ("app/env/settings.py", "DEBUG = True"),
        ]);
        assert_eq!(
            tree.files(),
            vec![
                PathBuf::from("app/env/settings.py"),
                PathBuf::from("service/src/main/java/com/acme/build/BuildController.java"),
                PathBuf::from("src/main/java/com/acme/vendor/VendorApi.java"),
            ]
        );
    }

    #[test]
    fn test_manifest_lookup() {
        let tree = SourceTree::in_memory([("requirements.txt", "FastAPI==0.110\nuvicorn\n")]);
        assert!(tree.manifests_mention(&["requirements.txt", "Pipfile"], &["fastapi"]));
        assert!(!tree.manifests_mention(&["requirements.txt"], &["flask"]));
        assert!(tree.manifest("pom.xml").is_none());
    }

    #[test]
    fn test_disk_walk_respects_builtin_and_custom_ignores() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("target/classes")).unwrap();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::create_dir_all(root.join("src/com/acme/out")).unwrap();
        fs::write(root.join("src/com/acme/out/Outbox.java"), "class Outbox {}").unwrap();
        fs::write(root.join("src/Api.java"), "class Api {}").unwrap();
        fs::write(root.join("target/classes/Api.java"), "class Api {}").unwrap();
        fs::write(root.join("generated/Gen.java"), "class Gen {}").unwrap();
        fs::write(root.join(".routeignore"), "generated/\n").unwrap();
        fs::write(root.join("pom.xml"), "<artifactId>spring-boot</artifactId>").unwrap();

        let tree = SourceTree::open(root, &ScanConfig::default());
        let files = tree.files();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("src/Api.java"));
        assert!(files[1].ends_with("src/com/acme/out/Outbox.java"));
        assert_eq!(tree.read(&files[0]).unwrap(), "class Api {}");
        assert!(tree.manifests_mention(&["pom.xml"], &["spring"]));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let tree = SourceTree::in_memory([("a.py", "")]);
        let err = tree.read(Path::new("b.py")).unwrap_err();
        assert!(matches!(err, RouteError::Io { .. }));
    }
}
