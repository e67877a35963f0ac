//! `{filename}` inclusion for user messages.
//!
//! Each `{name}` token is replaced by the named file's content with a short
//! comment header, or by a bracketed notice when the file cannot be used.
//! Files are looked up in a fixed list of workspace directories plus the
//! agent's `uploads/` directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use ua_domain::trace::TraceEvent;

/// Largest file that will be inlined.
pub const MAX_INCLUDE_BYTES: u64 = 2 * 1024 * 1024;

/// Listing stops after this many entries.
const MAX_LISTED_FILES: usize = 500;

/// Directories searched, in priority order, relative to the workspace root.
const SEARCH_DIRS: &[&str] = &[
    ".", "src", "lib", "scripts", "data", "documents", "files", "config", "configs", "examples",
    "samples", "templates",
];

const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Programming languages
    "py", "r", "js", "ts", "jsx", "tsx", "java", "c", "cpp", "cc", "cxx", "h", "hpp", "cs", "php",
    "rb", "go", "rs", "swift", "kt", "scala", "clj", "hs", "ml", "fs", "vb", "pl", "pm", "sh",
    "bash", "zsh", "fish", "ps1", "bat", "cmd", "sql", "html", "htm", "css", "scss", "sass",
    "less", "xml", "xsl", "xslt", "json", "yaml", "yml", "toml", "ini", "cfg", "conf",
    "properties", "env", "dockerfile", "docker", "makefile", "cmake", "gradle", "sbt", "pom",
    "lock", "mod", "sum", "proto", "graphql", "gql", "prisma",
    // Data and markup
    "md", "markdown", "rst", "tex", "latex", "csv", "tsv", "jsonl", "ndjson", "svg", "rss",
    "atom", "plist", "hcl", "tf", "tfvars",
    // Infrastructure
    "nomad", "consul", "vault", "k8s", "kubectl", "helm", "kustomize", "ansible", "inventory",
    "playbook", "requirements", "pipfile",
    // Text and logs
    "txt", "log", "out", "err", "trace", "debug", "info", "warn", "error", "readme", "license",
    "changelog", "authors", "contributors", "todo", "notes", "docs",
    // Notebooks
    "ipynb", "rmd", "qmd", "jl", "m", "octave", "nb",
    // Web and API
    "rest", "http", "api", "postman", "insomnia", "har",
    // Tooling dotfiles written with an extension
    "editorconfig", "gitignore", "gitattributes", "dockerignore", "eslintrc", "prettierrc",
    "babelrc", "webpack", "rollup", "vite", "parcel", "browserslistrc", "nvmrc", "npmrc",
    "yarnrc",
];

const KNOWN_FILENAMES: &[&str] = &[
    "makefile", "dockerfile", "rakefile", "gemfile", "podfile", "readme", "license", "changelog",
    "authors", "contributors", "todo", "manifest", "requirements", "pipfile", "poetry",
    "cmakelists.txt", "configure", "install", "news", "copying",
];

fn token_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("inclusion regex must compile"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolver seam
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Rewrites a user message before it is sent and stored.
pub trait InclusionResolver: Send + Sync {
    fn resolve(&self, text: &str) -> String;
}

/// Leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInclusions;

impl InclusionResolver for NoInclusions {
    fn resolve(&self, text: &str) -> String {
        text.to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workspace resolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct WorkspaceInclusions {
    root: PathBuf,
    uploads: PathBuf,
    max_bytes: u64,
}

/// One row of the `/files` listing.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludableFile {
    pub path: PathBuf,
    pub size: u64,
    pub too_large: bool,
    pub modified: Option<DateTime<Local>>,
}

impl IncludableFile {
    pub fn extension(&self) -> String {
        dotted_extension(&self.path)
    }

    pub fn size_label(&self) -> String {
        let size = self.size as f64;
        if self.too_large {
            format!("{:.1} MB (too large)", size / (1024.0 * 1024.0))
        } else if self.size < 1024 {
            format!("{} bytes", self.size)
        } else if self.size < 1024 * 1024 {
            format!("{:.1} KB", size / 1024.0)
        } else {
            format!("{:.1} MB", size / (1024.0 * 1024.0))
        }
    }
}

impl WorkspaceInclusions {
    /// `root` bounds every included path; `uploads` is searched last and is
    /// also an allowed location.
    pub fn new(root: impl Into<PathBuf>, uploads: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            uploads: uploads.into(),
            max_bytes: MAX_INCLUDE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = SEARCH_DIRS.iter().map(|d| self.root.join(d)).collect();
        dirs.push(self.uploads.clone());
        dirs
    }

    fn is_allowed(&self, path: &Path) -> bool {
        let Ok(resolved) = path.canonicalize() else {
            return false;
        };
        [&self.root, &self.uploads]
            .into_iter()
            .filter_map(|base| base.canonicalize().ok())
            .any(|base| resolved.starts_with(base))
    }

    fn include(&self, name: &str) -> String {
        let found = self
            .search_dirs()
            .into_iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file());

        let (replacement, bytes, outcome) = match found {
            None => {
                tracing::warn!(file = %name, "included file not found");
                (format!("[ERROR: File {name} not found]"), 0, "not_found")
            }
            Some(path) => self.read_included(name, &path),
        };

        TraceEvent::FileIncluded {
            name: name.to_string(),
            bytes,
            outcome: outcome.to_string(),
        }
        .emit();
        replacement
    }

    fn read_included(&self, name: &str, path: &Path) -> (String, usize, &'static str) {
        if !self.is_allowed(path) {
            tracing::warn!(file = %name, "path outside workspace rejected");
            return (format!("[SECURITY: Access denied for {name}]"), 0, "denied");
        }
        if !is_supported_file(path) {
            tracing::warn!(file = %name, "unsupported file type");
            return (format!("[WARNING: Unsupported file type {name}]"), 0, "unsupported");
        }

        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if size > self.max_bytes {
            let max_mb = self.max_bytes / 1024 / 1024;
            tracing::error!(file = %name, size, "included file too large");
            return (
                format!("[ERROR: File {name} too large (max {max_mb}MB)]"),
                0,
                "too_large",
            );
        }

        let content = match std::fs::read(path) {
            Ok(bytes) => decode_text(bytes),
            Err(e) => {
                tracing::error!(file = %name, error = %e, "could not read included file");
                return (format!("[ERROR: Could not read {name}]"), 0, "unreadable");
            }
        };

        tracing::info!(
            file = %name,
            chars = content.chars().count(),
            ext = %dotted_extension(path),
            "included file"
        );
        let bytes = content.len();
        (format!("{}{content}", file_header(name, path)), bytes, "included")
    }

    /// Includable files under the search directories, sorted by path.
    /// Hidden entries are skipped.
    pub fn list_files(&self) -> Vec<IncludableFile> {
        let mut files = Vec::new();
        for dir in self.search_dirs() {
            collect_files(&dir, self.max_bytes, &mut files);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        files.truncate(MAX_LISTED_FILES);
        files
    }
}

impl InclusionResolver for WorkspaceInclusions {
    fn resolve(&self, text: &str) -> String {
        token_regex()
            .replace_all(text, |caps: &Captures<'_>| self.include(&caps[1]))
            .into_owned()
    }
}

fn collect_files(dir: &Path, max_bytes: u64, out: &mut Vec<IncludableFile>) {
    if out.len() >= MAX_LISTED_FILES * 4 {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, max_bytes, out);
        } else if path.is_file() && is_supported_file(&path) {
            let meta = entry.metadata().ok();
            let size = meta.as_ref().map(|m| m.len()).unwrap_or(0);
            out.push(IncludableFile {
                too_large: size > max_bytes,
                size,
                modified: meta
                    .and_then(|m| m.modified().ok())
                    .map(|t: SystemTime| DateTime::<Local>::from(t)),
                path,
            });
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Allow-listed extension, or a well-known extensionless name.
pub fn is_supported_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if ext.is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str())) {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| KNOWN_FILENAMES.contains(&n.to_ascii_lowercase().as_str()))
}

/// `.ext` in lowercase, or an empty string.
fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// UTF-8, falling back to Latin-1 which accepts any byte sequence.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// One-line header in the file's own comment syntax.
pub fn file_header(name: &str, path: &Path) -> String {
    let ext = dotted_extension(path);
    match ext.trim_start_matches('.') {
        "js" | "ts" | "jsx" | "tsx" | "java" | "c" | "cpp" | "cc" | "cxx" | "h" | "hpp" | "cs"
        | "go" | "rs" | "swift" | "kt" | "scala" => format!("// File: {name} ({ext})\n"),
        "html" | "htm" | "xml" | "xsl" | "xslt" | "svg" => format!("<!-- File: {name} ({ext}) -->\n"),
        "css" | "scss" | "sass" | "less" => format!("/* File: {name} ({ext}) */\n"),
        "sql" | "hs" => format!("-- File: {name} ({ext})\n"),
        "php" => format!("<?php\n// File: {name} ({ext})\n"),
        "ml" | "fs" => format!("(* File: {name} ({ext}) *)\n"),
        "clj" => format!(";; File: {name} ({ext})\n"),
        _ => format!("# File: {name} ({ext})\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, WorkspaceInclusions) {
        let tmp = tempfile::tempdir().unwrap();
        let uploads = tmp.path().join("agents/a/uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        let inc = WorkspaceInclusions::new(tmp.path(), uploads);
        (tmp, inc)
    }

    #[test]
    fn text_without_tokens_unchanged() {
        let (_tmp, inc) = workspace();
        assert_eq!(inc.resolve("plain text"), "plain text");
    }

    #[test]
    fn includes_file_with_header() {
        let (tmp, inc) = workspace();
        std::fs::write(tmp.path().join("main.py"), "print('hi')\n").unwrap();
        let out = inc.resolve("Review {main.py} please");
        assert_eq!(out, "Review # File: main.py (.py)\nprint('hi')\n please");
    }

    #[test]
    fn search_dirs_and_uploads_checked() {
        let (tmp, inc) = workspace();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/lib.rs"), "fn x() {}").unwrap();
        std::fs::write(tmp.path().join("agents/a/uploads/notes.md"), "n").unwrap();
        assert!(inc.resolve("{lib.rs}").starts_with("// File: lib.rs (.rs)\n"));
        assert_eq!(inc.resolve("{notes.md}"), "# File: notes.md (.md)\nn");
    }

    #[test]
    fn missing_file_reported() {
        let (_tmp, inc) = workspace();
        assert_eq!(inc.resolve("{nope.txt}"), "[ERROR: File nope.txt not found]");
    }

    #[test]
    fn unsupported_extension_reported() {
        let (tmp, inc) = workspace();
        std::fs::write(tmp.path().join("app.exe"), [0u8, 1, 2]).unwrap();
        assert_eq!(
            inc.resolve("{app.exe}"),
            "[WARNING: Unsupported file type app.exe]"
        );
    }

    #[test]
    fn oversize_file_reported() {
        let (tmp, _) = workspace();
        let inc = WorkspaceInclusions::new(tmp.path(), tmp.path().join("uploads"))
            .with_max_bytes(4);
        std::fs::write(tmp.path().join("big.txt"), "12345").unwrap();
        assert_eq!(
            inc.resolve("{big.txt}"),
            "[ERROR: File big.txt too large (max 0MB)]"
        );
    }

    #[test]
    fn traversal_outside_root_denied() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("ws");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "s").unwrap();
        let inc = WorkspaceInclusions::new(&root, root.join("uploads"));
        assert_eq!(
            inc.resolve("{../secret.txt}"),
            "[SECURITY: Access denied for ../secret.txt]"
        );
    }

    #[test]
    fn known_filenames_without_extension() {
        assert!(is_supported_file(Path::new("Makefile")));
        assert!(is_supported_file(Path::new("CMakeLists.txt")));
        assert!(!is_supported_file(Path::new("binary")));
    }

    #[test]
    fn latin1_fallback() {
        assert_eq!(decode_text(vec![b'c', 0xE9]), "cé");
    }

    #[test]
    fn headers_follow_language() {
        assert_eq!(file_header("q.sql", Path::new("q.sql")), "-- File: q.sql (.sql)\n");
        assert_eq!(
            file_header("i.php", Path::new("i.php")),
            "<?php\n// File: i.php (.php)\n"
        );
        assert_eq!(file_header("Makefile", Path::new("Makefile")), "# File: Makefile ()\n");
    }

    #[test]
    fn listing_skips_hidden_and_unsupported() {
        let (tmp, inc) = workspace();
        std::fs::write(tmp.path().join("a.md"), "x").unwrap();
        std::fs::write(tmp.path().join(".hidden.md"), "x").unwrap();
        std::fs::write(tmp.path().join("b.bin"), "x").unwrap();
        let names: Vec<String> = inc
            .list_files()
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md"]);
    }
}
