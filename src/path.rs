//! Include search-path context.
//!
//! The parser core never interprets include directives itself; this
//! context exists for the downstream loader, which resolves a symbolic
//! file name against an ordered list of directories. The default list
//! comes from the `EPICS_DB_INCLUDE_PATH` environment variable, falling
//! back to the current directory when it is unset.

use std::fs::File;
use std::path::{Path, PathBuf};

/// Environment variable supplying the default search path.
pub const PATH_ENV: &str = "EPICS_DB_INCLUDE_PATH";

#[cfg(windows)]
const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: char = ':';

/// Split a path-list specification into its directory elements.
/// Elements are separated by whitespace or the platform path-list
/// separator; empty elements are skipped.
pub fn split_path_list(spec: &str) -> impl Iterator<Item = &str> {
    spec.split(|c: char| c.is_whitespace() || c == PATH_LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
}

/// Ordered directory search list for resolving DBD file names, plus the
/// loader's include-permission flag.
#[derive(Debug, Clone)]
pub struct DbdContext {
    paths: Vec<PathBuf>,
    allow_include: bool,
}

impl DbdContext {
    /// Create a context seeded from [`PATH_ENV`], or from the current
    /// directory when the variable is unset.
    pub fn new() -> Self {
        let mut ctxt = Self::bare();
        match std::env::var(PATH_ENV) {
            Ok(spec) => ctxt.add_paths(&spec),
            Err(_) => ctxt.add_path("."),
        }
        ctxt
    }

    /// Create a context with an empty search list.
    pub fn bare() -> Self {
        Self {
            paths: Vec::new(),
            allow_include: true,
        }
    }

    /// Whether the loader may follow include directives.
    pub fn allow_include(&self) -> bool {
        self.allow_include
    }

    /// Permit or forbid include directives for the loader.
    pub fn set_allow_include(&mut self, allow: bool) {
        self.allow_include = allow;
    }

    /// The current search list, in resolution order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Replace the search list with the elements of `spec`.
    pub fn set_paths(&mut self, spec: &str) {
        self.paths.clear();
        self.add_paths(spec);
    }

    /// Append the elements of `spec` to the search list.
    pub fn add_paths(&mut self, spec: &str) {
        for dir in split_path_list(spec) {
            self.add_path(dir);
        }
    }

    /// Append a single directory to the search list.
    pub fn add_path(&mut self, dir: impl Into<PathBuf>) {
        self.paths.push(dir.into());
    }

    /// Resolve `name` to the first existing, readable file in search
    /// order, or `None` when no directory holds it.
    pub fn find_file(&self, name: impl AsRef<Path>) -> Option<PathBuf> {
        let name = name.as_ref();
        for dir in &self.paths {
            let candidate = dir.join(name);
            if File::open(&candidate).is_ok() {
                return Some(candidate);
            }
        }
        None
    }
}

impl Default for DbdContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_split_on_whitespace() {
        let parts: Vec<&str> = split_path_list("  a\tb  c ").collect();
        assert_eq!(parts, ["a", "b", "c"]);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_split_on_separator() {
        let parts: Vec<&str> = split_path_list("dbd:../dbd::/opt/epics/dbd").collect();
        assert_eq!(parts, ["dbd", "../dbd", "/opt/epics/dbd"]);
    }

    #[test]
    fn test_bare_has_no_paths() {
        let ctxt = DbdContext::bare();
        assert!(ctxt.paths().is_empty());
        assert!(ctxt.find_file("anything.dbd").is_none());
    }

    #[test]
    fn test_set_paths_replaces() {
        let mut ctxt = DbdContext::bare();
        ctxt.add_path("old");
        ctxt.set_paths("new1 new2");
        let got: Vec<_> = ctxt.paths().iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(got, ["new1", "new2"]);
    }

    #[test]
    fn test_find_file_first_match_wins() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        fs::write(dir_b.path().join("common.dbd"), "x(1)\n").unwrap();
        fs::write(dir_a.path().join("shadow.dbd"), "a(1)\n").unwrap();
        fs::write(dir_b.path().join("shadow.dbd"), "b(1)\n").unwrap();

        let mut ctxt = DbdContext::bare();
        ctxt.add_path(dir_a.path());
        ctxt.add_path(dir_b.path());

        let common = ctxt.find_file("common.dbd").unwrap();
        assert!(common.starts_with(dir_b.path()));

        let shadow = ctxt.find_file("shadow.dbd").unwrap();
        assert!(shadow.starts_with(dir_a.path()));

        assert!(ctxt.find_file("missing.dbd").is_none());
    }

    #[test]
    fn test_include_flag() {
        let mut ctxt = DbdContext::bare();
        assert!(ctxt.allow_include());
        ctxt.set_allow_include(false);
        assert!(!ctxt.allow_include());
    }
}
