//! Route prefix matching logic.
//!
//! # Responsibilities
//! - Normalize configured prefixes to `/name/` form
//! - Match request paths against a prefix
//! - Strip a matched prefix, keeping the remainder rooted at `/`
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

/// A route prefix that always begins and ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    /// Create a prefix, adding the leading and trailing separators if missing.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        let mut prefix = String::with_capacity(raw.len() + 2);
        if !raw.starts_with('/') {
            prefix.push('/');
        }
        prefix.push_str(raw);
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self { prefix }
    }

    /// The normalized prefix, e.g. `/proxy/`.
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// The prefix without its trailing separator, e.g. `/proxy`.
    pub fn mount_path(&self) -> &str {
        &self.prefix[..self.prefix.len() - 1]
    }

    pub fn is_root(&self) -> bool {
        self.prefix == "/"
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Remove the prefix from `path`. The remainder keeps a leading `/`.
    ///
    /// Returns `None` when the path is not below this prefix.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        // Keep the prefix's trailing slash as the remainder's leading slash.
        path.strip_prefix(self.mount_path())
            .filter(|rest| rest.starts_with('/'))
    }
}

impl std::fmt::Display for PathPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(PathPrefix::new("proxy").as_str(), "/proxy/");
        assert_eq!(PathPrefix::new("/proxy").as_str(), "/proxy/");
        assert_eq!(PathPrefix::new("/proxy/").as_str(), "/proxy/");
        assert_eq!(PathPrefix::new(" /a/b ").as_str(), "/a/b/");
        assert_eq!(PathPrefix::new("").as_str(), "/");
        assert!(PathPrefix::new("/").is_root());
    }

    #[test]
    fn test_mount_path() {
        assert_eq!(PathPrefix::new("/static").mount_path(), "/static");
        assert_eq!(PathPrefix::new("/").mount_path(), "");
    }

    #[test]
    fn test_path_matcher() {
        let prefix = PathPrefix::new("/api");
        assert!(prefix.matches("/api/v1"));
        assert!(prefix.matches("/api/"));
        assert!(!prefix.matches("/api"));
        assert!(!prefix.matches("/apiv1"));
        assert!(!prefix.matches("/images"));
    }

    #[test]
    fn test_strip() {
        let prefix = PathPrefix::new("/proxy/");
        assert_eq!(prefix.strip("/proxy/x"), Some("/x"));
        assert_eq!(prefix.strip("/proxy/a/b/"), Some("/a/b/"));
        assert_eq!(prefix.strip("/proxy/"), Some("/"));
        assert_eq!(prefix.strip("/proxy"), None);
        assert_eq!(prefix.strip("/proxyx/y"), None);
        assert_eq!(prefix.strip("/other/x"), None);
    }
}
