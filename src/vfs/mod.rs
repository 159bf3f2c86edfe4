//! Location resolution and file access.
//!
//! A `FileHandle` abstracts one addressable location (local path, FTP URI,
//! any file-like resource) behind existence/size queries, container
//! enumeration, offset reads, and append writes. `FileAccess` resolves
//! location strings to handles by matching registered scheme prefixes, and
//! carries a per-scheme options table (encoding, passive mode, timeouts)
//! that providers receive at resolve time.
//!
//! Handle calls may block (network providers); the copy loop runs on a
//! blocking worker for exactly this reason.

mod local;

pub use local::LocalProvider;

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

/// One resolvable location.
pub trait FileHandle: Send + Sync {
    /// Canonical URI for this location. Job identity and dedup key off it.
    fn uri(&self) -> &str;

    /// Base name (last path segment).
    fn name(&self) -> &str;

    fn exists(&self) -> io::Result<bool>;

    /// Size in bytes. Errors when the location does not exist.
    fn size(&self) -> io::Result<u64>;

    /// True when the location can enumerate children (directory-like).
    fn is_container(&self) -> io::Result<bool>;

    /// Direct children of a container.
    fn children(&self) -> io::Result<Vec<Arc<dyn FileHandle>>>;

    /// Parent location, when one exists.
    fn parent(&self) -> Option<Arc<dyn FileHandle>>;

    /// Create this location as a container, including intermediate paths.
    /// Succeeds when it already exists.
    fn create_container(&self) -> io::Result<()>;

    /// Reader positioned at `offset` bytes into the resource.
    fn open_read_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>>;

    /// Append-mode writer, creating the leaf when missing.
    fn open_append(&self) -> io::Result<Box<dyn Write + Send>>;
}

/// Per-scheme options applied when resolving a location. The defaults match
/// what a well-behaved FTP client wants; local resolution ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeOptions {
    /// Control-channel character encoding.
    pub control_encoding: String,
    /// Use passive-mode data connections.
    pub passive_mode: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub data_timeout_secs: u64,
    /// Treat the login directory as the path root.
    pub user_dir_is_root: bool,
}

impl Default for SchemeOptions {
    fn default() -> Self {
        Self {
            control_encoding: "UTF-8".to_string(),
            passive_mode: true,
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
            data_timeout_secs: 10,
            user_dir_is_root: true,
        }
    }
}

impl SchemeOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_secs)
    }
}

/// Resolves location strings for one scheme family.
pub trait FileProvider: Send + Sync {
    fn resolve(
        &self,
        location: &str,
        options: Option<&SchemeOptions>,
    ) -> Result<Arc<dyn FileHandle>, Error>;
}

/// Scheme-prefix provider registry with the per-scheme options table.
///
/// Prefixes match case-insensitively (`FTP://HOST/x` picks the `ftp://`
/// entry). Locations matching no registered prefix fall back to the local
/// provider.
pub struct FileAccess {
    providers: Vec<(String, Arc<dyn FileProvider>)>,
    options: Vec<(String, SchemeOptions)>,
    fallback: Arc<dyn FileProvider>,
}

impl FileAccess {
    /// Registry with the local provider and the default `ftp://` options.
    pub fn new() -> Self {
        Self::with_ftp_options(SchemeOptions::default())
    }

    /// Registry seeded with explicit `ftp://` options (from config).
    pub fn with_ftp_options(ftp: SchemeOptions) -> Self {
        let local: Arc<dyn FileProvider> = Arc::new(LocalProvider);
        Self {
            providers: vec![("file://".to_string(), Arc::clone(&local))],
            options: vec![("ftp://".to_string(), ftp)],
            fallback: local,
        }
    }

    /// Register a provider for a scheme prefix, e.g. `ftp://`.
    pub fn register(&mut self, prefix: impl Into<String>, provider: Arc<dyn FileProvider>) {
        self.providers.push((prefix.into(), provider));
    }

    /// Set or replace the options entry for a scheme prefix.
    pub fn set_options(&mut self, prefix: impl Into<String>, options: SchemeOptions) {
        let prefix = prefix.into();
        self.options.retain(|(p, _)| *p != prefix);
        self.options.push((prefix, options));
    }

    /// Resolve a location string to a handle via the first matching
    /// provider, passing along the scheme's options entry if one exists.
    pub fn resolve(&self, location: &str) -> Result<Arc<dyn FileHandle>, Error> {
        let options = self.options_for(location);
        for (prefix, provider) in &self.providers {
            if starts_with_ignore_case(location, prefix) {
                return provider.resolve(location, options);
            }
        }
        self.fallback.resolve(location, options)
    }

    fn options_for(&self, location: &str) -> Option<&SchemeOptions> {
        self.options
            .iter()
            .find(|(prefix, _)| starts_with_ignore_case(location, prefix))
            .map(|(_, options)| options)
    }
}

impl Default for FileAccess {
    fn default() -> Self {
        Self::new()
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_is_case_insensitive() {
        assert!(starts_with_ignore_case("FTP://host/x", "ftp://"));
        assert!(starts_with_ignore_case("ftp://host/x", "ftp://"));
        assert!(!starts_with_ignore_case("sftp://host/x", "ftp://"));
        assert!(!starts_with_ignore_case("ftp", "ftp://"));
    }

    #[test]
    fn options_table_matches_scheme() {
        let mut access = FileAccess::new();
        assert!(access.options_for("ftp://host/file").is_some());
        assert!(access.options_for("/plain/path").is_none());

        let mut custom = SchemeOptions::default();
        custom.passive_mode = false;
        access.set_options("ftp://", custom);
        assert!(!access.options_for("FTP://host/f").unwrap().passive_mode);
        // Replaced, not duplicated.
        assert_eq!(access.options.len(), 1);
    }

    #[test]
    fn default_options_mirror_ftp_client_expectations() {
        let options = SchemeOptions::default();
        assert_eq!(options.control_encoding, "UTF-8");
        assert!(options.passive_mode);
        assert!(options.user_dir_is_root);
        assert_eq!(options.connect_timeout(), Duration::from_secs(10));
        assert_eq!(options.read_timeout(), Duration::from_secs(10));
        assert_eq!(options.data_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn unknown_scheme_is_rejected_by_fallback() {
        let access = FileAccess::new();
        assert!(access.resolve("gopher://host/doc").is_err());
    }

    #[test]
    fn registered_provider_owns_its_scheme() {
        struct Unreachable;

        impl FileProvider for Unreachable {
            fn resolve(
                &self,
                location: &str,
                _options: Option<&SchemeOptions>,
            ) -> Result<Arc<dyn FileHandle>, Error> {
                Err(Error::resolution(
                    location,
                    io::Error::new(io::ErrorKind::TimedOut, "host down"),
                ))
            }
        }

        let mut access = FileAccess::new();
        access.register("ftp://", Arc::new(Unreachable));
        let err = match access.resolve("FTP://host/file.bin") {
            Ok(_) => panic!("expected resolution error"),
            Err(e) => e,
        };
        match err {
            Error::Resolution { location, source } => {
                assert_eq!(location, "FTP://host/file.bin");
                assert_eq!(source.kind(), io::ErrorKind::TimedOut);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
