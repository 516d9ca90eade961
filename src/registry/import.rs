//! OpenSSH Config Import
//!
//! Scrapes host entries out of OpenSSH-style config text so older setups can
//! be folded into the registry:
//! - `OpenSshConfigSource`: one config file with many `Host` blocks
//! - `SnippetDirSource`: a directory of `*.cfg` files, one host each
//!
//! Only plain `Key Value` directives are carried over. `ProxyCommand` has no
//! typed equivalent in the registry and is dropped.

use std::path::{Path, PathBuf};

use super::{HostSource, RegistryEntry};
use crate::error::{HostgenError, Result};

/// Split a directive line into `(key, value)`.
/// The value is the remaining words joined by single spaces.
fn split_directive(line: &str) -> Option<(&str, String)> {
    let mut words = line.split_whitespace();
    let key = words.next()?;
    let value = words.collect::<Vec<_>>().join(" ");
    Some((key, value))
}

/// First pattern of a `Host` line, if the line is one
fn host_pattern(line: &str) -> Option<&str> {
    let mut words = line.split_whitespace();
    match words.next() {
        Some(key) if key.eq_ignore_ascii_case("host") => words.next(),
        _ => None,
    }
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Rewrite an MSYS drive path (`/c/Users/me/.ssh/id_rsa`) as a Windows path
/// (`c:\Users\me\.ssh\id_rsa`). Anything else is returned unchanged.
pub fn msys_to_windows_path(value: &str) -> String {
    let bytes = value.as_bytes();
    let is_drive_path = bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b'/';
    if !is_drive_path {
        return value.to_string();
    }

    let drive = &value[1..2];
    let rest = value[3..].replace('/', "\\");
    format!("{}:\\{}", drive, rest)
}

/// Parse OpenSSH config content into registry entries
pub fn parse_openssh_config(content: &str) -> Vec<RegistryEntry> {
    let mut entries: Vec<RegistryEntry> = Vec::new();
    let mut current: Option<RegistryEntry> = None;

    for line in content.lines() {
        if is_skippable(line) {
            continue;
        }

        if let Some(pattern) = host_pattern(line) {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some(RegistryEntry::new(pattern));
            continue;
        }

        // Directives before the first Host apply globally; not a host
        let Some(ref mut entry) = current else {
            continue;
        };
        if let Some((key, value)) = split_directive(line) {
            if key.eq_ignore_ascii_case("proxycommand") {
                tracing::debug!("Dropping ProxyCommand for {}", entry.name());
                continue;
            }
            entry.set(key, msys_to_windows_path(&value));
        }
    }

    if let Some(entry) = current {
        entries.push(entry);
    }

    entries
        .into_iter()
        .filter(|e| !e.name().starts_with('*'))
        .collect()
}

/// Parse one snippet file. The last `Host` line names the entry; lines before
/// the first `Host` are ignored.
pub fn parse_snippet(content: &str) -> Option<RegistryEntry> {
    let mut name: Option<&str> = None;
    let mut pairs: Vec<(&str, String)> = Vec::new();

    for line in content.lines() {
        if let Some(pattern) = host_pattern(line) {
            name = Some(pattern);
            continue;
        }
        if is_skippable(line) || name.is_none() {
            continue;
        }
        if let Some((key, value)) = split_directive(line) {
            pairs.push((key, value));
        }
    }

    let name = name?;
    if name.starts_with('*') {
        return None;
    }

    let mut entry = RegistryEntry::new(name);
    for (key, value) in pairs {
        entry.set(key, value);
    }
    Some(entry)
}

/// Hosts from a single OpenSSH config file
#[derive(Debug, Clone)]
pub struct OpenSshConfigSource {
    path: PathBuf,
}

impl OpenSshConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HostSource for OpenSshConfigSource {
    fn name(&self) -> &str {
        "openssh-config"
    }

    fn load(&self) -> Result<Vec<RegistryEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No OpenSSH config at {:?}", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(HostgenError::missing(&self.path, e)),
        };
        Ok(parse_openssh_config(&content))
    }
}

/// Hosts from a directory of `*.cfg` snippets
#[derive(Debug, Clone)]
pub struct SnippetDirSource {
    dir: PathBuf,
}

impl SnippetDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn snippet_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_snippet(p))
            .collect();
        // read_dir order is platform dependent
        paths.sort();
        Ok(paths)
    }
}

fn is_snippet(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "cfg")
}

impl HostSource for SnippetDirSource {
    fn name(&self) -> &str {
        "snippet-dir"
    }

    fn load(&self) -> Result<Vec<RegistryEntry>> {
        if !self.dir.is_dir() {
            tracing::debug!("No snippet directory at {:?}", self.dir);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for path in self.snippet_paths()? {
            let content =
                std::fs::read_to_string(&path).map_err(|e| HostgenError::missing(&path, e))?;
            match parse_snippet(&content) {
                Some(entry) => entries.push(entry),
                None => tracing::debug!("Snippet {:?} names no usable host", path),
            }
        }
        Ok(entries)
    }
}
