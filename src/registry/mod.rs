//! Host Registry
//!
//! The INI file listing every host. Each section is one host; its keys are
//! kept in declaration order so the generated OpenSSH stanza mirrors what the
//! author wrote.
//!
//! Other config dialects can be merged in through [`HostSource`].

pub mod import;

use ini::{Ini, ParseOption};
use std::path::Path;

use crate::error::{HostgenError, Result};

pub use import::{OpenSshConfigSource, SnippetDirSource};

/// Section whose keys every host inherits
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Parse INI text the way the registry expects it: values verbatim, no quote
/// stripping and no backslash escapes (Windows paths are common here).
pub(crate) fn parse_ini(content: &str) -> Result<Ini> {
    let opt = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    Ok(Ini::load_from_str_opt(content, opt)?)
}

/// Raw key/value pairs of one registry section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryEntry {
    name: String,
    pairs: Vec<(String, String)>,
}

impl RegistryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pairs: Vec::new(),
        }
    }

    /// Section name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set `key` to `value`. An existing key (compared case-insensitively)
    /// keeps its position and spelling; only the value is replaced.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .pairs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Builder form of [`RegistryEntry::set`]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Case-insensitive lookup. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A provider of host entries in some foreign config dialect
pub trait HostSource {
    /// Short label used in log messages
    fn name(&self) -> &str;

    /// Read every host entry the source knows about
    fn load(&self) -> Result<Vec<RegistryEntry>>;
}

/// All hosts, in section declaration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Load the registry file. A missing file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HostgenError::missing(path, e))?;
        let registry = Self::parse(&content)?;
        tracing::info!("Loaded {} hosts from {:?}", registry.len(), path);
        Ok(registry)
    }

    /// Parse registry content
    pub fn parse(content: &str) -> Result<Self> {
        let ini = parse_ini(content)?;
        let mut defaults = RegistryEntry::new(DEFAULT_SECTION);
        let mut entries: Vec<RegistryEntry> = Vec::new();

        for (section, props) in ini.iter() {
            let Some(section) = section else {
                if !props.is_empty() {
                    tracing::warn!("Ignoring {} keys outside any section", props.len());
                }
                continue;
            };

            let target = if section == DEFAULT_SECTION {
                &mut defaults
            } else {
                // A repeated section header continues the earlier section
                match entries.iter().position(|e| e.name == section) {
                    Some(idx) => &mut entries[idx],
                    None => {
                        entries.push(RegistryEntry::new(section));
                        let last = entries.len() - 1;
                        &mut entries[last]
                    }
                }
            };
            for (key, value) in props.iter() {
                target.set(key.trim(), value.trim());
            }
        }

        if !defaults.is_empty() {
            for entry in &mut entries {
                for (key, value) in defaults.iter() {
                    if !entry.contains_key(key) {
                        entry.set(key, value);
                    }
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    /// Append entries from `source` whose names are not already sections.
    /// Returns how many entries were added.
    pub fn merge_from(&mut self, source: &dyn HostSource) -> Result<usize> {
        let mut added = 0;
        for entry in source.load()? {
            if self.contains(entry.name()) {
                tracing::debug!(
                    "Skipping {} from {}: already defined",
                    entry.name(),
                    source.name()
                );
                continue;
            }
            self.entries.push(entry);
            added += 1;
        }
        tracing::info!("Merged {} hosts from {}", added, source.name());
        Ok(added)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_sections_in_order() {
        let content = r#"
[web]
HostName = web.example.com
Port = 2222
User = deploy

[db]
User = postgres
IdentityFile = C:\keys\db_rsa
"#;

        let registry = Registry::parse(content).unwrap();
        let names: Vec<&str> = registry.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["web", "db"]);

        let web = registry.get("web").unwrap();
        let keys: Vec<&str> = web.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["HostName", "Port", "User"]);

        // Backslashes survive verbatim
        let db = registry.get("db").unwrap();
        assert_eq!(db.get("identityfile"), Some(r"C:\keys\db_rsa"));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let entry = RegistryEntry::new("h").with("hostname", "a.example");
        assert_eq!(entry.get("HostName"), Some("a.example"));
        assert!(entry.contains_key("HOSTNAME"));
    }

    #[test]
    fn test_duplicate_key_replaces_in_place() {
        let mut entry = RegistryEntry::new("h").with("User", "a").with("Port", "22");
        entry.set("user", "b");

        let pairs: Vec<(&str, &str)> = entry.iter().collect();
        assert_eq!(pairs, vec![("User", "b"), ("Port", "22")]);
    }

    #[test]
    fn test_empty_value_is_unset() {
        let entry = RegistryEntry::new("h").with("Password", "");
        assert_eq!(entry.get("Password"), None);
        assert!(entry.contains_key("Password"));
    }

    #[test]
    fn test_default_section_inherited() {
        let content = r#"
[DEFAULT]
User = admin
ServerAliveInterval = 60

[a]
User = root

[b]
HostName = b.example
"#;

        let registry = Registry::parse(content).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(DEFAULT_SECTION));

        let a = registry.get("a").unwrap();
        assert_eq!(a.get("User"), Some("root"));
        assert_eq!(a.get("ServerAliveInterval"), Some("60"));

        let b = registry.get("b").unwrap();
        let keys: Vec<&str> = b.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["HostName", "User", "ServerAliveInterval"]);
    }

    #[test]
    fn test_load_missing_registry() {
        let temp = tempdir().unwrap();
        let err = Registry::load(&temp.path().join("nope.ini")).unwrap_err();
        assert!(matches!(err, HostgenError::MissingFile { .. }));
    }

    struct FixedSource(Vec<RegistryEntry>);

    impl HostSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn load(&self) -> Result<Vec<RegistryEntry>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_merge_keeps_existing_sections() {
        let mut registry = Registry::parse("[a]\nUser = mine\n").unwrap();
        let source = FixedSource(vec![
            RegistryEntry::new("a").with("User", "theirs"),
            RegistryEntry::new("c").with("User", "new"),
        ]);

        let added = registry.merge_from(&source).unwrap();
        assert_eq!(added, 1);
        assert_eq!(registry.get("a").unwrap().get("User"), Some("mine"));
        assert_eq!(registry.get("c").unwrap().get("User"), Some("new"));
    }
}
