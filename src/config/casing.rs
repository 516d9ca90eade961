//! Key Casing Lookup
//!
//! Registry keys are written in whatever casing the author used; the lookup
//! file restores the casing OpenSSH documents (e.g. `identityfile` ->
//! `IdentityFile`). The file is INI with a single `[upper]` section.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{HostgenError, Result};
use crate::registry::parse_ini;

/// Section of the lookup file holding the mapping
pub const CASING_SECTION: &str = "upper";

/// Lowercase key name -> display-cased key name
#[derive(Debug, Clone, Default)]
pub struct KeyCasingLookup {
    table: HashMap<String, String>,
}

impl KeyCasingLookup {
    /// Load the lookup table from `path`.
    /// A missing file yields an empty table (every key passes through).
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Key casing file {:?} not found, keys pass through unchanged", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(HostgenError::missing(path, e)),
        };

        let lookup = Self::parse(&content)?;
        tracing::debug!("Loaded {} key casing entries from {:?}", lookup.len(), path);
        Ok(lookup)
    }

    /// Parse lookup file content
    pub fn parse(content: &str) -> Result<Self> {
        let ini = parse_ini(content)?;
        let table: HashMap<String, String> = ini
            .section(Some(CASING_SECTION))
            .map(|props| {
                props
                    .iter()
                    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self { table })
    }

    /// Build a lookup from `(key, display)` pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
        }
    }

    /// Display casing for `key`, or `key` itself when not in the table
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.table
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
