//! Key Material
//!
//! Terminal clients are picky about private keys: wrong permission bits or a
//! key on a removable volume make them refuse the file at connect time. Every
//! key a generated script references is therefore copied into one
//! key-output directory first, and scripts point at that copy.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{HostgenError, Result};

/// Extension PuTTY uses for its native key format
pub const PUTTY_KEY_EXTENSION: &str = "ppk";

/// Expand a leading `~` to the invoking user's home directory
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return dirs::home_dir().ok_or(HostgenError::NoHomeDir);
    }
    let stripped = path
        .strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"));
    match stripped {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or(HostgenError::NoHomeDir),
        None => Ok(PathBuf::from(path)),
    }
}

/// Resolves `IdentityFile` references to normalized copies
#[derive(Debug, Clone)]
pub struct KeyMaterialResolver {
    managed_dir: PathBuf,
    output_dir: PathBuf,
    dry_run: bool,
}

/// `path` made absolute against the working directory
fn absolute_dir(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// True when both paths name the same existing file
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl KeyMaterialResolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            managed_dir: absolute_dir(&settings.managed_key_dir),
            output_dir: absolute_dir(&settings.key_output_dir),
            dry_run: false,
        }
    }

    /// Only compute destination paths; never copy
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Absolute source path for `reference`
    pub fn source_path(&self, reference: &str) -> Result<PathBuf> {
        let expanded = expand_tilde(reference)?;
        if expanded.is_absolute() {
            Ok(expanded)
        } else {
            Ok(self.managed_dir.join(expanded))
        }
    }

    /// Resolve `reference` and make sure its copy exists in the key-output
    /// directory. Returns the path of the copy.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let source = self.source_path(reference)?;

        if source.parent() == Some(self.output_dir.as_path()) {
            // Already a normalized copy; it must still exist
            std::fs::metadata(&source).map_err(|e| HostgenError::missing(&source, e))?;
            return Ok(source);
        }

        let file_name = source.file_name().ok_or_else(|| {
            HostgenError::InvalidArgument(format!("key reference has no file name: {reference}"))
        })?;
        let dest = self.output_dir.join(file_name);

        // Reached through `..` or a symlink: copying would truncate it
        if is_same_file(&source, &dest) {
            tracing::debug!("Key {:?} is already the copy at {:?}", source, dest);
            return Ok(dest);
        }

        if self.dry_run {
            std::fs::metadata(&source).map_err(|e| HostgenError::missing(&source, e))?;
            tracing::debug!("Would copy key {:?} -> {:?}", source, dest);
            return Ok(dest);
        }

        std::fs::create_dir_all(&self.output_dir)?;
        copy_key(&source, &dest)?;
        tracing::debug!("Copied key {:?} -> {:?}", source, dest);
        Ok(dest)
    }
}

/// Copy `source` over `dest`, keeping the modification time and tightening
/// permissions to owner-only on Unix.
fn copy_key(source: &Path, dest: &Path) -> Result<()> {
    let metadata = std::fs::metadata(source).map_err(|e| HostgenError::missing(source, e))?;

    // A previous run may have left a read-only copy behind
    if let Ok(existing) = std::fs::metadata(dest) {
        let mut perms = existing.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            std::fs::set_permissions(dest, perms)?;
        }
    }

    std::fs::copy(source, dest).map_err(|e| HostgenError::missing(source, e))?;

    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(dest, mtime)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Rename a key file to PuTTY's `.ppk` naming, keeping its directory.
///
/// - `id_rsa` -> `id_rsa.ppk`
/// - `.ssh` -> `.ssh.ppk` (a dotfile with no further extension)
/// - `key.pub` -> `key.ppk`
pub fn to_native_key_name(path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(HostgenError::InvalidArgument(
            "key file name cannot be empty".to_string(),
        ));
    }

    // Split on either separator; generated scripts target Windows
    let (dir, file_name) = match path.rfind(|c: char| c == '/' || c == '\\') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    };

    let stem = if file_name.starts_with('.') && file_name.matches('.').count() == 1 {
        file_name
    } else {
        match file_name.rsplit_once('.') {
            Some((base, _ext)) => base,
            None => file_name,
        }
    };

    Ok(format!("{dir}{stem}.{PUTTY_KEY_EXTENSION}"))
}
