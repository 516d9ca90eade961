//! Generator Settings
//!
//! Every fixed path the generator reads or writes lives here, so tests can
//! redirect the whole run into a temporary directory.
//! Settings location: ~/.hostgen on macOS/Linux, %APPDATA%\Hostgen on Windows

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HostgenError, Result};

/// Default Tera Term executable, expanded by cmd.exe at launch time
pub const DEFAULT_TERATERM_EXE: &str = r"%programfiles(x86)%\teraterm5\ttermpro.exe";

/// Default PuTTY executable, expanded by cmd.exe at launch time
pub const DEFAULT_PUTTY_EXE: &str = r"%programfiles%\PuTTY\putty.exe";

/// Default corkscrew binary used by PuTTY to traverse HTTP proxies
pub const DEFAULT_CORKSCREW_EXE: &str =
    r"C:\Program Files\Tencent\WeTERM\resources\external\win32\x86\corkscrew.exe";

/// Get the hostgen configuration directory
/// Returns %APPDATA%\Hostgen on Windows, ~/.hostgen on macOS/Linux
pub fn config_dir() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("Hostgen"));
        }
        dirs::home_dir()
            .map(|home| home.join(".hostgen"))
            .ok_or(HostgenError::NoHomeDir)
    }

    #[cfg(not(windows))]
    {
        dirs::home_dir()
            .map(|home| home.join(".hostgen"))
            .ok_or(HostgenError::NoHomeDir)
    }
}

/// Get the settings file path
pub fn settings_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("settings.json"))
}

/// Get the OpenSSH client config the real `ssh` binary consults
pub fn default_live_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("config"))
        .ok_or(HostgenError::NoHomeDir)
}

/// Paths and executables used by one generation run.
///
/// Any field missing from `settings.json` falls back to the layout under
/// [`config_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// INI host registry
    pub registry_file: PathBuf,
    /// INI file with the `[upper]` key casing table
    pub casing_file: PathBuf,
    /// Base directory for relative `IdentityFile` references
    pub managed_key_dir: PathBuf,
    /// Directory holding the normalized key copies scripts point at
    pub key_output_dir: PathBuf,
    pub teraterm_script_dir: PathBuf,
    pub putty_script_dir: PathBuf,
    /// Informational config copy, never backed up
    pub auto_config_file: PathBuf,
    /// Config consulted by `ssh`, backed up before every overwrite
    pub live_config_file: PathBuf,
    pub teraterm_exe: String,
    pub putty_exe: String,
    pub corkscrew_exe: String,
}

impl Settings {
    /// Settings rooted at `root`, with the live config at `live_config_file`.
    pub fn with_layout(root: &Path, live_config_file: PathBuf) -> Self {
        let out = root.join("out");
        Self {
            registry_file: root.join("ssh-host.ini"),
            casing_file: root.join("upper-case.ini"),
            managed_key_dir: root.join("sshkey"),
            key_output_dir: out.join("sshkey"),
            teraterm_script_dir: out.join("tth"),
            putty_script_dir: out.join("pth"),
            auto_config_file: out.join("ssh-cfg-auto-generate").join("config"),
            live_config_file,
            teraterm_exe: DEFAULT_TERATERM_EXE.to_string(),
            putty_exe: DEFAULT_PUTTY_EXE.to_string(),
            corkscrew_exe: DEFAULT_CORKSCREW_EXE.to_string(),
        }
    }

    /// Every path, the live config included, under `root` (for testing)
    pub fn rooted_at(root: &Path) -> Self {
        Self::with_layout(root, root.join("dot-ssh").join("config"))
    }

    /// Default layout under [`config_dir`]
    pub fn new() -> Result<Self> {
        Ok(Self::with_layout(&config_dir()?, default_live_config_path()?))
    }

    /// Load settings, overlaying `path` (or the default settings file) on the
    /// default layout. A missing settings file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => settings_file()?,
        };
        let defaults = Self::new()?;

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let overrides: SettingsFile = serde_json::from_str(&contents)?;
                tracing::debug!("Loaded settings from {:?}", path);
                let base = absolute_parent(&path);
                Ok(overrides.apply(defaults).relative_to(&base))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {:?}, using defaults", path);
                Ok(defaults)
            }
            Err(e) => Err(HostgenError::missing(path, e)),
        }
    }

    /// Join every relative path onto `base`
    pub fn relative_to(self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            registry_file: join(self.registry_file),
            casing_file: join(self.casing_file),
            managed_key_dir: join(self.managed_key_dir),
            key_output_dir: join(self.key_output_dir),
            teraterm_script_dir: join(self.teraterm_script_dir),
            putty_script_dir: join(self.putty_script_dir),
            auto_config_file: join(self.auto_config_file),
            live_config_file: join(self.live_config_file),
            ..self
        }
    }
}

/// Directory holding `path`, made absolute
fn absolute_parent(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
}

/// On-disk settings: every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsFile {
    registry_file: Option<PathBuf>,
    casing_file: Option<PathBuf>,
    managed_key_dir: Option<PathBuf>,
    key_output_dir: Option<PathBuf>,
    teraterm_script_dir: Option<PathBuf>,
    putty_script_dir: Option<PathBuf>,
    auto_config_file: Option<PathBuf>,
    live_config_file: Option<PathBuf>,
    teraterm_exe: Option<String>,
    putty_exe: Option<String>,
    corkscrew_exe: Option<String>,
}

impl SettingsFile {
    fn apply(self, base: Settings) -> Settings {
        Settings {
            registry_file: self.registry_file.unwrap_or(base.registry_file),
            casing_file: self.casing_file.unwrap_or(base.casing_file),
            managed_key_dir: self.managed_key_dir.unwrap_or(base.managed_key_dir),
            key_output_dir: self.key_output_dir.unwrap_or(base.key_output_dir),
            teraterm_script_dir: self.teraterm_script_dir.unwrap_or(base.teraterm_script_dir),
            putty_script_dir: self.putty_script_dir.unwrap_or(base.putty_script_dir),
            auto_config_file: self.auto_config_file.unwrap_or(base.auto_config_file),
            live_config_file: self.live_config_file.unwrap_or(base.live_config_file),
            teraterm_exe: self.teraterm_exe.unwrap_or(base.teraterm_exe),
            putty_exe: self.putty_exe.unwrap_or(base.putty_exe),
            corkscrew_exe: self.corkscrew_exe.unwrap_or(base.corkscrew_exe),
        }
    }
}
