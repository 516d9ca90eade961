//! Config Assembly
//!
//! Drives one generation pass over the registry:
//! 1. Render the OpenSSH stanza for every section (key casing fixed)
//! 2. Build each `HostRecord` and write its Tera Term and PuTTY scripts
//! 3. Write the config text to the auto-generated target, then back up and
//!    overwrite the live `~/.ssh/config`
//!
//! Everything runs synchronously in registry declaration order.

use chrono::Local;
use std::path::{Path, PathBuf};

use crate::config::{KeyCasingLookup, Settings};
use crate::error::Result;
use crate::host::{HostRecord, KeyMaterialResolver};
use crate::launcher::{LaunchScript, PuttyScript, TeraTermScript};
use crate::registry::{Registry, RegistryEntry};

/// Indentation of directives under a `Host` line
const STANZA_INDENT: &str = "    ";

/// Timestamp format of live-config backups
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Backup step errors. Always logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Failed to back up {path:?}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scripts written for one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostArtifacts {
    pub name: String,
    pub teraterm_script: PathBuf,
    pub putty_script: PathBuf,
}

/// Result of one generation pass
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// Normalized OpenSSH config text
    pub config_text: String,
    pub hosts: Vec<HostArtifacts>,
}

/// Where the config text ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenConfig {
    pub auto_config: PathBuf,
    pub live_config: PathBuf,
    /// `None` when there was nothing to back up or the backup failed
    pub backup: Option<PathBuf>,
}

/// Render the OpenSSH stanza for one registry section
pub fn render_stanza(entry: &RegistryEntry, casing: &KeyCasingLookup) -> String {
    let mut stanza = format!("Host {}\n", entry.name());
    for (key, value) in entry.iter() {
        stanza.push_str(STANZA_INDENT);
        stanza.push_str(casing.get(key));
        stanza.push(' ');
        stanza.push_str(value);
        stanza.push('\n');
    }
    stanza
}

/// `<path>.bak-<YYYYMMDD-HHMMSS>` for the current local time
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT);
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".bak-{}", stamp));
    PathBuf::from(name)
}

/// Copy `path` to a timestamped backup if it exists.
/// Returns the backup path, or `None` when there was nothing to back up.
pub fn backup_existing(path: &Path) -> std::result::Result<Option<PathBuf>, BackupError> {
    if !path.is_file() {
        return Ok(None);
    }

    let backup = backup_path(path);
    std::fs::copy(path, &backup).map_err(|source| BackupError::Copy {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(backup))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// One generation pass, configured by [`Settings`]
pub struct ConfigAssembler {
    settings: Settings,
    casing: KeyCasingLookup,
    keys: KeyMaterialResolver,
    teraterm: TeraTermScript,
    putty: PuttyScript,
    dry_run: bool,
}

impl ConfigAssembler {
    /// Build an assembler, loading the key casing table from the settings
    pub fn new(settings: Settings) -> Result<Self> {
        let casing = KeyCasingLookup::load(&settings.casing_file)?;
        Ok(Self::with_casing(settings, casing))
    }

    pub fn with_casing(settings: Settings, casing: KeyCasingLookup) -> Self {
        Self {
            keys: KeyMaterialResolver::new(&settings),
            teraterm: TeraTermScript::new(&settings),
            putty: PuttyScript::new(&settings),
            casing,
            settings,
            dry_run: false,
        }
    }

    /// Render everything, write nothing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self.keys = self.keys.dry_run(dry_run);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Render config text and write both launcher scripts for every host
    pub fn generate(&self, registry: &Registry) -> Result<Generation> {
        let mut generation = Generation::default();
        let launchers: [&dyn LaunchScript; 2] = [&self.teraterm, &self.putty];

        for entry in registry.iter() {
            let stanza = render_stanza(entry, &self.casing);
            tracing::debug!("Rendered stanza for {}:\n{}", entry.name(), stanza);
            generation.config_text.push_str(&stanza);

            let record = HostRecord::from_entry(entry, &self.keys)?;
            let mut paths = Vec::with_capacity(launchers.len());
            for launcher in launchers {
                let path = if self.dry_run {
                    let script = launcher.render(&record)?;
                    tracing::info!(
                        "[dry-run] {} script for {}:\n{}",
                        launcher.client(),
                        record.name(),
                        script
                    );
                    launcher.script_path(&record)
                } else {
                    launcher.write(&record)?
                };
                paths.push(path);
            }

            tracing::info!("Generated launchers for {}", record.name());
            generation.hosts.push(HostArtifacts {
                name: record.name().to_string(),
                teraterm_script: paths[0].clone(),
                putty_script: paths[1].clone(),
            });
        }

        Ok(generation)
    }

    /// Write the config text to the auto-generated and live targets.
    /// The live target is backed up first; a failed backup is logged and the
    /// write goes ahead.
    pub fn write_outputs(&self, config_text: &str) -> Result<WrittenConfig> {
        let auto_config = self.settings.auto_config_file.clone();
        let live_config = self.settings.live_config_file.clone();

        if self.dry_run {
            tracing::info!(
                "[dry-run] would write {:?} and {:?}",
                auto_config,
                live_config
            );
            return Ok(WrittenConfig {
                auto_config,
                live_config,
                backup: None,
            });
        }

        write_file(&auto_config, config_text)?;
        tracing::info!("Wrote {:?}", auto_config);

        let backup = match backup_existing(&live_config) {
            Ok(Some(path)) => {
                tracing::info!("Backup created: {:?}", path);
                Some(path)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };

        write_file(&live_config, config_text)?;
        tracing::info!("Wrote {:?}", live_config);

        Ok(WrittenConfig {
            auto_config,
            live_config,
            backup,
        })
    }

    /// `generate` followed by `write_outputs`
    pub fn run(&self, registry: &Registry) -> Result<(Generation, WrittenConfig)> {
        let generation = self.generate(registry)?;
        let written = self.write_outputs(&generation.config_text)?;
        Ok((generation, written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostgenError;
    use tempfile::tempdir;

    const REGISTRY: &str = r#"
[web]
hostname = web.example.com
port = 2222
user = deploy
identityfile = id_web
ServerAliveInterval = 30

[legacy]
HostName = 10.0.0.5
User = admin
Password = hunter2
ProxyType = http
ProxyHost = proxy.corp
ProxyPort = 3128
ProxyUser = alice
ProxyPassword = pw
"#;

    fn casing() -> KeyCasingLookup {
        KeyCasingLookup::from_pairs([
            ("hostname", "HostName"),
            ("port", "Port"),
            ("user", "User"),
            ("identityfile", "IdentityFile"),
        ])
    }

    fn setup(root: &Path) -> (ConfigAssembler, Registry) {
        let settings = Settings::rooted_at(root);
        std::fs::create_dir_all(&settings.managed_key_dir).unwrap();
        std::fs::write(settings.managed_key_dir.join("id_web"), b"key").unwrap();
        let registry = Registry::parse(REGISTRY).unwrap();
        (ConfigAssembler::with_casing(settings, casing()), registry)
    }

    #[test]
    fn test_render_stanza() {
        let entry = RegistryEntry::new("box")
            .with("hostname", "box.lan")
            .with("LogLevel", "QUIET");
        assert_eq!(
            render_stanza(&entry, &casing()),
            "Host box\n    HostName box.lan\n    LogLevel QUIET\n"
        );
    }

    #[test]
    fn test_generate_config_text_and_scripts() {
        let temp = tempdir().unwrap();
        let (assembler, registry) = setup(temp.path());

        let generation = assembler.generate(&registry).unwrap();
        assert!(generation.config_text.starts_with(
            "Host web\n    HostName web.example.com\n    Port 2222\n    User deploy\n"
        ));
        assert!(generation.config_text.contains("    ServerAliveInterval 30\n"));
        assert!(generation.config_text.contains("Host legacy\n    HostName 10.0.0.5\n"));

        assert_eq!(generation.hosts.len(), 2);
        let web = &generation.hosts[0];
        assert_eq!(web.name, "web");
        assert_eq!(
            web.teraterm_script,
            assembler.settings().teraterm_script_dir.join("web.bat")
        );

        let tth = std::fs::read_to_string(&web.teraterm_script).unwrap();
        let key_copy = assembler.settings().key_output_dir.join("id_web");
        assert!(tth.contains(&format!("/keyfile=\"{}\"", key_copy.display())));
        assert!(tth.contains("/auth=publickey"));
        assert!(key_copy.exists());

        let pth = std::fs::read_to_string(&generation.hosts[1].putty_script).unwrap();
        let credential = pth.find("set CORKSCREW_AUTH=alice:pw").unwrap();
        let launch = pth.find("start \"\"").unwrap();
        assert!(credential < launch);
    }

    #[test]
    fn test_missing_key_aborts() {
        let temp = tempdir().unwrap();
        let settings = Settings::rooted_at(temp.path());
        let assembler = ConfigAssembler::with_casing(settings, casing());
        let registry = Registry::parse("[a]\nIdentityFile = nowhere\n").unwrap();

        assert!(matches!(
            assembler.generate(&registry),
            Err(HostgenError::MissingFile { .. })
        ));
    }

    #[test]
    fn test_write_outputs_backs_up_live_config() {
        let temp = tempdir().unwrap();
        let (assembler, registry) = setup(temp.path());
        let live = assembler.settings().live_config_file.clone();
        std::fs::create_dir_all(live.parent().unwrap()).unwrap();
        std::fs::write(&live, "Host old\n").unwrap();

        let (generation, written) = assembler.run(&registry).unwrap();

        let backup = written.backup.unwrap();
        assert!(backup
            .to_string_lossy()
            .starts_with(&format!("{}.bak-", live.display())));
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "Host old\n");
        assert_eq!(std::fs::read_to_string(&live).unwrap(), generation.config_text);
        assert_eq!(
            std::fs::read_to_string(&written.auto_config).unwrap(),
            generation.config_text
        );
    }

    #[test]
    fn test_no_backup_without_live_config() {
        let temp = tempdir().unwrap();
        let (assembler, registry) = setup(temp.path());

        let (_, written) = assembler.run(&registry).unwrap();
        assert!(written.backup.is_none());
        assert!(written.live_config.exists());
    }

    #[test]
    fn test_repeated_runs_are_idempotent() {
        let temp = tempdir().unwrap();
        let (assembler, registry) = setup(temp.path());
        let live = assembler.settings().live_config_file.clone();
        std::fs::create_dir_all(live.parent().unwrap()).unwrap();
        std::fs::write(&live, "Host old\n").unwrap();

        let (_, first) = assembler.run(&registry).unwrap();
        let first_content = std::fs::read_to_string(&live).unwrap();
        // Backup names have one-second resolution
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let (_, second) = assembler.run(&registry).unwrap();
        let second_content = std::fs::read_to_string(&live).unwrap();

        assert_eq!(first_content, second_content);
        assert_ne!(first.backup, second.backup);
        assert!(first.backup.unwrap().exists());
        assert!(second.backup.unwrap().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_backup_failure_does_not_block_write() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let (assembler, registry) = setup(temp.path());
        let live = assembler.settings().live_config_file.clone();
        let live_dir = live.parent().unwrap().to_path_buf();
        std::fs::create_dir_all(&live_dir).unwrap();
        std::fs::write(&live, "Host old\n").unwrap();
        // Unreadable source: the copy fails, the overwrite does not
        std::fs::set_permissions(&live, std::fs::Permissions::from_mode(0o200)).unwrap();
        if std::fs::read(&live).is_ok() {
            // Running as root; permissions are not enforced
            return;
        }

        let (generation, written) = assembler.run(&registry).unwrap();
        assert!(written.backup.is_none());
        std::fs::set_permissions(&live, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert_eq!(std::fs::read_to_string(&live).unwrap(), generation.config_text);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = tempdir().unwrap();
        let (assembler, registry) = setup(temp.path());
        let assembler = assembler.dry_run(true);

        let (generation, written) = assembler.run(&registry).unwrap();
        assert_eq!(generation.hosts.len(), 2);
        assert!(!generation.hosts[0].teraterm_script.exists());
        assert!(!written.live_config.exists());
        assert!(!assembler.settings().key_output_dir.exists());
    }

    #[test]
    fn test_backup_path_format() {
        let path = backup_path(Path::new("/home/u/.ssh/config"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let stamp = name.strip_prefix("config.bak-").unwrap();
        assert_eq!(stamp.len(), "YYYYMMDD-HHMMSS".len());
        assert_eq!(stamp.as_bytes()[8], b'-');
    }
}
