//! Tera Term (TTSSH) launcher
//!
//! Command line reference:
//! https://teratermproject.github.io/manual/5/en/commandline/ttssh.html

use std::path::{Path, PathBuf};

use super::{echo_off, start_line, LaunchScript};
use crate::config::Settings;
use crate::error::Result;
use crate::host::{HostRecord, Proxy};

#[derive(Debug, Clone)]
pub struct TeraTermScript {
    exe: String,
    output_dir: PathBuf,
}

impl TeraTermScript {
    pub fn new(settings: &Settings) -> Self {
        Self {
            exe: settings.teraterm_exe.clone(),
            output_dir: settings.teraterm_script_dir.clone(),
        }
    }

    /// `-proxy type://[user:password@]host:port`, or `-noproxy`
    pub fn proxy_clause(proxy: Option<&Proxy>) -> String {
        let Some(proxy) = proxy else {
            return "-noproxy".to_string();
        };

        let host = proxy.host.as_deref().unwrap_or_default();
        let port = proxy.port.map(|p| p.to_string()).unwrap_or_default();
        match proxy.user.as_deref() {
            Some(user) => format!(
                "-proxy {}://{}:{}@{}:{}",
                proxy.kind,
                user,
                proxy.password.as_deref().unwrap_or_default(),
                host,
                port
            ),
            None => format!("-proxy {}://{}:{}", proxy.kind, host, port),
        }
    }

    /// `/auth=...` (or `/ask4passwd`) followed by user, key and password flags
    pub fn auth_clause(record: &HostRecord) -> String {
        let mut parts = vec![match record.auth_type() {
            Some(auth) => format!("/auth={}", auth),
            None => "/ask4passwd".to_string(),
        }];

        if let Some(user) = record.user() {
            parts.push(format!("/user={}", user));
        }
        if let Some(key) = record.key_file() {
            parts.push(format!("/keyfile=\"{}\"", key.display()));
        }
        if let Some(password) = record.password() {
            parts.push(format!("/password=\"{}\"", password));
        }

        parts.join(" ")
    }
}

impl LaunchScript for TeraTermScript {
    fn client(&self) -> &'static str {
        "teraterm"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn render(&self, record: &HostRecord) -> Result<String> {
        let args = vec![
            Self::proxy_clause(record.proxy()),
            format!("{}:{}", record.host(), record.port()),
            "/ssh".to_string(),
            Self::auth_clause(record),
        ];

        let mut script = echo_off();
        script.push_str(&start_line(&self.exe, &args));
        Ok(script)
    }
}
