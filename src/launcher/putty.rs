//! PuTTY launcher
//!
//! PuTTY has no built-in way to take proxy credentials on the command line,
//! so HTTP proxies go through corkscrew via `-proxycmd`. Other proxy types
//! are dropped and the host is contacted directly.

use std::path::{Path, PathBuf};

use super::{echo_off, start_line, LaunchScript, LINE_ENDING};
use crate::config::Settings;
use crate::error::Result;
use crate::host::{to_native_key_name, HostRecord, Proxy, ProxyType};

/// Environment variable corkscrew reads `user:password` from
pub const CORKSCREW_AUTH_VAR: &str = "CORKSCREW_AUTH";

/// Placeholders PuTTY substitutes in `-proxycmd` at connect time.
/// `%%` is the batch-file escape for a literal `%`.
pub const TARGET_HOST_TOKEN: &str = "%%host";
pub const TARGET_PORT_TOKEN: &str = "%%port";

#[derive(Debug, Clone)]
pub struct PuttyScript {
    exe: String,
    corkscrew_exe: String,
    output_dir: PathBuf,
}

impl PuttyScript {
    pub fn new(settings: &Settings) -> Self {
        Self {
            exe: settings.putty_exe.clone(),
            corkscrew_exe: settings.corkscrew_exe.clone(),
            output_dir: settings.putty_script_dir.clone(),
        }
    }

    /// Only HTTP proxies are supported
    fn http_proxy(record: &HostRecord) -> Option<&Proxy> {
        record.proxy().filter(|p| p.kind == ProxyType::Http)
    }

    /// `set CORKSCREW_AUTH=user:password` line, when the proxy needs auth
    pub fn credential_line(proxy: &Proxy) -> Option<String> {
        proxy.user.as_deref().map(|user| {
            format!(
                "set {}={}:{}{}",
                CORKSCREW_AUTH_VAR,
                user,
                proxy.password.as_deref().unwrap_or_default(),
                LINE_ENDING
            )
        })
    }

    /// `-proxycmd "\"corkscrew.exe\" proxyhost proxyport %%host %%port"`
    pub fn proxy_clause(&self, proxy: &Proxy) -> String {
        // The whole command is one quoted argument, so the inner quotes
        // are escaped and backslashes doubled
        let corkscrew = self.corkscrew_exe.replace('\\', "\\\\");
        format!(
            "-proxycmd \"\\\"{}\\\" {} {} {} {}\"",
            corkscrew,
            proxy.host.as_deref().unwrap_or_default(),
            proxy.port.map(|p| p.to_string()).unwrap_or_default(),
            TARGET_HOST_TOKEN,
            TARGET_PORT_TOKEN
        )
    }

    /// `-l user -i "key.ppk" -pw "password"`, each only when set
    pub fn auth_clause(record: &HostRecord) -> Result<String> {
        let mut parts = Vec::new();

        if let Some(user) = record.user() {
            parts.push(format!("-l {}", user));
        }
        if let Some(key) = record.key_file() {
            let ppk = to_native_key_name(&key.to_string_lossy())?;
            parts.push(format!("-i \"{}\"", ppk));
        }
        if let Some(password) = record.password() {
            parts.push(format!("-pw \"{}\"", password));
        }

        Ok(parts.join(" "))
    }
}

impl LaunchScript for PuttyScript {
    fn client(&self) -> &'static str {
        "putty"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn render(&self, record: &HostRecord) -> Result<String> {
        let mut script = echo_off();

        let proxy_clause = match Self::http_proxy(record) {
            Some(proxy) => {
                if let Some(line) = Self::credential_line(proxy) {
                    script.push_str(&line);
                }
                self.proxy_clause(proxy)
            }
            None => {
                if let Some(proxy) = record.proxy() {
                    tracing::warn!(
                        "{}: PuTTY script ignores {} proxy, connecting directly",
                        record.name(),
                        proxy.kind
                    );
                }
                String::new()
            }
        };

        let args = vec![
            "-ssh".to_string(),
            "-noshare".to_string(),
            proxy_clause,
            Self::auth_clause(record)?,
            format!("-P {}", record.port()),
            record.host().to_string(),
        ];
        script.push_str(&start_line(&self.exe, &args));
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Connection;
    use tempfile::tempdir;

    fn connection() -> Connection {
        Connection {
            host: "db.internal".to_string(),
            port: None,
            user: Some("dba".to_string()),
            password: None,
            key_file: None,
            auth_type: None,
        }
    }

    fn proxy(kind: ProxyType, user: Option<&str>) -> Proxy {
        Proxy {
            kind,
            host: Some("proxy.corp".to_string()),
            port: Some(3128),
            user: user.map(String::from),
            password: user.map(|_| "pw".to_string()),
        }
    }

    fn writer() -> PuttyScript {
        let temp = tempdir().unwrap();
        let mut settings = Settings::rooted_at(temp.path());
        settings.corkscrew_exe = r"C:\tools\corkscrew.exe".to_string();
        PuttyScript::new(&settings)
    }

    #[test]
    fn test_http_proxy_with_credentials() {
        let record = HostRecord::new(
            "db",
            connection(),
            Some(proxy(ProxyType::Http, Some("alice"))),
        );
        let out = writer().render(&record).unwrap();
        let lines: Vec<&str> = out.split("\r\n").collect();

        assert_eq!(lines[0], "@echo off");
        assert_eq!(lines[1], "set CORKSCREW_AUTH=alice:pw");
        assert!(lines[2].starts_with("start \"\""));
        assert!(lines[2].contains(
            r#"-proxycmd "\"C:\\tools\\corkscrew.exe\" proxy.corp 3128 %%host %%port""#
        ));
    }

    #[test]
    fn test_http_proxy_without_credentials() {
        let record = HostRecord::new("db", connection(), Some(proxy(ProxyType::Http, None)));
        let out = writer().render(&record).unwrap();

        assert!(!out.contains(CORKSCREW_AUTH_VAR));
        assert!(out.contains("-proxycmd"));
    }

    #[test]
    fn test_unsupported_proxy_ignored() {
        let record = HostRecord::new(
            "db",
            connection(),
            Some(proxy(ProxyType::Socks5, Some("alice"))),
        );
        let out = writer().render(&record).unwrap();

        assert!(!out.contains("-proxycmd"));
        assert!(!out.contains(CORKSCREW_AUTH_VAR));
    }

    #[test]
    fn test_uppercase_http_is_not_corkscrewed() {
        let kind = ProxyType::parse("HTTP").unwrap();
        let record = HostRecord::new("db", connection(), Some(proxy(kind, Some("alice"))));
        let out = writer().render(&record).unwrap();

        assert!(!out.contains("-proxycmd"));
    }

    #[test]
    fn test_launch_line() {
        let mut conn = connection();
        conn.key_file = Some(PathBuf::from(r"C:\0\sshkey\id_rsa"));
        conn.password = Some("x y".to_string());
        let record = HostRecord::new("db", conn, None);
        let out = writer().render(&record).unwrap();

        assert_eq!(
            out,
            "@echo off\r\n\
             start \"\" \"%programfiles%\\PuTTY\\putty.exe\" -ssh -noshare -l dba \
             -i \"C:\\0\\sshkey\\id_rsa.ppk\" -pw \"x y\" -P 22 db.internal &\r\n"
        );
    }

    #[test]
    fn test_auth_clause_empty() {
        let mut conn = connection();
        conn.user = None;
        let record = HostRecord::new("db", conn, None);
        assert_eq!(PuttyScript::auth_clause(&record).unwrap(), "");
    }
}
