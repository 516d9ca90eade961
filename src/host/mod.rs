//! Host Records
//!
//! A `HostRecord` is the typed, read-only view of one registry section:
//! connection fields, optional proxy fields and the resolved key copy.

pub mod keys;

use std::fmt;
use std::path::PathBuf;

use crate::error::{HostgenError, Result};
use crate::registry::RegistryEntry;

pub use keys::{expand_tilde, to_native_key_name, KeyMaterialResolver};

/// Registry key names
pub mod fields {
    pub const HOST_NAME: &str = "HostName";
    pub const HOST: &str = "Host";
    pub const PORT: &str = "Port";
    pub const USER: &str = "User";
    pub const PASSWORD: &str = "Password";
    pub const IDENTITY_FILE: &str = "IdentityFile";
    pub const AUTH_TYPE: &str = "AuthType";
    pub const PROXY_TYPE: &str = "ProxyType";
    pub const PROXY_HOST: &str = "ProxyHost";
    pub const PROXY_PORT: &str = "ProxyPort";
    pub const PROXY_USER: &str = "ProxyUser";
    pub const PROXY_PASSWORD: &str = "ProxyPassword";
}

/// Port used when the registry gives none
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Authentication method passed to the terminal clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthType {
    PublicKey,
    Password,
    /// Any other explicit value (e.g. `challenge`, `pageant`), passed through
    Other(String),
}

impl AuthType {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "publickey" => AuthType::PublicKey,
            "password" => AuthType::Password,
            _ => AuthType::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthType::PublicKey => "publickey",
            AuthType::Password => "password",
            AuthType::Other(value) => value,
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proxy protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyType {
    Http,
    Socks4,
    Socks4a,
    Socks5,
    Telnet,
    Other(String),
}

impl ProxyType {
    /// Parse a `ProxyType` value. `none` (any case) means no proxy.
    /// Known types match only in lowercase; other spellings are kept as
    /// written and passed through verbatim.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("none") {
            return None;
        }
        let kind = match value {
            "http" => ProxyType::Http,
            "socks4" => ProxyType::Socks4,
            "socks4a" => ProxyType::Socks4a,
            "socks5" => ProxyType::Socks5,
            "telnet" => ProxyType::Telnet,
            _ => ProxyType::Other(value.to_string()),
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks4a => "socks4a",
            ProxyType::Socks5 => "socks5",
            ProxyType::Telnet => "telnet",
            ProxyType::Other(value) => value,
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary connection fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Address to connect to (HostName, then Host, then the section name)
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Normalized key copy in the key-output directory
    pub key_file: Option<PathBuf>,
    pub auth_type: Option<AuthType>,
}

impl Connection {
    /// Port or 22
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }
}

/// Proxy fields. Only present when a proxy type other than `none` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub kind: ProxyType,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// One host, ready for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    name: String,
    connection: Connection,
    proxy: Option<Proxy>,
}

impl HostRecord {
    /// Build a record from raw fields, inferring the auth type when it is
    /// not set: `publickey` with a key file, else `password` with a password.
    pub fn new(name: impl Into<String>, mut connection: Connection, proxy: Option<Proxy>) -> Self {
        if connection.auth_type.is_none() {
            connection.auth_type = if connection.key_file.is_some() {
                Some(AuthType::PublicKey)
            } else if connection.password.is_some() {
                Some(AuthType::Password)
            } else {
                None
            };
        }

        Self {
            name: name.into(),
            connection,
            proxy,
        }
    }

    /// Build a record from a registry section, resolving its key material.
    pub fn from_entry(entry: &RegistryEntry, keys: &KeyMaterialResolver) -> Result<Self> {
        use self::fields::*;

        let owned = |key: &str| entry.get(key).map(str::to_string);
        let port = |key: &str| -> Result<Option<u16>> {
            entry
                .get(key)
                .map(|value| {
                    value.trim().parse::<u16>().map_err(|_| HostgenError::InvalidValue {
                        section: entry.name().to_string(),
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                })
                .transpose()
        };

        let key_file = entry
            .get(IDENTITY_FILE)
            .map(|reference| keys.resolve(reference))
            .transpose()?;

        let connection = Connection {
            host: entry
                .get(HOST_NAME)
                .or_else(|| entry.get(HOST))
                .unwrap_or(entry.name())
                .to_string(),
            port: port(PORT)?,
            user: owned(USER),
            password: owned(PASSWORD),
            key_file,
            auth_type: entry.get(AUTH_TYPE).map(AuthType::parse),
        };

        let proxy = match entry.get(PROXY_TYPE).and_then(ProxyType::parse) {
            Some(kind) => Some(Proxy {
                kind,
                host: owned(PROXY_HOST),
                port: port(PROXY_PORT)?,
                user: owned(PROXY_USER),
                password: owned(PROXY_PASSWORD),
            }),
            None => None,
        };

        Ok(Self::new(entry.name(), connection, proxy))
    }

    /// Section name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    pub fn host(&self) -> &str {
        &self.connection.host
    }

    pub fn port(&self) -> u16 {
        self.connection.effective_port()
    }

    pub fn user(&self) -> Option<&str> {
        self.connection.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.connection.password.as_deref()
    }

    pub fn key_file(&self) -> Option<&PathBuf> {
        self.connection.key_file.as_ref()
    }

    pub fn auth_type(&self) -> Option<&AuthType> {
        self.connection.auth_type.as_ref()
    }
}
