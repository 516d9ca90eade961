//! hostgen - OpenSSH config and launcher script generator
//!
//! Reads an INI host registry and derives:
//! - a normalized OpenSSH client config (auto-generated copy + live `~/.ssh/config`)
//! - one Tera Term launcher script per host
//! - one PuTTY launcher script per host
//!
//! Nothing here opens a network connection; the output is text only.

pub mod assembler;
pub mod config;
pub mod error;
pub mod host;
pub mod launcher;
pub mod registry;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use assembler::{ConfigAssembler, Generation, HostArtifacts, WrittenConfig};
pub use config::{KeyCasingLookup, Settings};
pub use error::{HostgenError, Result};
pub use host::{HostRecord, KeyMaterialResolver};
pub use registry::{HostSource, Registry, RegistryEntry};

/// Initialize logging. `RUST_LOG` wins over `default_level`.
/// Diagnostics go to standard output.
pub fn init_logging(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();
}
