//! Launcher Scripts
//!
//! Renders one Windows batch file per host and per terminal client:
//! - **Tera Term**: `ttermpro.exe` with TTSSH `/`-style flags
//! - **PuTTY**: `putty.exe` with `-`-style flags, HTTP proxies via corkscrew
//!
//! Each script silences echo and starts the client detached, so double
//! clicking it leaves no console window behind.

mod putty;
mod teraterm;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::host::HostRecord;

pub use putty::PuttyScript;
pub use teraterm::TeraTermScript;

/// Batch files are read by cmd.exe
pub const LINE_ENDING: &str = "\r\n";

/// Extension of generated launcher scripts
pub const SCRIPT_EXTENSION: &str = "bat";

/// A terminal client whose launch command can be synthesized
pub trait LaunchScript {
    /// Short client name for logs
    fn client(&self) -> &'static str;

    /// Directory scripts for this client are written to
    fn output_dir(&self) -> &Path;

    /// Full script text for `record`
    fn render(&self, record: &HostRecord) -> Result<String>;

    /// Script path for `record` inside [`LaunchScript::output_dir`]
    fn script_path(&self, record: &HostRecord) -> PathBuf {
        self.output_dir()
            .join(format!("{}.{}", record.name(), SCRIPT_EXTENSION))
    }

    /// Render and write the script, creating the output directory if needed.
    /// An existing script is overwritten.
    fn write(&self, record: &HostRecord) -> Result<PathBuf> {
        let script = self.render(record)?;
        let path = self.script_path(record);
        std::fs::create_dir_all(self.output_dir())?;
        std::fs::write(&path, script)?;
        tracing::debug!("Wrote {} script {:?}", self.client(), path);
        Ok(path)
    }
}

/// `@echo off` header line
fn echo_off() -> String {
    format!("@echo off{LINE_ENDING}")
}

/// Detached launch line: `start "" "<exe>" args... &`
fn start_line(exe: &str, args: &[String]) -> String {
    let mut line = format!("start \"\" \"{}\"", exe);
    for arg in args.iter().filter(|a| !a.is_empty()) {
        line.push(' ');
        line.push_str(arg);
    }
    line.push_str(" &");
    line.push_str(LINE_ENDING);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_line_skips_empty_args() {
        let args = vec!["-ssh".to_string(), String::new(), "host".to_string()];
        assert_eq!(
            start_line(r"C:\bin\x.exe", &args),
            "start \"\" \"C:\\bin\\x.exe\" -ssh host &\r\n"
        );
    }
}
