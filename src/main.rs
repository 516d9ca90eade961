//! hostgen command line entry point

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use hostgen::registry::{OpenSshConfigSource, SnippetDirSource};
use hostgen::{ConfigAssembler, Registry, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "hostgen",
    about = "Generate OpenSSH config and Tera Term / PuTTY launchers from an INI host registry",
    version,
    author
)]
struct Args {
    /// Settings file (JSON); defaults to settings.json in the config directory
    #[arg(short, long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Host registry; overrides the settings file
    #[arg(short, long, value_name = "FILE")]
    registry: Option<PathBuf>,

    /// Also import hosts from an OpenSSH config file
    #[arg(long, value_name = "FILE")]
    import_ssh_config: Option<PathBuf>,

    /// Also import hosts from a directory of *.cfg snippets
    #[arg(long, value_name = "DIR")]
    import_snippets: Option<PathBuf>,

    /// Render everything but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Do not echo the generated config
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: Args) -> hostgen::Result<()> {
    let mut settings = Settings::load(args.settings.as_deref())?;
    if let Some(registry) = args.registry {
        settings.registry_file = registry;
    }

    let mut registry = Registry::load(&settings.registry_file)?;
    if let Some(path) = args.import_ssh_config {
        registry.merge_from(&OpenSshConfigSource::new(path))?;
    }
    if let Some(dir) = args.import_snippets {
        registry.merge_from(&SnippetDirSource::new(dir))?;
    }

    let assembler = ConfigAssembler::new(settings)?.dry_run(args.dry_run);
    let (generation, written) = assembler.run(&registry)?;

    if !args.quiet {
        print!("{}", generation.config_text);
    }
    info!(
        hosts = generation.hosts.len(),
        scripts = generation.hosts.len() * 2,
        live_config = %written.live_config.display(),
        "Generation complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    hostgen::init_logging(if args.verbose { "debug" } else { "info" });

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
