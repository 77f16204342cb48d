use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use cranidx::cli::{bioc_urls, broken, can_install, depends};

#[derive(Parser)]
#[clap(version, author, about)]
struct Cli {
    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List packages across the given files whose dependencies aren't satisfied
    Broken {
        /// PACKAGES or DESCRIPTION files to load
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the repository URLs for a Bioconductor release
    BiocUrls {
        /// Bioconductor release, e.g. "3.18"
        version: String,
    },
    /// Check whether a package's dependencies are satisfiable from the given files
    CanInstall {
        /// Package name to check
        name: String,
        /// PACKAGES or DESCRIPTION files to load
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print a package's transitive dependency closure
    Depends {
        /// Package name to query
        name: String,
        /// PACKAGES or DESCRIPTION files to load
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
}

fn run(command: &Command) -> anyhow::Result<bool> {
    match command {
        Command::Broken { files } => {
            let broken = broken(files)?;
            for pkg in &broken {
                println!("{pkg}");
            }
            Ok(broken.is_empty())
        }
        Command::BiocUrls { version } => {
            for url in bioc_urls(version) {
                println!("{url}");
            }
            Ok(true)
        }
        Command::CanInstall { name, files } => {
            let missing = can_install(name, files)?;
            for m in &missing {
                eprintln!("missing: {m}");
            }
            Ok(missing.is_empty())
        }
        Command::Depends { name, files } => {
            let closure = depends(name, files)?;
            for dep in &closure {
                println!("{dep}");
            }
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    match run(&cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
