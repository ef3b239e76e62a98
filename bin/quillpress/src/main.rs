//! quillpress CLI
//!
//! Single binary static blog generator.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for quillpress.
#[derive(Parser)]
#[command(name = "quillpress", version, about = "A static blog generator")]
struct Cli {
    /// Path to configuration file (default: detect config.toml, config.yaml or config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the static site
    #[command(alias = "gen")]
    Build {
        /// Output directory, overriding the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include draft posts
        #[arg(long)]
        drafts: bool,
        /// Keep running and rebuild when sources change
        #[arg(long)]
        watch: bool,
        /// Compress built files to one archive
        #[arg(long)]
        archive: bool,
    },
    /// Build, then rebuild whenever sources change
    Watch {
        /// Output directory, overriding the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include draft posts
        #[arg(long)]
        drafts: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    quillpress::init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    let cwd = Path::new(".");

    match cli.command {
        Commands::Build {
            output,
            drafts,
            watch,
            archive,
        } => {
            let mut options = quillpress::cmd::build_options(config, cwd, output, drafts)?;
            options.build_archive = archive;
            if watch {
                quillpress::cmd::watch::run(options).await?;
            } else {
                quillpress::cmd::build::run(&options)?;
            }
        }
        Commands::Watch { output, drafts } => {
            let options = quillpress::cmd::build_options(config, cwd, output, drafts)?;
            quillpress::cmd::watch::run(options).await?;
        }
    }

    Ok(())
}
