//! Packify CLI - turn plain Kubernetes manifests into Sherpack packs

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod decoder;
mod error;
mod exit_codes;

use commands::generate::GenerateArgs;

#[derive(Parser)]
#[command(name = "packify")]
#[command(author = "Packify Contributors")]
#[command(version)]
#[command(about = "Turn plain Kubernetes manifests into Sherpack packs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a pack from manifests
    Generate {
        /// Pack name
        #[arg(default_value = "chart")]
        name: String,

        /// Output directory (default: ./<pack name>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Manifest file, `-` for stdin
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,

        /// Application version, the default tag of every image
        #[arg(long, default_value = "0.1.0")]
        app_version: String,

        /// Pack version (SemVer)
        #[arg(long, default_value = "0.1.0")]
        pack_version: String,

        /// Overwrite an existing output directory
        #[arg(long)]
        force: bool,

        /// Show the files that would be written without writing them
        #[arg(long)]
        dry_run: bool,

        /// Render the generated pack and check every document parses
        #[arg(long)]
        check: bool,
    },

    /// List resource processors in dispatch order
    Kinds,
}

fn init_logging(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match verbose {
            0 => "error",
            1 => "info",
            _ => "debug",
        })
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            name,
            output,
            file,
            app_version,
            pack_version,
            force,
            dry_run,
            check,
        } => {
            commands::generate::run(GenerateArgs {
                name,
                output,
                file,
                app_version,
                pack_version,
                force,
                dry_run,
                check,
            })
            .await
        }

        Commands::Kinds => commands::kinds::run(),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
