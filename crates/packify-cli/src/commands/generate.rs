//! Generate command - turn Kubernetes manifests into a Sherpack pack
//!
//! Manifests are read from a file or stdin, converted on a blocking worker
//! and written out as a pack. Ctrl-C stops the run between resources and
//! leaves the output directory untouched.

use console::style;
use packify_core::canonical_name;
use packify_processor::{
    CancelFlag, GenerateOptions, Outcome, PackOutput, Pipeline, WriteOptions,
};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::decoder;
use crate::error::{CliError, Result};

/// Release and namespace used when rendering the pack for `--check`
const CHECK_RELEASE: &str = "release";
const CHECK_NAMESPACE: &str = "default";

pub struct GenerateArgs {
    pub name: String,
    pub output: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub app_version: String,
    pub pack_version: String,
    pub force: bool,
    pub dry_run: bool,
    pub check: bool,
}

pub async fn run(args: GenerateArgs) -> Result<()> {
    let pipeline = Pipeline::new(GenerateOptions {
        pack_name: args.name.clone(),
        pack_version: args.pack_version.clone(),
        app_version: args.app_version.clone(),
    })?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(canonical_name(&args.name)));

    print_header(args.file.as_deref(), &output_path);

    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let input = args.file.clone();
    let worker = tokio::task::spawn_blocking(move || -> Result<Outcome> {
        let text = decoder::read_input(input.as_deref())?;
        Ok(pipeline.run(decoder::decode(&text), &worker_cancel)?)
    });

    let outcome = tokio::select! {
        joined = worker => joined.map_err(|e| CliError::internal(e.to_string()))??,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            cancel.cancel();
            Outcome::Cancelled
        }
    };

    let pack = match outcome {
        Outcome::Completed(pack) => pack,
        Outcome::Cancelled => return Err(CliError::Cancelled),
    };

    if args.check {
        let documents = pack.check(CHECK_RELEASE, CHECK_NAMESPACE)?;
        info!(documents, "Rendered pack parses");
    }

    let written = pack.write(
        &output_path,
        &WriteOptions {
            force: args.force,
            dry_run: args.dry_run,
        },
    )?;

    print_files(&written, &output_path);
    print_summary(&pack, args.check);
    print_next_steps(&output_path, args.dry_run);

    Ok(())
}

fn print_header(input: Option<&Path>, output_path: &Path) {
    let source = match input {
        Some(path) if path != Path::new("-") => path.display().to_string(),
        _ => "stdin".to_string(),
    };

    println!();
    println!(
        "  {} {} {}",
        style("Packify").bold().cyan(),
        style("─").dim(),
        style("Kubernetes → Sherpack").dim()
    );
    println!();
    println!(
        "  {} {} {}",
        style("Source:").dim(),
        style(source).cyan(),
        style("(manifests)").dim()
    );
    println!(
        "  {} {} {}",
        style("Target:").dim(),
        style(output_path.display()).green(),
        style("(Sherpack pack)").dim()
    );
    println!();
}

fn print_files(written: &[PathBuf], output_path: &Path) {
    println!("  {}", style("Generated Files").bold());
    println!("  {}", style("───────────────").dim());

    for file in written {
        let rel_path = file.strip_prefix(output_path).unwrap_or(file);
        println!("  {} {}", style("✓").green().bold(), rel_path.display());
    }
    println!();
}

fn print_summary(pack: &PackOutput, checked: bool) {
    let templates = pack.templates().len();
    let values = pack.values().leaf_paths().len();

    println!("  {}", style("Summary").bold());
    println!("  {}", style("───────").dim());
    println!(
        "  {} template{}",
        style(format!("{:>3}", templates)).green().bold(),
        if templates == 1 { "" } else { "s" }
    );
    println!(
        "  {} value{} extracted",
        style(format!("{:>3}", values)).blue().bold(),
        if values == 1 { "" } else { "s" }
    );
    if checked {
        println!(
            "  {} {}",
            style("  ✓").green().bold(),
            style("rendered with default values").dim()
        );
    }
    println!();
}

fn print_next_steps(output_path: &Path, dry_run: bool) {
    if dry_run {
        println!(
            "  {} {}",
            style("ℹ").cyan(),
            style("Dry run mode - no files were written").dim()
        );
        println!();
        return;
    }

    println!("  {}", style("Next Steps").bold());
    println!("  {}", style("──────────").dim());
    println!(
        "  {} {}",
        style("1.").dim(),
        style(format!("sherpack lint {}", output_path.display())).cyan()
    );
    println!("     {}", style("Validate the generated pack").dim());
    println!();
    println!(
        "  {} {}",
        style("2.").dim(),
        style(format!(
            "sherpack template my-release {}",
            output_path.display()
        ))
        .cyan()
    );
    println!("     {}", style("Render it with the extracted values").dim());
    println!();
}
