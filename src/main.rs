//! Combo Extract - parallel combo list parsing and deduplication
//!
//! Main entry point for the command-line application.

use clap::Parser;
use std::process;

use combo_extract::cli::Args;
use combo_extract::extractor::{Extractor, RunConfig};
use combo_extract::progress::{print_banner, print_summary, section, status, Status};
use combo_extract::ExtractError;

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging; RUST_LOG still wins when set
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args) {
        let mut chain = e.chain();
        if let Some(top) = chain.next() {
            status(Status::Fail, &top.to_string());
        }
        for cause in chain {
            status(Status::Fail, &format!("  Caused by: {}", cause));
        }

        if e.downcast_ref::<ExtractError>().is_some_and(ExtractError::is_config_error) {
            status(Status::Fail, "Nothing was read; fix the inputs above and run again");
        }

        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if !args.quiet {
        print_banner();
    }

    let config = RunConfig::from_args(&args)?;
    config.validate()?;

    if !args.quiet {
        print_config(&config);
    }

    if args.dry_run {
        dry_run_report(&config);
        return Ok(());
    }

    let report = Extractor::new(config).run()?;

    if args.quiet {
        println!("{}", report.output_path.display());
    } else {
        print_summary(&report);
        if report.matched == 0 {
            status(Status::Warn, "No records matched; the output file is empty");
        }
        status(Status::Done, &format!(
            "Processing complete. Total accounts saved: {}",
            report.matched
        ));
    }

    Ok(())
}

/// Print configuration summary
fn print_config(config: &RunConfig) {
    section("Configuration");

    let site = config.site.as_ref().map_or("none", |s| s.as_str());
    let settings = [
        ("Input files", config.inputs.len().to_string()),
        ("Delimiter", format!("'{}'", config.delimiter)),
        ("Site filter", site.to_string()),
        ("Encoding", format!("{:?}", config.encoding)),
        ("Threads", config.pool_size().to_string()),
        ("Output", config.output_path().display().to_string()),
    ];
    for (name, value) in settings {
        status(Status::Note, &format!("{:<12} {}", format!("{}:", name), value));
    }
}

/// List what would be processed without reading anything
fn dry_run_report(config: &RunConfig) {
    section("Dry run: nothing will be read or written");

    for path in &config.inputs {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        status(Status::Item, &format!("{} ({})", path.display(), bytesize::ByteSize(size)));
    }

    status(Status::Item, &format!("Output file: {}", config.output_path().display()));
}
