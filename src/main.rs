use anyhow::{Context, Result};
use std::path::PathBuf;
use tursoswap::cli::{parse_args, Args, GlobalOptions};
use tursoswap::config::{self, Config};
use tursoswap::diff_formatter::DiffFormatter;
use tursoswap::{logger, FileProcessor};

fn main() -> Result<()> {
    let args = parse_args();

    match args {
        Args::Convert {
            options,
            input,
            output,
            dry_run,
            context,
            lenient,
            json,
        } => {
            init_logging(&options)?;
            let mut config = load_config(&options)?;

            // Command-line flags win over environment and config file
            if let Some(input) = input {
                config.paths.input = input;
            }
            if let Some(output) = output {
                config.paths.output = output;
            }
            if let Some(context) = context {
                config.rewrite.context_lines = context;
            }
            if lenient {
                config.rewrite.lenient = true;
            }

            convert(&config, dry_run, json)?;
        }
        Args::Config { options, show, init } => {
            init_logging(&options)?;
            config_command(&options, show, init)?;
        }
    }

    Ok(())
}

fn init_logging(options: &GlobalOptions) -> Result<()> {
    if let Some(path) = logger::init_logging(options.debug)? {
        eprintln!("Debug log: {}", path.display());
    }
    Ok(())
}

fn config_path(options: &GlobalOptions) -> Result<PathBuf> {
    match &options.config {
        Some(path) => Ok(path.clone()),
        None => config::config_file_path(),
    }
}

fn load_config(options: &GlobalOptions) -> Result<Config> {
    let path = config_path(options)?;
    let mut config = config::load_config(&path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn convert(config: &Config, dry_run: bool, json: bool) -> Result<()> {
    let processed = FileProcessor::run(config, dry_run)?;
    let report = &processed.rewrite.report;
    let input = &config.paths.input;
    let output = &config.paths.output;

    if json {
        let report = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{}", report);
        return Ok(());
    }

    if dry_run {
        print!("{}", DiffFormatter::format_dry_run_header(input, output));
        print!(
            "{}",
            DiffFormatter::format_diff_with_context(
                &processed.source,
                &processed.rewrite.output,
                config.rewrite.context_lines,
            )
        );
        println!();
        print!("{}", DiffFormatter::format_report(report));
        println!("\nNo file written (dry run).");
        return Ok(());
    }

    if report.is_unchanged() {
        println!("No Supabase markers found; {} is an unchanged copy.", output.display());
    }
    print!("{}", DiffFormatter::format_report(report));
    println!("✓ Successfully converted to Turso database: {}", output.display());

    Ok(())
}

fn config_command(options: &GlobalOptions, show: bool, init: bool) -> Result<()> {
    let path = config_path(options)?;

    if init {
        config::save_default_config(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    if show {
        let config = load_config(options)?;
        if path.exists() {
            println!("# {}", path.display());
        } else {
            println!("# {} (not found, showing defaults)", path.display());
        }
        print!("{}", config.to_display_toml()?);
    }

    Ok(())
}
