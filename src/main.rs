use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use gisting::app::{TranslateOptions, print_languages, run_translate_command};
use gisting::cli::{Cli, Commands, ConfigAction, TranslateArgs};
use gisting::config::Config;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Translate(args) => {
            let config = load_config(cli.config.as_deref())?;
            let options = translate_options(args, cli.quiet, cli.verbose);
            if let Err(e) = run_translate_command(config, options) {
                eprintln!("{}", format!("Error: {}", e).red());
                std::process::exit(1);
            }
        }
        Commands::Languages => {
            print_languages();
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "gisting",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn translate_options(args: TranslateArgs, quiet: bool, verbosity: u8) -> TranslateOptions {
    TranslateOptions {
        input: args.input,
        from: args.from,
        to: args.to,
        realtime: args.realtime,
        output_dir: args.output_dir,
        frame: Some(args.frame),
        poll: args.poll,
        boundary: args.boundary.map(Into::into),
        backend: args.backend.map(Into::into),
        quiet,
        verbosity,
    }
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path().context("Could not determine config directory"),
    }
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/gisting/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
            if let Err(e) = config.validate() {
                eprintln!("{}", format!("Warning: {}", e).yellow());
            }
        }
        ConfigAction::Path => {
            let path = config_path(custom_path)?;
            let status = if path.exists() {
                "exists".green().to_string()
            } else {
                "not created, using defaults".dimmed().to_string()
            };
            println!("{} ({})", path.display(), status);
        }
    }
    Ok(())
}
