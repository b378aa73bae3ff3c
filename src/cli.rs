//! Command-line interface for gisting
//!
//! Provides argument parsing using clap derive macros.

use crate::config::{BoundaryKind, RecognizerBackend};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Real-time voice translator: transcribe, translate, speak
#[derive(Parser, Debug)]
#[command(
    name = "gisting",
    version,
    about = "Real-time voice translator: transcribe, translate, speak"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: session summary, -vv: per-utterance diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a duration string.
///
/// Supports any format accepted by `humantime` (`20ms`, `1s`, `1m30s`);
/// a bare number is taken as milliseconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Utterance boundary policy selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryArg {
    /// Close after trailing silence
    Silence,
    /// One utterance per transport frame
    PerFrame,
    /// Fixed-length utterances (see audio.fixed_ms)
    Fixed,
}

impl From<BoundaryArg> for BoundaryKind {
    fn from(arg: BoundaryArg) -> Self {
        match arg {
            BoundaryArg::Silence => BoundaryKind::Silence,
            BoundaryArg::PerFrame => BoundaryKind::PerFrame,
            BoundaryArg::Fixed => BoundaryKind::Fixed,
        }
    }
}

/// Recognizer backend selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    /// OpenAI-compatible HTTP transcription service
    Http,
    /// Local program configured in transcription.command
    Command,
    /// Canned responses, no network (for trying the pipeline)
    Mock,
}

impl From<BackendArg> for RecognizerBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Http => RecognizerBackend::Http,
            BackendArg::Command => RecognizerBackend::Command,
            BackendArg::Mock => RecognizerBackend::Mock,
        }
    }
}

/// Options for a translation session
#[derive(clap::Args, Debug, Clone)]
pub struct TranslateArgs {
    /// WAV file to replay as the incoming stream ("-" for stdin)
    #[arg(long, short = 'i', value_name = "FILE", default_value = "-")]
    pub input: PathBuf,

    /// Spoken language (name or code, e.g. English, en)
    #[arg(long, value_name = "LANG")]
    pub from: Option<String>,

    /// Target language (name or code, e.g. French, fr)
    #[arg(long, value_name = "LANG")]
    pub to: Option<String>,

    /// Deliver frames at recording speed instead of as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Directory for synthesized MP3 files
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Transport frame duration (e.g. 20ms)
    #[arg(long, value_name = "DURATION", default_value = "20ms", value_parser = parse_duration)]
    pub frame: Duration,

    /// Render loop wait per cycle (e.g. 1s, 250ms)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub poll: Option<Duration>,

    /// Utterance boundary policy
    #[arg(long, value_enum)]
    pub boundary: Option<BoundaryArg>,

    /// Speech recognizer backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a translation session over a replayed WAV stream
    Translate(TranslateArgs),

    /// List selectable languages and their speech support
    Languages,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate_args(args: &[&str]) -> TranslateArgs {
        let mut argv = vec!["gisting", "translate"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Translate(args) => args,
            other => panic!("Expected Translate, got {:?}", other),
        }
    }

    #[test]
    fn test_translate_defaults() {
        let args = translate_args(&[]);
        assert_eq!(args.input, PathBuf::from("-"));
        assert!(args.from.is_none());
        assert!(args.to.is_none());
        assert!(!args.realtime);
        assert!(args.output_dir.is_none());
        assert_eq!(args.frame, Duration::from_millis(20));
        assert!(args.poll.is_none());
        assert!(args.boundary.is_none());
        assert!(args.backend.is_none());
    }

    #[test]
    fn test_translate_all_options() {
        let args = translate_args(&[
            "--input",
            "speech.wav",
            "--from",
            "English",
            "--to",
            "ja",
            "--realtime",
            "-o",
            "/tmp/out",
            "--frame",
            "10ms",
            "--poll",
            "250ms",
            "--boundary",
            "per-frame",
            "--backend",
            "mock",
        ]);
        assert_eq!(args.input, PathBuf::from("speech.wav"));
        assert_eq!(args.from.as_deref(), Some("English"));
        assert_eq!(args.to.as_deref(), Some("ja"));
        assert!(args.realtime);
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(args.frame, Duration::from_millis(10));
        assert_eq!(args.poll, Some(Duration::from_millis(250)));
        assert_eq!(args.boundary, Some(BoundaryArg::PerFrame));
        assert_eq!(args.backend, Some(BackendArg::Mock));
    }

    #[test]
    fn test_parse_duration_formats() {
        assert_eq!(parse_duration("40"), Ok(Duration::from_millis(40)));
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration(" 1m30s "), Ok(Duration::from_secs(90)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gisting", "languages", "-vv", "--config", "/tmp/c.toml"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Languages));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(!cli.quiet);
    }

    #[test]
    fn test_config_actions() {
        let cli = Cli::try_parse_from(["gisting", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
        let cli = Cli::try_parse_from(["gisting", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }

    #[test]
    fn test_completions_requires_shell() {
        assert!(Cli::try_parse_from(["gisting", "completions"]).is_err());
        assert!(Cli::try_parse_from(["gisting", "completions", "zsh"]).is_ok());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["gisting"]).is_err());
    }

    #[test]
    fn test_boundary_maps_to_config_kind() {
        assert_eq!(BoundaryKind::from(BoundaryArg::Fixed), BoundaryKind::Fixed);
        assert_eq!(
            RecognizerBackend::from(BackendArg::Command),
            RecognizerBackend::Command
        );
    }
}
