//! Terminal rendering for translation sessions.

use crate::error::Result;
use crate::languages::display_name;
use crate::pipeline::render::{RenderSink, Speech, View, unsupported_notice};
use owo_colors::OwoColorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique file name for one synthesized clip: 32 hex digits and `.mp3`.
pub fn speech_file_name(sequence: u64) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let salt = (u64::from(std::process::id()) << 32) ^ sequence;
    format!("{:016x}{:016x}.mp3", nanos, salt)
}

/// Prints each view to stdout and stores the audio, if asked to.
pub struct TerminalSink {
    quiet: bool,
    verbosity: u8,
    output_dir: Option<PathBuf>,
    saved: Vec<PathBuf>,
}

impl TerminalSink {
    pub fn new(quiet: bool, verbosity: u8) -> Self {
        Self {
            quiet,
            verbosity,
            output_dir: None,
            saved: Vec::new(),
        }
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// Files written so far.
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }

    /// Write `bytes` into the output directory. Failure costs this clip only.
    fn save(&mut self, dir: &Path, bytes: &[u8], sequence: u64) -> Option<PathBuf> {
        let path = dir.join(speech_file_name(sequence));
        let written = fs::create_dir_all(dir).and_then(|()| fs::write(&path, bytes));
        match written {
            Ok(()) => {
                self.saved.push(path.clone());
                Some(path)
            }
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("Could not save audio to {}: {}", path.display(), e).red()
                );
                None
            }
        }
    }
}

impl RenderSink for TerminalSink {
    fn render(&mut self, view: &View) -> Result<()> {
        let saved = match (&view.speech, self.output_dir.clone()) {
            (Speech::Audio(bytes), Some(dir)) => self.save(&dir, bytes, view.sequence),
            _ => None,
        };

        if self.quiet {
            if let Some(translation) = &view.translation {
                println!("{}", translation);
            }
            return Ok(());
        }

        println!(
            "{} {}",
            format!("{}:", display_name(&view.languages.source)).dimmed(),
            view.transcript
        );
        if let Some(translation) = &view.translation {
            println!(
                "{} {}",
                format!("{}:", display_name(&view.languages.target)).green(),
                translation
            );
        }

        match &view.speech {
            Speech::Audio(bytes) => match saved {
                Some(path) => println!("  {} {}", "audio:".dimmed(), path.display()),
                None if self.verbosity >= 1 => {
                    println!("  {} {} bytes", "audio:".dimmed(), bytes.len())
                }
                None => {}
            },
            Speech::Unsupported(code) => {
                println!("  {}", unsupported_notice(code).yellow());
            }
            Speech::Failed(message) => {
                println!("  {}", format!("Speech synthesis failed: {}", message).yellow());
            }
            Speech::Skipped => {}
        }
        println!();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "terminal"
    }
}
