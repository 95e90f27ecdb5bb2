//! CLI module for Szinkron.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_duration, Output};

use clap::{Parser, Subcommand};

/// Szinkron - Video dubbing pipeline
///
/// Transcribe a remote video, post-edit the transcript into a script,
/// translate it, synthesize new speech, and remux the dubbed video.
#[derive(Parser, Debug)]
#[command(name = "szinkron")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP job service
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Transcribe a video into a timed script
    Transcribe {
        /// Video URL
        url: String,

        /// Process only the first 60 seconds
        #[arg(long)]
        test: bool,

        /// Disable breath/pause annotation
        #[arg(long)]
        no_breath: bool,

        /// Post-edit the script with the generative model
        #[arg(long)]
        post_edit: bool,

        /// Generative model for post-editing (default: auto)
        #[arg(long)]
        model: Option<String>,

        /// Source language tag (default: from config)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Run the full dubbing pipeline interactively
    Dub,

    /// List voices for a TTS provider
    Voices {
        /// Provider id (elevenlabs, google_tts)
        #[arg(short, long)]
        provider: String,

        /// Filter by language tag
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Compare TTS provider costs for a sample text
    Providers {
        /// Sample text to quote (default: 1000 characters)
        #[arg(long)]
        text: Option<String>,
    },

    /// Check system requirements and configuration
    Doctor,
}
