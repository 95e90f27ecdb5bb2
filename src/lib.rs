//! Szinkron - Video Dubbing Pipeline
//!
//! Szinkron ingests a remote video, produces a timed transcript of its
//! speech, optionally rewrites it into a polished script, translates it
//! while preserving timing, synthesizes new speech through a pluggable TTS
//! provider, and remuxes the new audio against the original video.
//!
//! The name comes from the Hungarian word for "dubbing".
//!
//! # Overview
//!
//! Szinkron exposes the pipeline two ways:
//! - an HTTP job service (`szinkron serve`)
//! - an interactive terminal mode (`szinkron dub`)
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `ids` - Job identifiers and input validation
//! - `media` - Download, decode, probe, and mux via yt-dlp/ffmpeg
//! - `recognizer` - Speech recognition (sync and staged paths)
//! - `segmenter` - Pause detection and timed script formatting
//! - `chunking` - Sentence-boundary chunking for long scripts
//! - `genai` - Script post-editing and translation with model fallback
//! - `tts` - Provider abstraction, adapters, and voice equivalence
//! - `jobs` - Job model, cost ledger, and registry
//! - `artifacts` - Per-job artifact storage
//! - `orchestrator` - Pipeline coordination and the job state machine
//! - `server` - HTTP surface
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use szinkron::config::Settings;
//! use szinkron::jobs::{JobKind, JobRequest};
//! use szinkron::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Arc::new(Orchestrator::new(settings)?);
//!
//!     let request = JobRequest {
//!         url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into()),
//!         ..Default::default()
//!     };
//!     let id = Arc::clone(&orchestrator).submit(JobKind::Transcribe, request)?;
//!     println!("Submitted job {}", id);
//!
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod genai;
pub mod http;
pub mod ids;
pub mod jobs;
pub mod media;
pub mod orchestrator;
pub mod recognizer;
pub mod segmenter;
pub mod server;
pub mod tts;

pub use error::{Result, SzinkronError};
