//! Kielo - batch bilingual subtitle pipeline
//!
//! Turns a directory of raw Finnish-language videos into published ones with
//! burned-in bilingual subtitles, slowed playback, background music, and an
//! outro, using whisper, the Gemini API, and ffmpeg.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod transcribe;
pub mod translate;
pub mod cue;
pub mod subtitle;
pub mod media;
pub mod error;
