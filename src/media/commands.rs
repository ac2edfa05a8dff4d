use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{KieloError, Result};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Add a filter graph spanning multiple streams
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Map a stream into the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Execute the command, capturing stderr for diagnostics
    pub async fn execute(&self) -> Result<std::process::Output> {
        debug!(
            "Executing media processing command ({}): {} {:?}",
            self.description, self.binary_path, self.args
        );

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);

        let output = cmd.output().map_err(|e| {
            KieloError::Processing(format!("Failed to execute media processor: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KieloError::Processing(format!(
                "{} failed: {}",
                self.description, stderr
            )));
        }

        Ok(output)
    }
}

/// Builder for the pipeline's media operations
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Mono 16 kHz PCM WAV, the input format the speech model expects
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    /// Burn the subtitle track into the video frames
    pub fn embed_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Subtitle embedding")
            .overwrite()
            .input(&video_path)
            .video_filter(format!("subtitles={}", subtitle_path.as_ref().display()))
            .video_codec("libx264")
            .audio_codec("aac");

        for option in additional_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output_path)
    }

    /// Slow playback: PTS stretched by the factor, audio tempo by its inverse
    pub fn slow_down<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        speed_factor: f64,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Video slowdown")
            .input(input_path)
            .video_filter(format!("setpts={}*PTS", speed_factor))
            .audio_filter(format!("atempo={}", 1.0 / speed_factor))
            .video_codec("libx264")
            .audio_codec("aac")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .overwrite()
            .output(output_path)
    }

    /// Loop the music file, duck it by the configured amount, trim to the
    /// video's duration, and mix with the original audio
    pub fn mix_background_music<P: AsRef<Path>>(
        &self,
        video_path: P,
        music_path: P,
        output_path: P,
        volume_db: f64,
        video_duration: f64,
    ) -> MediaCommand {
        let volume_factor = 10f64.powf(volume_db / 20.0);
        let graph = format!(
            "[1:a]volume={:.4},atrim=duration={:.3}[bgm];\
             [0:a][bgm]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]",
            volume_factor, video_duration
        );

        MediaCommand::new(&self.binary_path, "Background music mix")
            .input(video_path)
            .arg("-stream_loop")
            .arg("-1")
            .input(music_path)
            .filter_complex(graph)
            .map("0:v")
            .map("[aout]")
            .video_codec("libx264")
            .audio_codec("aac")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .overwrite()
            .output(output_path)
    }

    /// Concatenate the video with the outro clip
    pub fn append_outro<P: AsRef<Path>>(
        &self,
        video_path: P,
        outro_path: P,
        output_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Outro concatenation")
            .input(video_path)
            .input(outro_path)
            .filter_complex("[0:v][0:a][1:v][1:a]concat=n=2:v=1:a=1[v][a]")
            .map("[v]")
            .map("[a]")
            .video_codec("libx264")
            .audio_codec("aac")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .overwrite()
            .output(output_path)
    }

    /// Container/stream metadata as JSON, for duration probing
    pub fn probe_duration<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Duration probe")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration:stream=duration,codec_type")
            .arg("-of")
            .arg("json")
            .input(video_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
