use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::cue::CueBuilder;
use crate::error::{KieloError, Result};
use crate::media::{MediaProcessor, MediaProcessorFactory};
use crate::subtitle::{generate_ass, subtitle_path_for, SubtitleTrack};
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::{SegmentTranslator, TranslatorFactory};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

pub struct Workflow {
    config: Config,
    transcriber: Box<dyn Transcriber>,
    translator: SegmentTranslator,
    media: Box<dyn MediaProcessor>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
        let backend = TranslatorFactory::create_backend(config.translate.clone())?;
        let translator = SegmentTranslator::new(backend, config.translate.clone());
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies before any video work starts.
        media.check_availability()?;

        Ok(Self {
            config,
            transcriber,
            translator,
            media,
        })
    }

    /// Assemble a workflow from explicit components. Tests use this to plug
    /// in deterministic fakes behind the seam traits.
    pub fn with_components(
        config: Config,
        transcriber: Box<dyn Transcriber>,
        translator: SegmentTranslator,
        media: Box<dyn MediaProcessor>,
    ) -> Self {
        Self {
            config,
            transcriber,
            translator,
            media,
        }
    }

    /// Process every video file in the configured source directory, one at a
    /// time. Per-file failures are reported and do not stop the batch.
    pub async fn process_batch(&self) -> Result<()> {
        let source_dir = &self.config.batch.source_dir;
        if !source_dir.is_dir() {
            return Err(KieloError::Config(format!(
                "Source path is not a directory: {}",
                source_dir.display()
            )));
        }

        fs::create_dir_all(&self.config.batch.output_dir).await?;
        fs::create_dir_all(&self.config.batch.subtitles_dir).await?;

        let mut video_files: Vec<PathBuf> = WalkDir::new(source_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        video_files.sort();

        info!("Found {} video files to process", video_files.len());

        let progress = ProgressBar::new(video_files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut failures = 0usize;
        for video_path in &video_files {
            let file_name = video_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            progress.set_message(file_name.clone());

            let output_path = self.config.batch.output_dir.join(&file_name);
            if self.config.batch.skip_existing && output_path.exists() {
                info!("Skipping {}: output already exists", file_name);
                progress.inc(1);
                continue;
            }

            match self.process_video(video_path, &output_path).await {
                Ok(()) => info!("Successfully processed: {}", video_path.display()),
                Err(e) => {
                    failures += 1;
                    warn!("Failed to process {}: {}", video_path.display(), e);
                }
            }
            progress.inc(1);
        }
        progress.finish_with_message("done");

        info!(
            "Batch complete: {} processed, {} failed",
            video_files.len() - failures,
            failures
        );
        Ok(())
    }

    /// Full per-video pipeline: extract audio, transcribe, translate, build
    /// cues, render the subtitle track, embed it, then apply the slowdown,
    /// music mix, and outro steps. Any error aborts this video's run; no
    /// partial output is left at the final path.
    pub async fn process_video(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        if !input_path.exists() {
            return Err(KieloError::FileNotFound(input_path.display().to_string()));
        }

        info!("Processing video: {}", input_path.display());

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::create_dir_all(&self.config.batch.subtitles_dir).await?;

        // Intermediate artifacts live in scratch space and disappear with it.
        let scratch = tempfile::tempdir()?;
        let file_name = input_path
            .file_name()
            .ok_or_else(|| KieloError::Config("Invalid video filename".to_string()))?
            .to_string_lossy()
            .to_string();

        let subtitle_path = self.render_subtitles(input_path, scratch.path()).await?;

        info!("Step: embedding subtitles");
        let subtitled = scratch.path().join(format!("subtitled_{}", file_name));
        self.media
            .embed_subtitles(input_path, &subtitle_path, &subtitled)
            .await?;

        let mut current = subtitled;

        if self.config.media.speed_factor != 1.0 {
            info!("Step: slowing down playback");
            let slowed = scratch.path().join(format!("slowed_{}", file_name));
            self.media
                .slow_down(&current, &slowed, self.config.media.speed_factor)
                .await?;
            current = slowed;
        }

        if let Some(music_file) = &self.config.media.music_file {
            info!("Step: mixing background music");
            let mixed = scratch.path().join(format!("mixed_{}", file_name));
            self.media
                .mix_background_music(&current, music_file, &mixed, self.config.media.music_volume_db)
                .await?;
            current = mixed;
        }

        if let Some(outro_file) = &self.config.media.outro_file {
            info!("Step: appending outro");
            let with_outro = scratch.path().join(format!("outro_{}", file_name));
            self.media
                .append_outro(&current, outro_file, &with_outro)
                .await?;
            current = with_outro;
        }

        move_into_place(&current, output_path).await?;
        info!("Finished video: {}", output_path.display());
        Ok(())
    }

    /// Transcribe, translate, build cues, and write the ASS track to its
    /// deterministic path in the subtitles directory.
    async fn render_subtitles(&self, input_path: &Path, scratch: &Path) -> Result<PathBuf> {
        let audio_stem = input_path
            .file_stem()
            .ok_or_else(|| KieloError::Config("Invalid video filename".to_string()))?;
        let audio_path = scratch.join(format!("{}.wav", audio_stem.to_string_lossy()));

        info!("Step: extracting audio");
        self.media.extract_audio(input_path, &audio_path).await?;

        info!("Step: transcribing");
        let segments = self
            .transcriber
            .transcribe(&audio_path, &self.config.transcriber.language)
            .await?;
        if segments.is_empty() {
            info!("No speech detected; writing an empty subtitle track");
        }

        info!("Step: translating");
        let translated = self.translator.translate_segments(&segments).await?;

        info!("Step: building cues");
        let cues = CueBuilder::new(self.config.cue.clone()).build(&translated)?;

        info!("Step: rendering subtitle track");
        let subtitle_path = subtitle_path_for(input_path, &self.config.batch.subtitles_dir)?;
        let track = SubtitleTrack::new(cues, self.config.style.clone());
        generate_ass(&track, &subtitle_path).await?;

        Ok(subtitle_path)
    }

    /// Extract audio from a video file (CLI `extract` command)
    pub async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        self.media.extract_audio(video_path, audio_path).await
    }

    /// Transcribe an audio file into a source-only subtitle track (CLI
    /// `transcribe` command)
    pub async fn transcribe_audio(&self, audio_path: &Path, output_path: &Path) -> Result<()> {
        let segments = self
            .transcriber
            .transcribe(audio_path, &self.config.transcriber.language)
            .await?;

        let cues = CueBuilder::new(self.config.cue.clone()).build(
            &segments
                .iter()
                .map(|seg| crate::translate::TranslatedSegment {
                    start: seg.start,
                    end: seg.end,
                    source: seg.text.clone(),
                    target: String::new(),
                })
                .collect::<Vec<_>>(),
        )?;

        let track = SubtitleTrack::new(cues, self.config.style.clone());
        generate_ass(&track, output_path).await
    }

    /// Embed an existing subtitle track into a video (CLI `embed` command)
    pub async fn embed_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        self.media
            .embed_subtitles(video_path, subtitle_path, output_path)
            .await
    }
}

/// Move a finished artifact to its final path. Rename when possible; scratch
/// space may be on a different filesystem, in which case copy and remove.
async fn move_into_place(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }
    fs::copy(src, dst).await?;
    let _ = fs::remove_file(src).await;
    Ok(())
}
