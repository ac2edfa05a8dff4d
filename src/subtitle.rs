//! ASS subtitle track rendering.
//!
//! One `Dialogue` event is emitted per cue, carrying the source line and,
//! when a translation is present, the target line after a `\N` break and a
//! `{\rTarget}` style reset. The parser reads the same dialect back for
//! verification.

use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::config::StyleConfig;
use crate::cue::Cue;
use crate::error::{KieloError, Result};

/// Marker separating the source and target lines inside an event.
const TARGET_BREAK: &str = r"\N{\rTarget}";

/// An ordered cue sequence plus the style definition it renders with.
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    pub cues: Vec<Cue>,
    pub style: StyleConfig,
}

impl SubtitleTrack {
    pub fn new(cues: Vec<Cue>, style: StyleConfig) -> Self {
        Self { cues, style }
    }
}

/// Render the track into ASS text.
pub fn render_ass(track: &SubtitleTrack) -> String {
    let style = &track.style;
    let mut content = format!(
        "[Script Info]\n\
         Title: Auto-generated Subtitles\n\
         ScriptType: v4.00+\n\
         WrapStyle: 0\n\
         ScaledBorderAndShadow: yes\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Source,{font},{size},{source_colour},&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,{outline},0,{alignment},10,10,{margin_v},1\n\
         Style: Target,{font},{size},{target_colour},&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,{outline},0,{alignment},10,10,{margin_v},1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        font = style.font,
        size = style.font_size,
        source_colour = style.source_colour,
        target_colour = style.target_colour,
        outline = style.outline,
        alignment = style.alignment,
        margin_v = style.margin_v,
    );

    for cue in &track.cues {
        let start = format_ass_time(cue.start);
        let end = format_ass_time(cue.end);
        let source = sanitize_event_text(&cue.source);
        let target = sanitize_event_text(&cue.target);

        let text = if target.is_empty() {
            source
        } else {
            format!("{}{}{}", source, TARGET_BREAK, target)
        };

        content.push_str(&format!(
            "Dialogue: 0,{},{},Source,,0,0,0,,{}\n",
            start, end, text
        ));
    }

    content
}

/// Render the track and write it to disk.
pub async fn generate_ass<P: AsRef<Path>>(track: &SubtitleTrack, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating ASS file: {}", output_path.display());

    let content = render_ass(track);
    fs::write(output_path, content).await.map_err(KieloError::Io)?;

    info!("ASS file generated with {} events", track.cues.len());
    Ok(())
}

/// Parse cues back out of ASS text produced by [`render_ass`]. Only the
/// dialect this crate writes is understood; styles and script metadata are
/// skipped.
pub fn parse_ass(content: &str) -> Result<Vec<Cue>> {
    let mut cues = Vec::new();

    for line in content.lines() {
        let Some(event) = line.strip_prefix("Dialogue: ") else {
            continue;
        };

        // Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
        let fields: Vec<&str> = event.splitn(10, ',').collect();
        if fields.len() != 10 {
            return Err(KieloError::CueTiming(format!(
                "Malformed dialogue event: {}",
                line
            )));
        }

        let start = parse_ass_time(fields[1])?;
        let end = parse_ass_time(fields[2])?;
        let text = fields[9];

        let (source, target) = match text.split_once(TARGET_BREAK) {
            Some((source, target)) => (source.to_string(), target.to_string()),
            None => (text.to_string(), String::new()),
        };

        cues.push(Cue {
            start,
            end,
            source,
            target,
        });
    }

    Ok(cues)
}

/// Format seconds in ASS time notation (H:MM:SS.cc). Centiseconds are
/// truncated, never rounded up; the same rule applies to every cue so start
/// and end stay consistent.
pub fn format_ass_time(seconds: f64) -> String {
    let total_centis = (seconds * 100.0) as u64;
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let secs = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
}

/// Parse ASS time notation back into seconds.
pub fn parse_ass_time(value: &str) -> Result<f64> {
    let bad = || KieloError::CueTiming(format!("Malformed timestamp: {}", value));

    let (clock, centis) = value.trim().split_once('.').ok_or_else(bad)?;
    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return Err(bad());
    }

    let hours: u64 = parts[0].parse().map_err(|_| bad())?;
    let minutes: u64 = parts[1].parse().map_err(|_| bad())?;
    let secs: u64 = parts[2].parse().map_err(|_| bad())?;
    let centis: u64 = centis.parse().map_err(|_| bad())?;

    Ok((hours * 3600 + minutes * 60 + secs) as f64 + centis as f64 / 100.0)
}

/// Event text is a single field on one line; newlines inside cue text would
/// corrupt the file.
fn sanitize_event_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Deterministic subtitle path for a video: `<subtitles_dir>/<stem>.ass`.
pub fn subtitle_path_for<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    subtitles_dir: Q,
) -> Result<std::path::PathBuf> {
    let video_path = video_path.as_ref();
    let stem = video_path
        .file_stem()
        .ok_or_else(|| KieloError::Config(format!("Invalid video filename: {}", video_path.display())))?;

    Ok(subtitles_dir.as_ref().join(format!("{}.ass", stem.to_string_lossy())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn style() -> StyleConfig {
        Config::default().style
    }

    fn cue(start: f64, end: f64, source: &str, target: &str) -> Cue {
        Cue {
            start,
            end,
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_format_ass_time() {
        assert_eq!(format_ass_time(0.0), "0:00:00.00");
        assert_eq!(format_ass_time(65.12), "0:01:05.12");
        assert_eq!(format_ass_time(3661.5), "1:01:01.50");
    }

    #[test]
    fn test_format_ass_time_truncates() {
        // 12.349 truncates to .34, never rounds to .35.
        assert_eq!(format_ass_time(12.349), "0:00:12.34");
    }

    #[test]
    fn test_parse_ass_time() {
        assert_eq!(parse_ass_time("0:00:00.00").unwrap(), 0.0);
        assert_eq!(parse_ass_time("0:01:05.12").unwrap(), 65.12);
        assert_eq!(parse_ass_time("1:01:01.50").unwrap(), 3661.5);
        assert!(parse_ass_time("garbage").is_err());
    }

    #[test]
    fn test_header_carries_both_styles() {
        let track = SubtitleTrack::new(vec![], style());
        let content = render_ass(&track);

        assert!(content.contains("[Script Info]"));
        assert!(content.contains("[V4+ Styles]"));
        assert!(content.contains("Style: Source,Roboto,12,&H00EA72AC,"));
        assert!(content.contains("Style: Target,Roboto,12,&H00FFFFFF,"));
        assert!(content.contains("[Events]"));
    }

    #[test]
    fn test_bilingual_event_has_both_lines() {
        let track = SubtitleTrack::new(vec![cue(0.0, 1.5, "Hei", "Hello")], style());
        let content = render_ass(&track);

        assert!(content
            .contains(r"Dialogue: 0,0:00:00.00,0:00:01.50,Source,,0,0,0,,Hei\N{\rTarget}Hello"));
    }

    #[test]
    fn test_source_only_event_has_single_line() {
        let track = SubtitleTrack::new(vec![cue(0.0, 1.5, "Hei", "  ")], style());
        let content = render_ass(&track);

        assert!(content.contains("Dialogue: 0,0:00:00.00,0:00:01.50,Source,,0,0,0,,Hei\n"));
        assert!(!content.contains(TARGET_BREAK));
    }

    #[test]
    fn test_render_parse_roundtrip() {
        let cues = vec![
            cue(0.0, 1.05, "Hei", "Hello"),
            cue(1.05, 2.5, "Mitä kuuluu, ystävä?", "How are you, friend?"),
            cue(3.0, 4.25, "Kiitos", ""),
        ];
        let track = SubtitleTrack::new(cues.clone(), style());

        let parsed = parse_ass(&render_ass(&track)).unwrap();

        assert_eq!(parsed.len(), cues.len());
        for (original, roundtripped) in cues.iter().zip(&parsed) {
            assert!((original.start - roundtripped.start).abs() < 0.01 + 1e-9);
            assert!((original.end - roundtripped.end).abs() < 0.01 + 1e-9);
            assert_eq!(original.source, roundtripped.source);
            assert_eq!(original.target, roundtripped.target);
        }
    }

    #[test]
    fn test_newlines_in_cue_text_are_flattened() {
        let track = SubtitleTrack::new(vec![cue(0.0, 1.0, "Hei\nsinä", "Hey\nyou")], style());
        let parsed = parse_ass(&render_ass(&track)).unwrap();

        assert_eq!(parsed[0].source, "Hei sinä");
        assert_eq!(parsed[0].target, "Hey you");
    }

    #[test]
    fn test_subtitle_path_derivation() {
        let path = subtitle_path_for(
            Path::new("source/ruokaostokset.mp4"),
            Path::new("subtitles"),
        )
        .unwrap();

        assert_eq!(path, Path::new("subtitles/ruokaostokset.ass"));
    }

    #[tokio::test]
    async fn test_generate_ass_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ass");
        let track = SubtitleTrack::new(vec![cue(0.0, 1.0, "Hei", "Hello")], style());

        generate_ass(&track, &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Dialogue: 0,"));
    }

    #[tokio::test]
    async fn test_generate_ass_unwritable_path_is_io_error() {
        let track = SubtitleTrack::new(vec![], style());
        let result = generate_ass(&track, Path::new("/nonexistent-dir/out.ass")).await;

        assert!(matches!(result, Err(KieloError::Io(_))));
    }
}
