//! Cue building: turns translated segments into display cues with
//! normalized timing. This is where the pipeline's core invariant is
//! enforced: cues are ordered, non-overlapping, and monotonically
//! increasing in start time.

use tracing::debug;

use crate::config::CueConfig;
use crate::error::{KieloError, Result};
use crate::translate::TranslatedSegment;

/// A time-bounded span of on-screen bilingual subtitle text.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub source: String,
    pub target: String,
}

impl Cue {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Stacked display text: source line over target line. A whitespace-only
    /// translation produces the source line alone, never a blank second line.
    pub fn display_text(&self) -> String {
        if self.target.trim().is_empty() {
            self.source.clone()
        } else {
            format!("{}\n{}", self.source, self.target)
        }
    }
}

/// Builds cues from translated segments.
pub struct CueBuilder {
    config: CueConfig,
}

impl CueBuilder {
    pub fn new(config: CueConfig) -> Self {
        Self { config }
    }

    /// Normalize timing and merge degenerate spans.
    ///
    /// Each segment is extended to the minimum on-screen duration but never
    /// past the next segment's original start. When clamping leaves a span
    /// below the hard floor, its text is carried into the next cue instead of
    /// emitting a degenerate cue. A trailing pass snaps sub-threshold gaps
    /// closed by extending the earlier cue, which cannot disturb any later
    /// pair.
    pub fn build(&self, segments: &[TranslatedSegment]) -> Result<Vec<Cue>> {
        let mut cues: Vec<Cue> = Vec::new();
        let mut pending: Option<(f64, Vec<String>, Vec<String>)> = None;

        for (i, seg) in segments.iter().enumerate() {
            let (start, mut sources, mut targets) =
                pending.take().unwrap_or((seg.start, Vec::new(), Vec::new()));

            let source = seg.source.trim();
            if !source.is_empty() {
                sources.push(source.to_string());
            }
            let target = seg.target.trim();
            if !target.is_empty() {
                targets.push(target.to_string());
            }

            let desired_end = seg.end.max(start + self.config.min_duration);
            let cap = segments
                .get(i + 1)
                .map(|next| next.start)
                .unwrap_or(f64::INFINITY);
            let end = desired_end.min(cap);

            if end - start < self.config.hard_floor && i + 1 < segments.len() {
                debug!(
                    "Clamped span at {:.2}s is below the hard floor; merging into next cue",
                    start
                );
                pending = Some((start, sources, targets));
                continue;
            }

            cues.push(Cue {
                start,
                end,
                source: sources.join(" "),
                target: targets.join(" "),
            });
        }

        self.snap_gaps(&mut cues);
        self.validate(&cues)?;

        Ok(cues)
    }

    /// Close sub-threshold gaps so there is no visible blank flash between
    /// consecutive cues.
    fn snap_gaps(&self, cues: &mut [Cue]) {
        for i in 0..cues.len().saturating_sub(1) {
            let gap = cues[i + 1].start - cues[i].end;
            if gap > 0.0 && gap < self.config.gap_threshold {
                cues[i].end = cues[i + 1].start;
            }
        }
    }

    /// The core invariant, checked rather than assumed: sorted, pairwise
    /// non-overlapping, strictly increasing starts, positive durations.
    fn validate(&self, cues: &[Cue]) -> Result<()> {
        for (i, cue) in cues.iter().enumerate() {
            if cue.end <= cue.start {
                return Err(KieloError::CueTiming(format!(
                    "Cue {} has non-positive duration ({:.3}s to {:.3}s)",
                    i, cue.start, cue.end
                )));
            }
            if let Some(next) = cues.get(i + 1) {
                if next.start <= cue.start {
                    return Err(KieloError::CueTiming(format!(
                        "Cue {} start {:.3}s does not increase past {:.3}s",
                        i + 1,
                        next.start,
                        cue.start
                    )));
                }
                if cue.end > next.start {
                    return Err(KieloError::CueTiming(format!(
                        "Cue {} end {:.3}s overlaps cue {} start {:.3}s",
                        i,
                        cue.end,
                        i + 1,
                        next.start
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CueConfig {
        CueConfig {
            min_duration: 1.0,
            hard_floor: 0.3,
            gap_threshold: 0.2,
        }
    }

    fn seg(start: f64, end: f64, source: &str, target: &str) -> TranslatedSegment {
        TranslatedSegment {
            start,
            end,
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    fn assert_invariant(cues: &[Cue]) {
        for pair in cues.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert!(pair[0].end <= pair[1].start);
        }
        for cue in cues {
            assert!(cue.duration() > 0.0);
        }
    }

    #[test]
    fn test_short_segment_extended_to_min_duration() {
        let builder = CueBuilder::new(config());
        let cues = builder.build(&[seg(0.0, 0.4, "Hei", "Hello")]).unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 0.0);
        assert_eq!(cues[0].end, 1.0);
    }

    #[test]
    fn test_extension_clamped_to_next_start() {
        let builder = CueBuilder::new(config());
        let cues = builder
            .build(&[
                seg(0.0, 0.4, "Hei", "Hello"),
                seg(0.8, 2.0, "maailma", "world"),
            ])
            .unwrap();

        assert_eq!(cues.len(), 2);
        // Clamped at the next segment's original start; still above the floor.
        assert_eq!(cues[0].end, 0.8);
        assert_eq!(cues[1].start, 0.8);
        assert_invariant(&cues);
    }

    #[test]
    fn test_degenerate_cue_merges_into_next() {
        let builder = CueBuilder::new(config());
        let cues = builder
            .build(&[
                seg(0.0, 0.1, "No", "Well"),
                seg(0.15, 2.0, "niin", "then"),
            ])
            .unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 0.0);
        assert_eq!(cues[0].end, 2.0);
        // Merged cue concatenates both texts in order.
        assert_eq!(cues[0].source, "No niin");
        assert_eq!(cues[0].target, "Well then");
    }

    #[test]
    fn test_gap_below_threshold_is_snapped_closed() {
        let builder = CueBuilder::new(config());
        let cues = builder
            .build(&[
                seg(0.0, 1.0, "Hei", "Hello"),
                seg(1.05, 2.0, "Maailma", "World"),
            ])
            .unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].end, cues[1].start);
        assert!(cues[0].duration() >= 1.0);
        assert_invariant(&cues);
    }

    #[test]
    fn test_gap_above_threshold_is_preserved() {
        let builder = CueBuilder::new(config());
        let cues = builder
            .build(&[
                seg(0.0, 1.5, "Hei", "Hello"),
                seg(3.0, 4.5, "Maailma", "World"),
            ])
            .unwrap();

        assert_eq!(cues[0].end, 1.5);
        assert_eq!(cues[1].start, 3.0);
    }

    #[test]
    fn test_invariant_holds_for_dense_input() {
        let builder = CueBuilder::new(config());
        let segments: Vec<TranslatedSegment> = (0..20)
            .map(|i| {
                let start = i as f64 * 0.5;
                seg(start, start + 0.35, "sana", "word")
            })
            .collect();

        let cues = builder.build(&segments).unwrap();
        assert_invariant(&cues);
        assert!(!cues.is_empty());
    }

    #[test]
    fn test_min_duration_holds_outside_clamping() {
        let builder = CueBuilder::new(config());
        let segments = vec![
            seg(0.0, 0.2, "yksi", "one"),
            seg(2.0, 2.3, "kaksi", "two"),
            seg(4.0, 6.0, "kolme", "three"),
        ];

        let cues = builder.build(&segments).unwrap();
        assert_eq!(cues.len(), 3);
        for cue in &cues {
            assert!(cue.duration() >= 1.0);
        }
        assert_invariant(&cues);
    }

    #[test]
    fn test_empty_translation_gives_single_line_display() {
        let cue = Cue {
            start: 0.0,
            end: 1.0,
            source: "Hei".to_string(),
            target: "  ".to_string(),
        };

        assert_eq!(cue.display_text(), "Hei");
    }

    #[test]
    fn test_bilingual_display_stacks_lines() {
        let cue = Cue {
            start: 0.0,
            end: 1.0,
            source: "Hei".to_string(),
            target: "Hello".to_string(),
        };

        assert_eq!(cue.display_text(), "Hei\nHello");
    }

    #[test]
    fn test_empty_input_yields_no_cues() {
        let builder = CueBuilder::new(config());
        assert!(builder.build(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_validation_rejects_overlapping_cues() {
        let builder = CueBuilder::new(config());
        let bad = vec![
            Cue {
                start: 0.0,
                end: 2.0,
                source: "a".to_string(),
                target: String::new(),
            },
            Cue {
                start: 1.0,
                end: 3.0,
                source: "b".to_string(),
                target: String::new(),
            },
        ];

        assert!(matches!(
            builder.validate(&bad),
            Err(KieloError::CueTiming(_))
        ));
    }

    #[test]
    fn test_validation_rejects_non_increasing_starts() {
        let builder = CueBuilder::new(config());
        let bad = vec![
            Cue {
                start: 2.0,
                end: 3.0,
                source: "a".to_string(),
                target: String::new(),
            },
            Cue {
                start: 1.0,
                end: 4.0,
                source: "b".to_string(),
                target: String::new(),
            },
        ];

        assert!(matches!(
            builder.validate(&bad),
            Err(KieloError::CueTiming(_))
        ));
    }
}
