use crate::shared::constants::UNKNOWN_SPEAKER;

/// A span of recognised speech. Recognition output is ordered by `start_time`.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
        }
    }
}

/// An interval attributed to one speaker by the diarization engine.
///
/// Turns may overlap or leave gaps; that is the engine's business.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeakerTurn {
    pub start_time: f64,
    pub end_time: f64,
    pub speaker: String,
}

impl SpeakerTurn {
    pub fn new(start_time: f64, end_time: f64, speaker: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            speaker: speaker.into(),
        }
    }

    /// Closed-interval containment, so a segment starting exactly on a turn
    /// boundary belongs to that turn.
    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// Number of distinct speaker labels among `turns`, not counting turns no
/// speaker could be matched to.
pub fn speaker_count(turns: &[SpeakerTurn]) -> usize {
    let mut labels: Vec<&str> = turns
        .iter()
        .map(|t| t.speaker.as_str())
        .filter(|&label| label != UNKNOWN_SPEAKER)
        .collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let turn = SpeakerTurn::new(1.0, 2.0, "SPEAKER_00");
        assert!(turn.contains(1.0));
        assert!(turn.contains(2.0));
        assert!(!turn.contains(2.001));
        assert!(!turn.contains(0.999));
    }

    #[test]
    fn test_speaker_count_distinct_labels() {
        let turns = vec![
            SpeakerTurn::new(0.0, 1.0, "SPEAKER_00"),
            SpeakerTurn::new(1.0, 2.0, "SPEAKER_01"),
            SpeakerTurn::new(2.0, 3.0, "SPEAKER_00"),
        ];
        assert_eq!(speaker_count(&turns), 2);
        assert_eq!(speaker_count(&[]), 0);
    }

    #[test]
    fn test_speaker_count_ignores_unmatched_turns() {
        let turns = vec![
            SpeakerTurn::new(0.0, 1.0, "SPEAKER_00"),
            SpeakerTurn::new(1.0, 2.0, UNKNOWN_SPEAKER),
            SpeakerTurn::new(2.0, 3.0, "SPEAKER_01"),
        ];
        assert_eq!(speaker_count(&turns), 2);
        assert_eq!(speaker_count(&[SpeakerTurn::new(0.0, 1.0, UNKNOWN_SPEAKER)]), 0);
    }
}
