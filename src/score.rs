//! Immutable note/track/score model.

/// Lowest pitch accepted anywhere in the model.
pub const MIN_PITCH: u8 = 0;
/// Highest pitch accepted anywhere in the model.
pub const MAX_PITCH: u8 = 127;
/// Number of displayable semitones.
pub const PITCH_COUNT: u8 = 128;

const NOTE_NAMES: [&str; 12] =
    ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// A single note event. Values never change after construction; edits
/// produce new notes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    /// MIDI-style semitone index, 0-127.
    pub pitch: u8,
    /// Onset in seconds from the start of the score.
    pub start: f32,
    /// Length in seconds, greater than zero.
    pub duration: f32,
    /// Normalized velocity in (0, 1].
    pub velocity: f32,
}

impl Note {
    pub fn new(pitch: u8, start: f32, duration: f32, velocity: f32) -> Self {
        Self { pitch, start, duration, velocity }
    }

    /// Time at which the note stops sounding.
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    /// Note name with octave, e.g. "C4" for pitch 60.
    pub fn name(&self) -> String {
        pitch_name(self.pitch)
    }
}

pub fn pitch_name(pitch: u8) -> String {
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// Check whether a pitch falls on a black key.
pub fn is_black_key(pitch: u8) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}

/// One voice of the score. Note order is insertion order; nothing here
/// requires sorting by onset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    pub notes: Vec<Note>,
}

impl Track {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }
}

/// The full document: an ordered collection of tracks. This is the unit of
/// undo/redo, so it is treated as immutable once it enters the history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Score {
    pub tracks: Vec<Track>,
}

impl Score {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Total length in seconds, recomputed on demand so that it can never
    /// go stale.
    pub fn duration(&self) -> f32 {
        self.notes().map(|n| n.end()).fold(0.0, f32::max)
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(|t| t.notes.is_empty())
    }

    /// Iterate over every note in every track.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.tracks.iter().flat_map(|t| t.notes.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        assert_eq!(Score::default().duration(), 0.0);

        let score = Score::new(vec![
            Track::new(vec![
                Note::new(60, 0.0, 2.0, 0.8),
                Note::new(64, 1.0, 0.5, 0.8),
            ]),
            Track::new(vec![Note::new(48, 2.5, 1.0, 0.5)]),
        ]);
        assert_eq!(score.duration(), 3.5);
        assert_eq!(score.note_count(), 3);
        assert!(!score.is_empty());
    }

    #[test]
    fn test_empty_tracks_are_empty_score() {
        let score = Score::new(vec![Track::default(), Track::default()]);
        assert!(score.is_empty());
        assert_eq!(score.duration(), 0.0);
    }

    #[test]
    fn test_pitch_name() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(69), "A4");
        assert_eq!(pitch_name(0), "C-1");
    }

    #[test]
    fn test_black_keys() {
        assert!(!is_black_key(60)); // C
        assert!(is_black_key(61)); // C#
        assert!(!is_black_key(64)); // E
        assert!(is_black_key(70)); // A#
    }
}
