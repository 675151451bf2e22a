//! Algorithmic transformations over the score. Each transform is a pure
//! function from one score to a new score; inputs are never mutated, and
//! randomness comes from an injected source so results are reproducible
//! under test.

use std::error::Error;
use std::fmt;

use rand::Rng;

use crate::score::{Note, Score, Track, MAX_PITCH};

/// Interval added for the upper harmony voices, in semitones.
const THIRD: u8 = 4;
const FIFTH: u8 = 7;

/// Number of notes appended by the extend transform.
const EXTEND_COUNT: u32 = 4;
/// Length of each appended note, in seconds.
const EXTEND_NOTE_SECONDS: f32 = 1.0;
/// Extension pitches stay within this many semitones of the last note.
const EXTEND_PITCH_SPREAD: i32 = 5;

/// Perturbation pitch offset bound, in semitones.
const PERTURB_PITCH_SPREAD: i32 = 2;
/// Perturbation duration step, in seconds.
const PERTURB_DURATION_STEP: f32 = 0.1;
/// Durations never shrink below this.
const MIN_DURATION: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformError {
    /// The score has no notes at all.
    EmptyScore,
    /// A track has no notes to extend from.
    EmptyTrack,
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::EmptyScore => write!(f, "the score has no notes"),
            Self::EmptyTrack => write!(f, "cannot extend an empty track"),
        }
    }
}

impl Error for TransformError {}

/// Re-entrancy guard error. The UI disables transform controls while a
/// transform is outstanding, so this should stay unreachable from buttons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformInFlightError;

impl fmt::Display for TransformInFlightError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a transform is already running")
    }
}

impl Error for TransformInFlightError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformKind {
    Harmonize,
    Extend,
    Perturb,
}

impl TransformKind {
    pub const ALL: [TransformKind; 3] =
        [Self::Harmonize, Self::Extend, Self::Perturb];

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Harmonize => "Add harmony",
            Self::Extend => "Extend melody",
            Self::Perturb => "Improve melody",
        }
    }

    pub fn apply(&self, score: &Score, rng: &mut impl Rng)
    -> Result<Score, TransformError> {
        match self {
            Self::Harmonize => harmonize(score),
            Self::Extend => extend(score, rng),
            Self::Perturb => perturb(score, rng),
        }
    }
}

fn clamp_pitch(pitch: i32) -> u8 {
    pitch.clamp(0, MAX_PITCH as i32) as u8
}

/// Emit each note along with copies a major third and a perfect fifth
/// above it, tripling the note count of every track.
pub fn harmonize(score: &Score) -> Result<Score, TransformError> {
    if score.is_empty() {
        return Err(TransformError::EmptyScore);
    }

    let tracks = score.tracks.iter().map(|track| {
        Track::new(track.notes.iter().flat_map(|&note| {
            let third = note.pitch.saturating_add(THIRD).min(MAX_PITCH);
            let fifth = note.pitch.saturating_add(FIFTH).min(MAX_PITCH);
            [
                note,
                Note { pitch: third, ..note },
                Note { pitch: fifth, ..note },
            ]
        }).collect())
    }).collect();

    Ok(Score::new(tracks))
}

/// The note a track's extension continues from: latest end time, ties
/// broken by earliest start, then lowest pitch.
fn last_note(track: &Track) -> Option<&Note> {
    track.notes.iter().reduce(|best, note| {
        if note.end() > best.end()
            || (note.end() == best.end()
                && (note.start, note.pitch) < (best.start, best.pitch)) {
            note
        } else {
            best
        }
    })
}

/// Append a short random continuation after the last note of each track.
pub fn extend(score: &Score, rng: &mut impl Rng)
-> Result<Score, TransformError> {
    let tracks = score.tracks.iter().map(|track| {
        let last = *last_note(track).ok_or(TransformError::EmptyTrack)?;
        let mut notes = track.notes.clone();
        for i in 0..EXTEND_COUNT {
            let offset = rng.gen_range(-EXTEND_PITCH_SPREAD..=EXTEND_PITCH_SPREAD);
            notes.push(Note {
                pitch: clamp_pitch(last.pitch as i32 + offset),
                start: last.end() + i as f32,
                duration: EXTEND_NOTE_SECONDS,
                velocity: last.velocity,
            });
        }
        Ok(Track::new(notes))
    }).collect::<Result<_, _>>()?;

    Ok(Score::new(tracks))
}

/// Jitter every note's pitch and duration by a small bounded amount,
/// leaving onsets and velocities alone.
pub fn perturb(score: &Score, rng: &mut impl Rng)
-> Result<Score, TransformError> {
    let tracks = score.tracks.iter().map(|track| {
        Track::new(track.notes.iter().map(|&note| {
            let offset = rng.gen_range(-PERTURB_PITCH_SPREAD..=PERTURB_PITCH_SPREAD);
            let steps = rng.gen_range(-1..=1) as f32;
            Note {
                pitch: clamp_pitch(note.pitch as i32 + offset),
                duration: (note.duration + steps * PERTURB_DURATION_STEP)
                    .max(MIN_DURATION),
                ..note
            }
        }).collect())
    }).collect();

    Ok(Score::new(tracks))
}
