//! Standard MIDI File decoding into the score model. Everything past this
//! boundary works in seconds; tick-to-second conversion happens here, once,
//! against the file's tempo map.

use std::error::Error;
use std::fmt;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::score::{Note, Score, Track};

/// Microseconds per beat when the file specifies no tempo (120 BPM).
const DEFAULT_TEMPO: u32 = 500_000;

/// Shortest duration given to a note whose note-off lands on its onset.
const MIN_NOTE_SECONDS: f32 = 0.05;

#[derive(Debug)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid MIDI file: {}", self.0)
    }
}

impl Error for ParseError {}

impl From<midly::Error> for ParseError {
    fn from(e: midly::Error) -> Self {
        Self(e.to_string())
    }
}

/// Converts absolute ticks to seconds. Tempo events from all tracks are
/// merged, since format 1 files keep them in a dedicated track.
struct TempoMap {
    /// (tick, seconds at that tick, microseconds per beat from there on)
    changes: Vec<(u32, f64, u32)>,
    ticks_per_beat: f64,
}

impl TempoMap {
    fn new(smf: &Smf) -> Result<Self, ParseError> {
        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int() as f64,
            Timing::Timecode(..) =>
                return Err(ParseError("SMPTE timing is not supported".into())),
        };

        let mut tempos = Vec::new();
        for track in &smf.tracks {
            let mut tick: u32 = 0;
            for event in track {
                tick += event.delta.as_int();
                if let TrackEventKind::Meta(MetaMessage::Tempo(t)) = event.kind {
                    tempos.push((tick, t.as_int()));
                }
            }
        }
        tempos.sort_by_key(|&(tick, _)| tick);

        let mut changes = vec![(0, 0.0, DEFAULT_TEMPO)];
        for (tick, tempo) in tempos {
            let seconds = seconds_at(&changes, tick, ticks_per_beat);
            changes.push((tick, seconds, tempo));
        }

        Ok(Self { changes, ticks_per_beat })
    }

    fn seconds(&self, tick: u32) -> f64 {
        seconds_at(&self.changes, tick, self.ticks_per_beat)
    }
}

fn seconds_at(changes: &[(u32, f64, u32)], tick: u32, ticks_per_beat: f64) -> f64 {
    let &(start_tick, start_seconds, tempo) = changes.iter()
        .rev()
        .find(|&&(t, ..)| t <= tick)
        .expect("tempo map always covers tick 0");
    let beats = (tick - start_tick) as f64 / ticks_per_beat;
    start_seconds + beats * tempo as f64 / 1_000_000.0
}

/// Decode raw SMF bytes into a score. Tracks that carry no notes (tempo or
/// marker tracks) are dropped.
pub fn parse_score(bytes: &[u8]) -> Result<Score, ParseError> {
    let smf = Smf::parse(bytes)?;
    let tempo_map = TempoMap::new(&smf)?;

    let mut tracks = Vec::new();
    for track in &smf.tracks {
        let mut notes = Vec::new();
        // (channel, key) -> (onset seconds, velocity)
        let mut pending = std::collections::HashMap::new();
        let mut tick: u32 = 0;

        for event in track {
            tick += event.delta.as_int();
            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };

            match message {
                // a note-on with zero velocity is a note-off
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    pending.insert((channel, key),
                        (tempo_map.seconds(tick), vel.as_int()));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    if let Some((start, vel)) = pending.remove(&(channel, key)) {
                        let end = tempo_map.seconds(tick);
                        notes.push(Note {
                            pitch: key.as_int(),
                            start: start as f32,
                            duration: ((end - start) as f32).max(MIN_NOTE_SECONDS),
                            velocity: vel as f32 / 127.0,
                        });
                    }
                }
                _ => (),
            }
        }

        if !notes.is_empty() {
            tracks.push(Track::new(notes));
        }
    }

    if tracks.is_empty() {
        return Err(ParseError("file contains no notes".into()));
    }

    Ok(Score::new(tracks))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Format-0 file, 480 ticks per beat, one track of the given events.
    fn smf(events: &[u8]) -> Vec<u8> {
        let mut bytes = vec![
            b'M', b'T', b'h', b'd', 0, 0, 0, 6, // header, length 6
            0, 0, // format 0
            0, 1, // one track
            0x01, 0xe0, // 480 ticks per beat
            b'M', b'T', b'r', b'k',
        ];
        let mut track = events.to_vec();
        track.extend_from_slice(&[0x00, 0xff, 0x2f, 0x00]); // end of track
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&track);
        bytes
    }

    #[test]
    fn test_garbage_fails() {
        assert!(parse_score(b"not a midi file").is_err());
        assert!(parse_score(&[]).is_err());
    }

    #[test]
    fn test_truncated_fails() {
        let bytes = smf(&[0x00, 0x90, 60, 64]);
        assert!(parse_score(&bytes[..bytes.len() - 6]).is_err());
    }

    #[test]
    fn test_single_note() {
        // note-on C4, note-off one beat later; default tempo is 120 BPM so
        // a beat lasts half a second
        let score = parse_score(&smf(&[
            0x00, 0x90, 60, 64, // delta 0, note on
            0x83, 0x60, 0x80, 60, 0, // delta 480, note off
        ])).unwrap();

        assert_eq!(score.tracks.len(), 1);
        let note = score.tracks[0].notes[0];
        assert_eq!(note.pitch, 60);
        assert_eq!(note.start, 0.0);
        assert!((note.duration - 0.5).abs() < 1e-6);
        assert!((note.velocity - 64.0 / 127.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        let score = parse_score(&smf(&[
            0x00, 0x90, 72, 100,
            0x83, 0x60, 0x90, 72, 0, // velocity 0 ends the note
        ])).unwrap();
        assert_eq!(score.note_count(), 1);
        assert!((score.tracks[0].notes[0].duration - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tempo_change_scales_time() {
        // tempo 60 BPM from tick 0, so one beat lasts a full second
        let score = parse_score(&smf(&[
            0x00, 0xff, 0x51, 0x03, 0x0f, 0x42, 0x40, // tempo 1,000,000 us
            0x00, 0x90, 60, 64,
            0x83, 0x60, 0x80, 60, 0,
        ])).unwrap();
        assert!((score.tracks[0].notes[0].duration - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_notes_fails() {
        assert!(parse_score(&smf(&[])).is_err());
    }
}
