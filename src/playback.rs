//! Score playback. The `Player` owns the sequencer frontend; the audio
//! thread owns the backend (see `run` in lib.rs). Notes are scheduled
//! frame by frame as the transport clock passes their onsets.

use fundsp::hacker32::*;

use crate::score::Score;

/// Master gain applied to every scheduled voice.
const VOICE_LEVEL: f32 = 0.2;
/// Attack/release applied to voices to avoid clicks.
const FADE_IN: f64 = 0.005;
const FADE_OUT: f64 = 0.05;
/// Extra transport time past the last note end before playback stops.
const END_SLACK: f64 = 0.25;

/// How often the transport position is sampled for display, in seconds.
pub const CLOCK_INTERVAL: f64 = 0.1;

pub struct Player {
    seq: Sequencer,
    playing: bool,
    time: f64,
}

impl Player {
    pub fn new(seq: Sequencer) -> Self {
        Self {
            seq,
            playing: false,
            time: 0.0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current transport position in seconds.
    pub fn position(&self) -> f64 {
        self.time
    }

    /// Start playback. Playing from the end of the score restarts at zero.
    pub fn play(&mut self, score: &Score) {
        if self.time >= score.duration() as f64 {
            self.time = 0.0;
        }
        self.playing = true;
    }

    /// Pause, keeping the current position.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self, score: &Score) {
        if self.playing {
            self.pause();
        } else {
            self.play(score);
        }
    }

    /// Jump the transport. Voices already scheduled keep sounding out their
    /// short durations; nothing new is triggered until the clock passes the
    /// new position.
    pub fn seek(&mut self, time: f64, score: &Score) {
        self.time = time.clamp(0.0, score.duration() as f64);
    }

    /// Advance the transport by `dt` and schedule every note whose onset
    /// was crossed this frame.
    pub fn frame(&mut self, score: &Score, dt: f64) {
        if !self.playing {
            return;
        }

        let prev = self.time;
        self.time += dt;

        for track in &score.tracks {
            for note in &track.notes {
                let start = note.start as f64;
                if start >= prev && start < self.time {
                    let offset = (start - prev).max(0.0);
                    let unit = sine_hz(midi_hz(note.pitch as f32))
                        * (note.velocity * VOICE_LEVEL)
                        >> split::<U2>();
                    self.seq.push_relative(
                        offset,
                        offset + note.duration as f64,
                        Fade::Smooth,
                        FADE_IN,
                        FADE_OUT,
                        Box::new(unit),
                    );
                }
            }
        }

        if self.time >= score.duration() as f64 + END_SLACK {
            self.playing = false;
        }
    }
}

/// Bridge between the transport and everything that displays time. The
/// playhead and time readout follow this sampled value, not the raw
/// transport, so they update at a steady rate; seeks resync immediately
/// so the playhead never visibly lags a drag.
pub struct Clock {
    position: f64,
    since_sample: f64,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            since_sample: 0.0,
        }
    }

    /// Sampled transport position in seconds.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Called once per frame. Samples the transport at most every
    /// `CLOCK_INTERVAL` seconds while playing; while paused the last
    /// sampled value stays current.
    pub fn update(&mut self, player: &Player, dt: f64) {
        if !player.is_playing() {
            return;
        }
        self.since_sample += dt;
        if self.since_sample >= CLOCK_INTERVAL {
            self.since_sample = 0.0;
            self.position = player.position();
        }
    }

    /// Immediately adopt the transport's position.
    pub fn resync(&mut self, player: &Player) {
        self.position = player.position();
        self.since_sample = 0.0;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::score::{Note, Track};

    use super::*;

    fn player() -> Player {
        Player::new(Sequencer::new(false, 2))
    }

    fn score() -> Score {
        Score::new(vec![Track::new(vec![Note::new(69, 0.0, 2.0, 1.0)])])
    }

    #[test]
    fn test_transport_advances_only_while_playing() {
        let score = score();
        let mut player = player();
        player.frame(&score, 0.5);
        assert_eq!(player.position(), 0.0);

        player.play(&score);
        player.frame(&score, 0.5);
        assert_eq!(player.position(), 0.5);

        player.pause();
        player.frame(&score, 0.5);
        assert_eq!(player.position(), 0.5);
    }

    #[test]
    fn test_stops_past_score_end() {
        let score = score();
        let mut player = player();
        player.play(&score);
        player.frame(&score, 3.0);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_play_from_end_restarts() {
        let score = score();
        let mut player = player();
        player.seek(10.0, &score);
        assert_eq!(player.position(), 2.0); // clamped to score end
        player.play(&score);
        assert_eq!(player.position(), 0.0);
    }

    #[test]
    fn test_seek_clamps_below_zero() {
        let score = score();
        let mut player = player();
        player.seek(-1.0, &score);
        assert_eq!(player.position(), 0.0);
    }

    #[test]
    fn test_clock_samples_at_interval() {
        let score = score();
        let mut player = player();
        let mut clock = Clock::new();
        player.play(&score);

        player.frame(&score, 0.05);
        clock.update(&player, 0.05);
        assert_eq!(clock.position(), 0.0); // interval not yet reached

        player.frame(&score, 0.06);
        clock.update(&player, 0.06);
        assert!((clock.position() - 0.11).abs() < 1e-9);
    }

    #[test]
    fn test_clock_freezes_on_pause_and_resyncs_on_seek() {
        let score = score();
        let mut player = player();
        let mut clock = Clock::new();
        player.play(&score);
        player.frame(&score, 0.2);
        clock.update(&player, 0.2);
        let sampled = clock.position();

        player.pause();
        clock.update(&player, 1.0);
        assert_eq!(clock.position(), sampled);

        player.seek(1.5, &score);
        clock.resync(&player);
        assert_eq!(clock.position(), 1.5);
    }
}
