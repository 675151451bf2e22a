//! MIDI piano-roll viewer with algorithmic melody transforms and
//! linear undo/redo.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use fundsp::hacker32::{AudioUnit, BlockRateAdapter, Sequencer};
use macroquad::prelude::*;
use ::rand::rngs::StdRng;
use ::rand::SeedableRng;
use rfd::FileDialog;

use config::Config;
use history::History;
use playback::{Clock, Player};
use score::Score;
use transform::{TransformError, TransformInFlightError, TransformKind};
use ui::roll::RollEditor;
use ui::theme::Theme;
use ui::{Ui, MARGIN, PANEL_HEIGHT};

mod config;
pub mod history;
pub mod midi;
pub mod playback;
pub mod score;
pub mod transform;
pub mod ui;

/// Application name, for window title, etc.
pub const APP_NAME: &str = "Midiroll";

const DEFAULT_GAMMA: f32 = 1.0;

/// A transform running on a worker thread. `generation` is compared
/// against the app's current generation when the result arrives, so a
/// result computed against a score that has since been replaced by a new
/// file load is discarded instead of pushed into an unrelated history.
struct PendingTransform {
    kind: TransformKind,
    generation: u64,
    rx: Receiver<Result<Score, TransformError>>,
}

struct App {
    config: Config,
    ui: Ui,
    history: History,
    player: Player,
    clock: Clock,
    roll: RollEditor,
    pending: Option<PendingTransform>,
    generation: u64,
}

impl App {
    fn new(seq: Sequencer) -> Self {
        let mut err: Option<Box<dyn Error>> = None;
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                err = Some(e);
                Config::default()
            }
        };
        let gamma = config.gamma.unwrap_or(DEFAULT_GAMMA);
        let theme = if config.dark_theme.unwrap_or(false) {
            Theme::dark(gamma)
        } else {
            Theme::light(gamma)
        };

        let mut app = App {
            ui: Ui::new(theme),
            config,
            history: History::new(),
            player: Player::new(seq),
            clock: Clock::new(),
            roll: RollEditor::new(),
            pending: None,
            generation: 0,
        };
        if let Some(err) = err {
            app.ui.report(err);
        }
        app
    }

    /// Install a freshly parsed score as the new document. Any transform
    /// still in flight is cancelled by bumping the generation.
    pub fn load_score(&mut self, score: Score) {
        self.generation += 1;
        self.pending = None;

        log::info!("loaded score: {} tracks, {} notes, {:.1} s",
            score.tracks.len(), score.note_count(), score.duration());

        self.player.pause();
        self.player.seek(0.0, &score);
        self.clock.resync(&self.player);
        self.history.load(score);
        self.roll.reset_view();
    }

    fn open_file(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("MIDI file", &["mid", "midi"])
            .set_directory(self.config.midi_folder.clone()
                .unwrap_or(String::from(".")))
            .pick_file() else {
            return;
        };
        self.config.midi_folder = config::dir_as_string(&path);
        let _ = self.config.save();
        self.load_path(&path);
    }

    fn load_path(&mut self, path: &PathBuf) {
        match fs::read(path) {
            Ok(bytes) => match midi::parse_score(&bytes) {
                Ok(score) => self.load_score(score),
                Err(e) => self.ui.report(e),
            },
            Err(e) => self.ui.report(e),
        }
    }

    /// Start a transform on a worker thread. At most one may be in
    /// flight; the panel disables the buttons while one is.
    fn apply_transform(&mut self, kind: TransformKind) {
        if self.pending.is_some() {
            self.ui.report(TransformInFlightError);
            return;
        }
        let score = match self.history.current() {
            Ok(score) => score.clone(),
            Err(e) => {
                self.ui.report(e);
                return;
            }
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut rng = StdRng::from_entropy();
            // the app may have dropped the receiver if a new file was
            // loaded meanwhile
            let _ = tx.send(kind.apply(&score, &mut rng));
        });
        self.pending = Some(PendingTransform {
            kind,
            generation: self.generation,
            rx,
        });
    }

    /// Deliver a finished transform: exactly one snapshot push or one
    /// error report per invocation, and neither for stale results.
    fn poll_transform(&mut self) {
        let Some(pending) = &self.pending else {
            return;
        };
        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.ui.report("transform worker exited unexpectedly");
                return;
            }
        };

        let pending = self.pending.take().expect("checked above");
        if pending.generation != self.generation {
            log::info!("discarding stale result of {:?}", pending.kind);
            return;
        }

        match result {
            Ok(score) => {
                self.history.push(score);
                self.ui.notify(format!("{} done.", pending.kind.label()));
            }
            Err(e) => self.ui.report(e),
        }
    }

    fn undo(&mut self) {
        if self.history.undo().is_none() {
            self.ui.notify(String::from("Nothing to undo"));
        }
    }

    fn redo(&mut self) {
        if self.history.redo().is_none() {
            self.ui.notify(String::from("Nothing to redo"));
        }
    }

    fn handle_keys(&mut self) {
        let ctrl = is_key_down(KeyCode::LeftControl)
            || is_key_down(KeyCode::RightControl);
        let shift = is_key_down(KeyCode::LeftShift)
            || is_key_down(KeyCode::RightShift);

        if ctrl && is_key_pressed(KeyCode::O) {
            self.open_file();
        }

        if self.history.is_empty() {
            return;
        }

        if is_key_pressed(KeyCode::Space) {
            self.toggle_playback();
        }
        if is_key_pressed(KeyCode::Home) {
            if let Ok(score) = self.history.current().map(Arc::clone) {
                self.player.seek(0.0, &score);
                self.clock.resync(&self.player);
            }
        }
        if ctrl && is_key_pressed(KeyCode::Z) {
            if shift {
                self.redo();
            } else {
                self.undo();
            }
        }
        if ctrl && is_key_pressed(KeyCode::Y) {
            self.redo();
        }
    }

    fn toggle_playback(&mut self) {
        if let Ok(score) = self.history.current().map(Arc::clone) {
            self.player.toggle(&score);
            self.clock.resync(&self.player);
        }
    }

    /// Handle one frame: poll the worker, route input, advance playback,
    /// redraw everything.
    fn frame(&mut self) {
        let dt = get_frame_time() as f64;
        self.ui.update(dt as f32);
        self.poll_transform();
        self.handle_keys();

        if let Ok(score) = self.history.current().map(Arc::clone) {
            self.player.frame(&score, dt);
            self.clock.update(&self.player, dt);

            self.roll.set_bounds(screen_width(), screen_height() - PANEL_HEIGHT);
            self.roll.handle_input(&score, &mut self.player, &mut self.clock);
            self.roll.draw(&score, self.clock.position() as f32,
                &self.ui.style.theme);
        } else {
            clear_background(self.ui.style.theme.content_bg());
            draw_text("Open a MIDI file to begin (Ctrl+O)",
                20.0, 40.0, 20.0, self.ui.style.theme.fg());
        }

        self.bottom_panel();
    }

    fn bottom_panel(&mut self) {
        let panel_y = screen_height() - PANEL_HEIGHT;
        let theme = &self.ui.style.theme;
        draw_rectangle(0.0, panel_y, screen_width(), PANEL_HEIGHT,
            theme.panel_bg());
        draw_line(0.0, panel_y, screen_width(), panel_y, 1.0, theme.grid_line());

        let y = panel_y + (PANEL_HEIGHT - 26.0) * 0.5;
        let mut x = MARGIN;
        let mut advance = |label: &str| {
            let bx = x;
            x += ui::button_width(label) + MARGIN;
            bx
        };

        if ui::button("Open", advance("Open"), y, true, &self.ui.style) {
            self.open_file();
        }

        if self.history.is_empty() {
            self.ui.draw_message(screen_width(), panel_y + PANEL_HEIGHT - 14.0);
            return;
        }

        let label = if self.player.is_playing() { "Pause" } else { "Play" };
        if ui::button(label, advance("Pause"), y, true, &self.ui.style) {
            self.toggle_playback();
        }

        if ui::button("Undo", advance("Undo"), y, self.history.can_undo(),
            &self.ui.style) {
            self.undo();
        }
        if ui::button("Redo", advance("Redo"), y, self.history.can_redo(),
            &self.ui.style) {
            self.redo();
        }

        let idle = self.pending.is_none();
        let mut clicked = None;
        for kind in TransformKind::ALL {
            if ui::button(kind.label(), advance(kind.label()), y, idle,
                &self.ui.style) {
                clicked = Some(kind);
            }
        }
        if let Some(kind) = clicked {
            self.apply_transform(kind);
        }

        if let Ok(score) = self.history.current() {
            let text = format!("{} / {}",
                format_time(self.clock.position()),
                format_time(score.duration() as f64));
            draw_text(&text, x + MARGIN, panel_y + PANEL_HEIGHT - 14.0, 16.0,
                self.ui.style.theme.fg());
        }

        self.ui.draw_message(screen_width(), panel_y + PANEL_HEIGHT - 14.0);
    }
}

/// Format seconds as m:ss for the transport readout.
fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Application entry point: set up the audio stream, then run the frame
/// loop forever.
pub async fn run(arg: Option<String>) -> Result<(), Box<dyn Error>> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or("could not open audio output device")?;

    let config: StreamConfig = device.supported_output_configs()?
        .next()
        .ok_or("could not find audio output config")?
        .with_max_sample_rate()
        .into();

    let mut seq = Sequencer::new(false, 2);
    seq.set_sample_rate(config.sample_rate.0 as f64);
    let mut backend = BlockRateAdapter::new(Box::new(seq.backend()));

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let mut i = 0;
            let len = data.len();
            while i < len {
                let (l, r) = backend.get_stereo();
                data[i] = l;
                data[i + 1] = r;
                i += 2;
            }
        },
        move |err| {
            eprintln!("stream error: {}", err);
        },
        None,
    )?;
    stream.play()?;

    let mut app = App::new(seq);

    if let Some(arg) = arg {
        app.load_path(&PathBuf::from(arg));
    }

    loop {
        app.frame();
        next_frame().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(61.4), "1:01");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
