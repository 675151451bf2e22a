//! Piano-roll view: time/pitch to pixel mapping, wheel gesture routing,
//! and the layered draw pass. Drawing is a pure function of the score,
//! the viewport, and the playhead position; it keeps no state between
//! frames and can run at any frequency.

use macroquad::prelude::*;

use crate::playback::{Clock, Player};
use crate::score::{self, Note, Score, PITCH_COUNT};

use super::theme::Theme;

/// Horizontal pixels per second of music at zoom 1.
pub const BASE_PX_PER_SEC: f32 = 100.0;
/// Height of one semitone row.
pub const ROW_HEIGHT: f32 = 20.0;
/// Width of the piano-key gutter on the left.
pub const GUTTER_WIDTH: f32 = 100.0;
/// Height of the measure ruler along the top.
pub const RULER_HEIGHT: f32 = 30.0;

const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 5.0;
/// Zoom multiplier per wheel notch.
const ZOOM_STEP: f32 = 1.25;
/// Pixels panned per wheel notch.
const WHEEL_PAN_STEP: f32 = ROW_HEIGHT * 2.0;
/// The display grid assumes four beats per measure at the 60 BPM base
/// tempo, so a measure is four seconds wide at zoom 1.
const MEASURE_SECONDS: f32 = 4.0;

const NOTE_BORDER: f32 = 1.0;
const PLAYHEAD_THICKNESS: f32 = 2.0;

/// What part of the score is on screen. Owned by the UI layer; this never
/// enters the undo history.
pub struct Viewport {
    pub zoom: f32,
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Viewport {
    pub fn px_per_sec(&self) -> f32 {
        BASE_PX_PER_SEC * self.zoom
    }

    pub fn time_to_x(&self, time: f32) -> f32 {
        time * self.px_per_sec() + GUTTER_WIDTH - self.scroll_x
    }

    pub fn x_to_time(&self, x: f32) -> f32 {
        (x - GUTTER_WIDTH + self.scroll_x) / self.px_per_sec()
    }

    /// Top edge of a pitch's row. Higher pitches are higher on screen,
    /// lowest pitch at the bottom.
    pub fn pitch_to_y(&self, pitch: u8) -> f32 {
        (PITCH_COUNT - 1 - pitch) as f32 * ROW_HEIGHT + RULER_HEIGHT - self.scroll_y
    }

    /// Pitch of the row under a y coordinate, if any.
    pub fn y_to_pitch(&self, y: f32) -> Option<u8> {
        let row = ((y + self.scroll_y - RULER_HEIGHT) / ROW_HEIGHT).floor() as i32;
        let pitch = PITCH_COUNT as i32 - 1 - row;
        (0..PITCH_COUNT as i32).contains(&pitch).then_some(pitch as u8)
    }

    /// Seconds spanned by the viewport, from left edge to right edge.
    pub fn visible_time_range(&self) -> (f32, f32) {
        let start = self.scroll_x / self.px_per_sec();
        let end = (self.scroll_x + self.width) / self.px_per_sec();
        (start, end)
    }

    /// Inclusive pitch bounds of the rows that intersect the viewport.
    pub fn visible_pitch_range(&self) -> (u8, u8) {
        let first_row = (self.scroll_y / ROW_HEIGHT).floor() as i32;
        let last_row =
            ((self.scroll_y + self.height - RULER_HEIGHT) / ROW_HEIGHT).ceil() as i32;
        let hi = (PITCH_COUNT as i32 - 1 - first_row).clamp(0, PITCH_COUNT as i32 - 1);
        let lo = (PITCH_COUNT as i32 - 1 - last_row).clamp(0, PITCH_COUNT as i32 - 1);
        (lo as u8, hi as u8)
    }

    /// Whether any part of a note falls inside the visible time and pitch
    /// window. Used to cull before drawing.
    pub fn is_note_visible(&self, note: &Note) -> bool {
        let (start, end) = self.visible_time_range();
        let (lo, hi) = self.visible_pitch_range();
        note.start < end && note.end() > start
            && (lo..=hi).contains(&note.pitch)
    }

    /// Zoom by `factor` keeping the time under client x `cx` fixed. The
    /// time under the cursor is computed with the old zoom, then scroll is
    /// recomputed so the same time lands under the cursor afterwards.
    pub fn zoom_about(&mut self, cx: f32, factor: f32) {
        let time = self.x_to_time(cx);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.scroll_x = (time * self.px_per_sec() - (cx - GUTTER_WIDTH)).max(0.0);
    }

    /// Scroll by a pixel delta, clamped to the content extent given the
    /// score's duration.
    pub fn pan(&mut self, dx: f32, dy: f32, duration: f32) {
        let max_x = (duration * self.px_per_sec() + GUTTER_WIDTH - self.width).max(0.0);
        let max_y = (PITCH_COUNT as f32 * ROW_HEIGHT + RULER_HEIGHT - self.height)
            .max(0.0);
        self.scroll_x = (self.scroll_x + dx).clamp(0.0, max_x);
        self.scroll_y = (self.scroll_y + dy).clamp(0.0, max_y);
    }

    /// Scroll vertically so a pitch sits mid-viewport.
    pub fn center_on(&mut self, pitch: u8) {
        let row_top = (PITCH_COUNT - 1 - pitch) as f32 * ROW_HEIGHT;
        self.scroll_y = (row_top + RULER_HEIGHT - self.height * 0.5).max(0.0);
    }
}

/// Clip a row rect against the ruler strip at the top.
fn clip_below_ruler(y: f32, h: f32) -> Option<(f32, f32)> {
    let top = y.max(RULER_HEIGHT);
    let bottom = y + h;
    (bottom > top).then_some((top, bottom - top))
}

pub struct RollEditor {
    pub viewport: Viewport,
}

impl RollEditor {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::default(),
        }
    }

    /// Called once per frame with the screen area the roll may use.
    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    /// Reset scroll for a freshly loaded score, vertically centered on
    /// middle C.
    pub fn reset_view(&mut self) {
        self.viewport.scroll_x = 0.0;
        self.viewport.center_on(60);
    }

    /// Route pointer gestures: ctrl+wheel zooms about the cursor,
    /// shift+wheel pans horizontally, plain wheel pans vertically, and a
    /// click in the ruler seeks the transport.
    pub fn handle_input(&mut self, score: &Score,
        player: &mut Player, clock: &mut Clock
    ) {
        let (mx, my) = mouse_position();
        let (wheel_x, wheel_y) = mouse_wheel();
        let ctrl = is_key_down(KeyCode::LeftControl)
            || is_key_down(KeyCode::RightControl);
        let shift = is_key_down(KeyCode::LeftShift)
            || is_key_down(KeyCode::RightShift);

        if wheel_y != 0.0 && ctrl {
            let factor = if wheel_y > 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
            self.viewport.zoom_about(mx.max(GUTTER_WIDTH), factor);
            // re-clamp against content at the new zoom
            self.viewport.pan(0.0, 0.0, score.duration());
        } else if wheel_x != 0.0 || wheel_y != 0.0 {
            let (dx, dy) = if shift {
                (-wheel_y * WHEEL_PAN_STEP, 0.0)
            } else {
                (-wheel_x * WHEEL_PAN_STEP, -wheel_y * WHEEL_PAN_STEP)
            };
            self.viewport.pan(dx, dy, score.duration());
        }

        if is_mouse_button_pressed(MouseButton::Left)
            && my < RULER_HEIGHT && mx >= GUTTER_WIDTH {
            player.seek(self.viewport.x_to_time(mx).max(0.0) as f64, score);
            clock.resync(player);
        }
    }

    /// Draw the roll back to front: background, measure grid and ruler,
    /// key gutter, pitch grid, note rectangles, playhead.
    pub fn draw(&self, score: &Score, playhead: f32, theme: &Theme) {
        clear_background(theme.content_bg());
        self.draw_ruler(theme);
        self.draw_keys(theme);
        self.draw_pitch_grid(theme);
        self.draw_notes(score, theme);
        self.draw_playhead(playhead, theme);
    }

    fn draw_ruler(&self, theme: &Theme) {
        let vp = &self.viewport;
        draw_rectangle(0.0, 0.0, vp.width, RULER_HEIGHT, theme.panel_bg());

        let px_per_measure = MEASURE_SECONDS * vp.px_per_sec();
        let first = (vp.scroll_x / px_per_measure).floor() as i32;
        let count = (vp.width / px_per_measure).ceil() as i32 + 1;

        for measure in first..first + count {
            let x = measure as f32 * px_per_measure + GUTTER_WIDTH - vp.scroll_x;
            if x < GUTTER_WIDTH || x >= vp.width {
                continue;
            }
            draw_line(x, 0.0, x, vp.height, 1.0, theme.grid_line());
            draw_text(&(measure + 1).to_string(),
                x + 5.0, RULER_HEIGHT - 8.0, 16.0, theme.fg());
        }
    }

    fn draw_keys(&self, theme: &Theme) {
        let vp = &self.viewport;
        let (lo, hi) = vp.visible_pitch_range();

        for pitch in lo..=hi {
            let y = vp.pitch_to_y(pitch);
            let Some((top, h)) = clip_below_ruler(y, ROW_HEIGHT) else {
                continue;
            };
            let color = if score::is_black_key(pitch) {
                theme.black_key()
            } else {
                theme.white_key()
            };
            draw_rectangle(0.0, top, GUTTER_WIDTH, h, color);
            draw_rectangle_lines(0.0, top, GUTTER_WIDTH, h, 1.0, theme.grid_line());

            // label the root of each octave
            if pitch % 12 == 0 && h == ROW_HEIGHT {
                draw_text(&score::pitch_name(pitch),
                    5.0, y + ROW_HEIGHT - 6.0, 16.0, theme.fg());
            }
        }
    }

    fn draw_pitch_grid(&self, theme: &Theme) {
        let vp = &self.viewport;
        let (lo, hi) = vp.visible_pitch_range();

        for pitch in lo..=hi {
            let y = vp.pitch_to_y(pitch);
            if y > RULER_HEIGHT && y < vp.height {
                draw_line(GUTTER_WIDTH, y, vp.width, y, 1.0, theme.grid_line());
            }
        }
    }

    fn draw_notes(&self, score: &Score, theme: &Theme) {
        let vp = &self.viewport;

        for (index, track) in score.tracks.iter().enumerate() {
            let color = theme.track_color(index);
            for note in &track.notes {
                if !vp.is_note_visible(note) {
                    continue;
                }

                let x = vp.time_to_x(note.start);
                let w = note.duration * vp.px_per_sec();
                // clip against the gutter and ruler rather than drawing
                // over them
                let left = x.max(GUTTER_WIDTH);
                let w = w - (left - x);
                let Some((top, h)) = clip_below_ruler(vp.pitch_to_y(note.pitch),
                    ROW_HEIGHT) else {
                    continue;
                };
                if w <= 0.0 {
                    continue;
                }

                draw_rectangle(left, top, w, h, color);
                draw_rectangle_lines(left, top, w, h, NOTE_BORDER,
                    theme.grid_line());
            }
        }
    }

    fn draw_playhead(&self, playhead: f32, theme: &Theme) {
        let vp = &self.viewport;
        let x = vp.time_to_x(playhead);
        if x >= GUTTER_WIDTH && x <= vp.width {
            draw_line(x, RULER_HEIGHT, x, vp.height,
                PLAYHEAD_THICKNESS, theme.playhead());
        }
    }
}

impl Default for RollEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Track;

    fn viewport() -> Viewport {
        Viewport {
            zoom: 1.5,
            scroll_x: 120.0,
            scroll_y: 900.0,
            width: 800.0,
            height: 600.0,
        }
    }

    #[test]
    fn test_time_round_trip() {
        let vp = viewport();
        for t in [0.0, 0.5, 1.0, 17.3, 240.0] {
            assert!((vp.x_to_time(vp.time_to_x(t)) - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_pitch_round_trip() {
        let vp = viewport();
        for pitch in 0..PITCH_COUNT {
            assert_eq!(vp.y_to_pitch(vp.pitch_to_y(pitch)), Some(pitch));
        }
    }

    #[test]
    fn test_y_to_pitch_out_of_range() {
        let vp = Viewport::default();
        // far below the bottom row
        assert_eq!(vp.y_to_pitch(RULER_HEIGHT + PITCH_COUNT as f32 * ROW_HEIGHT
            + ROW_HEIGHT), None);
    }

    #[test]
    fn test_pitch_orientation() {
        let vp = Viewport::default();
        // higher pitch must sit higher on screen
        assert!(vp.pitch_to_y(72) < vp.pitch_to_y(60));
    }

    #[test]
    fn test_zoom_about_cursor_anchors_time() {
        let mut vp = viewport();
        let cx = 430.0;
        let before = vp.x_to_time(cx);
        vp.zoom_about(cx, 1.25);
        assert!((vp.x_to_time(cx) - before).abs() < 1e-4);

        vp.zoom_about(cx, 1.0 / 1.25);
        vp.zoom_about(cx, 1.0 / 1.25);
        assert!((vp.x_to_time(cx) - before).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = viewport();
        for _ in 0..50 {
            vp.zoom_about(400.0, 2.0);
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..50 {
            vp.zoom_about(400.0, 0.5);
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_pan_clamps_to_content() {
        let mut vp = Viewport::default();
        vp.pan(-100.0, -100.0, 60.0);
        assert_eq!(vp.scroll_x, 0.0);
        assert_eq!(vp.scroll_y, 0.0);

        vp.pan(1e6, 1e6, 60.0);
        // 60 s of music at 100 px/s plus the gutter, minus the viewport
        assert_eq!(vp.scroll_x, 60.0 * BASE_PX_PER_SEC + GUTTER_WIDTH - 800.0);
        assert_eq!(vp.scroll_y,
            PITCH_COUNT as f32 * ROW_HEIGHT + RULER_HEIGHT - 600.0);
    }

    #[test]
    fn test_culling() {
        let vp = Viewport {
            zoom: 1.0,
            scroll_x: 1000.0, // window starts at t = 10 s
            scroll_y: 0.0,
            width: 800.0, // and ends at t = 18 s
            height: 600.0,
        };
        let (lo, hi) = vp.visible_pitch_range();

        // entirely before and entirely after the time window
        assert!(!vp.is_note_visible(&Note::new(hi, 2.0, 1.0, 1.0)));
        assert!(!vp.is_note_visible(&Note::new(hi, 20.0, 1.0, 1.0)));
        // fully inside
        assert!(vp.is_note_visible(&Note::new(hi, 12.0, 1.0, 1.0)));
        // partial overlap on both edges
        assert!(vp.is_note_visible(&Note::new(hi, 9.0, 2.0, 1.0)));
        assert!(vp.is_note_visible(&Note::new(hi, 17.5, 3.0, 1.0)));
        // right time, pitch scrolled off screen
        assert!(lo > 0);
        assert!(!vp.is_note_visible(&Note::new(lo - 1, 12.0, 1.0, 1.0)));
    }

    #[test]
    fn test_visible_pitch_range_tracks_scroll() {
        let mut vp = Viewport::default();
        let (_, hi) = vp.visible_pitch_range();
        assert_eq!(hi, PITCH_COUNT - 1);

        vp.scroll_y = 4.0 * ROW_HEIGHT;
        let (_, hi) = vp.visible_pitch_range();
        assert_eq!(hi, PITCH_COUNT - 5);
    }

    #[test]
    fn test_center_on() {
        let mut vp = Viewport::default();
        vp.center_on(60);
        let y = vp.pitch_to_y(60);
        assert!(y > 0.0 && y < vp.height);

        // centering on the top pitch cannot produce negative scroll
        vp.center_on(127);
        assert_eq!(vp.scroll_y, 0.0);
    }

    #[test]
    fn test_culling_uses_track_note_model() {
        // a sanity check that culling composes with the score model
        let vp = Viewport::default();
        let track = Track::new(vec![
            Note::new(60, 0.0, 1.0, 1.0),
            Note::new(60, 100.0, 1.0, 1.0),
        ]);
        let visible: Vec<_> = track.notes.iter()
            .filter(|n| vp.is_note_visible(n))
            .collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].start, 0.0);
    }
}
