//! Immediate-mode UI chrome: buttons and transient status messages.

use std::fmt::Display;

use macroquad::prelude::*;

use self::theme::Theme;

pub mod roll;
pub mod theme;

pub const MARGIN: f32 = 5.0;
/// Height of the bottom control panel.
pub const PANEL_HEIGHT: f32 = 40.0;

const FONT_SIZE: u16 = 16;
/// How long a status message stays on screen.
const MESSAGE_SECONDS: f32 = 5.0;

pub struct UIStyle {
    pub theme: Theme,
}

struct Message {
    text: String,
    ttl: f32,
}

pub struct Ui {
    pub style: UIStyle,
    message: Option<Message>,
}

impl Ui {
    pub fn new(theme: Theme) -> Self {
        Self {
            style: UIStyle { theme },
            message: None,
        }
    }

    /// Surface an error to the user. Every failure path ends up here; no
    /// error is swallowed silently.
    pub fn report(&mut self, error: impl Display) {
        let text = error.to_string();
        log::error!("{}", text);
        self.message = Some(Message { text, ttl: MESSAGE_SECONDS });
    }

    /// Surface a non-error notice to the user.
    pub fn notify(&mut self, text: String) {
        log::info!("{}", text);
        self.message = Some(Message { text, ttl: MESSAGE_SECONDS });
    }

    /// Age out the current message.
    pub fn update(&mut self, dt: f32) {
        if let Some(message) = &mut self.message {
            message.ttl -= dt;
            if message.ttl <= 0.0 {
                self.message = None;
            }
        }
    }

    /// Draw the current message right-aligned at the given baseline.
    pub fn draw_message(&self, right: f32, baseline: f32) {
        if let Some(message) = &self.message {
            let dim = measure_text(&message.text, None, FONT_SIZE, 1.0);
            draw_text(&message.text, right - dim.width - MARGIN, baseline,
                FONT_SIZE as f32, self.style.theme.fg());
        }
    }
}

/// Width a button will occupy, for laying out a row of them.
pub fn button_width(label: &str) -> f32 {
    measure_text(label, None, FONT_SIZE, 1.0).width + MARGIN * 2.0
}

/// Draws a button; returns true if it was clicked this frame. Disabled
/// buttons draw dimmed and ignore the mouse.
pub fn button(label: &str, x: f32, y: f32, enabled: bool, style: &UIStyle) -> bool {
    let dim = measure_text(label, None, FONT_SIZE, 1.0);
    let rect = Rect {
        x,
        y,
        w: dim.width + MARGIN * 2.0,
        h: dim.height + MARGIN * 2.0,
    };
    let (mouse_x, mouse_y) = mouse_position();
    let mouse_hit = enabled && rect.contains(Vec2 { x: mouse_x, y: mouse_y });

    let fill = if mouse_hit {
        if is_mouse_button_down(MouseButton::Left) {
            style.theme.control_bg_click()
        } else {
            style.theme.control_bg_hover()
        }
    } else {
        style.theme.control_bg()
    };
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, fill);

    let fg = if enabled { style.theme.fg() } else { style.theme.fg_dim() };
    draw_text(label, x + MARGIN, y + MARGIN + dim.offset_y, FONT_SIZE as f32, fg);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, fg);

    mouse_hit && is_mouse_button_released(MouseButton::Left)
}
