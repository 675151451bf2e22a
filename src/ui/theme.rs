//! Color theme. Seed colors use the CIE L*C*uv h°uv color space, which is
//! cylindrical and perceptually uniform, so track hues can be rotated
//! without some tracks washing out.

use macroquad::color::Color;
use palette::{FromColor, Lchuv, Srgb};

const CONTROL_L_OFFSET: f32 = 4.0;
const HOVER_L_OFFSET: f32 = 8.0;
const CLICK_L_OFFSET: f32 = 12.0;
const PANEL_L_OFFSET: f32 = 2.0;

const TRACK_CHROMA: f32 = 60.0;
const TRACK_L: f32 = 55.0;
/// Hue degrees between consecutive track colors.
const TRACK_HUE_STEP: f32 = 137.5;

const PLAYHEAD_HUE: f32 = 12.0;

#[derive(Clone)]
pub struct Theme {
    pub fg: Lchuv,
    pub bg: Lchuv,
    pub gamma: f32,
}

impl Theme {
    pub fn light(gamma: f32) -> Theme {
        Theme {
            fg: Lchuv::new(10.0, 0.0, 0.0),
            bg: Lchuv::new(95.0, 0.0, 0.0),
            gamma,
        }
    }

    pub fn dark(gamma: f32) -> Theme {
        Theme {
            fg: Lchuv::new(90.0, 0.0, 0.0),
            bg: Lchuv::new(8.0, 0.0, 0.0),
            gamma,
        }
    }

    fn is_light(&self) -> bool {
        self.bg.l >= 50.0
    }

    fn color_from_lchuv(&self, lchuv: Lchuv) -> Color {
        let rgb = Srgb::from_color(lchuv);
        let f = |x: f32| x.clamp(0.0, 1.0).powf(1.0 / self.gamma);
        Color::new(f(rgb.red), f(rgb.green), f(rgb.blue), 1.0)
    }

    fn bg_plus(&self, offset: f32) -> Color {
        let sign = if self.is_light() { -1.0 } else { 1.0 };
        let bg = Lchuv::new(self.bg.l + sign * offset, self.bg.chroma, self.bg.hue);
        self.color_from_lchuv(bg)
    }

    pub fn fg(&self) -> Color {
        self.color_from_lchuv(self.fg)
    }

    /// Dimmed foreground for disabled controls and secondary text.
    pub fn fg_dim(&self) -> Color {
        Color { a: 0.4, ..self.fg() }
    }

    pub fn content_bg(&self) -> Color {
        self.color_from_lchuv(self.bg)
    }

    pub fn panel_bg(&self) -> Color {
        self.bg_plus(PANEL_L_OFFSET)
    }

    pub fn control_bg(&self) -> Color {
        self.bg_plus(CONTROL_L_OFFSET)
    }

    pub fn control_bg_hover(&self) -> Color {
        self.bg_plus(HOVER_L_OFFSET)
    }

    pub fn control_bg_click(&self) -> Color {
        self.bg_plus(CLICK_L_OFFSET)
    }

    pub fn grid_line(&self) -> Color {
        Color { a: 0.25, ..self.fg() }
    }

    pub fn white_key(&self) -> Color {
        self.bg_plus(HOVER_L_OFFSET)
    }

    pub fn black_key(&self) -> Color {
        let sign = if self.is_light() { 1.0 } else { -1.0 };
        let l = (self.bg.l + sign * 40.0).clamp(0.0, 100.0);
        self.color_from_lchuv(Lchuv::new(l, self.bg.chroma, self.bg.hue))
    }

    pub fn playhead(&self) -> Color {
        self.color_from_lchuv(Lchuv::new(55.0, 80.0, PLAYHEAD_HUE))
    }

    /// Note color for a track. The hue is a deterministic function of the
    /// track index, so the same track always renders the same color.
    pub fn track_color(&self, index: usize) -> Color {
        let hue = (index as f32 * TRACK_HUE_STEP) % 360.0;
        self.color_from_lchuv(Lchuv::new(TRACK_L, TRACK_CHROMA, hue))
    }
}
