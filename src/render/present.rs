use std::f32::consts::TAU;

use glam::Vec2;

/// Seconds per breath while sleeping.
const BREATH_PERIOD: f32 = 3.0;
/// Peak vertical stretch of a breath.
const BREATH_DEPTH: f32 = 0.03;

/// What the GPU should draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub from: u32,
    pub to: u32,
    /// 0.0 shows `from`, 1.0 shows `to`.
    pub mix: f32,
    pub scale_y: f32,
}

/// Crossfades between texture layers as frames are shown.
#[derive(Debug, Default)]
pub struct Presenter {
    from: Option<u32>,
    to: Option<u32>,
    fade: f32,
    elapsed: f32,
    scale: f32,
    breathe: bool,
    breath_phase: f32,
}

impl Presenter {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            ..Self::default()
        }
    }

    /// Fade to `layer` over `fade` seconds. An in-flight fade snaps to its
    /// target, which becomes the outgoing frame.
    pub fn show(&mut self, layer: u32, fade: f32, scale: f32, breathe: bool) {
        if self.to != Some(layer) {
            self.from = self.to.or(self.from);
            self.to = Some(layer);
            self.fade = fade.max(0.0);
            self.elapsed = 0.0;
        }
        self.scale = scale;
        if breathe != self.breathe {
            self.breath_phase = 0.0;
        }
        self.breathe = breathe;
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        if self.breathe {
            self.breath_phase = (self.breath_phase + dt * TAU / BREATH_PERIOD) % TAU;
        }
    }

    pub fn mix(&self) -> f32 {
        if self.fade <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.fade).min(1.0)
        }
    }

    /// `None` until the first frame is shown.
    pub fn blend(&self) -> Option<Blend> {
        let to = self.to?;
        let breath = if self.breathe {
            1.0 + self.breath_phase.sin() * BREATH_DEPTH
        } else {
            1.0
        };
        Some(Blend {
            from: self.from.unwrap_or(to),
            to,
            mix: self.mix(),
            scale_y: self.scale * breath,
        })
    }
}

/// Top-left corner of the sprite in window pixels (y down), given the feet
/// position in movement space (y up, x = sprite center).
pub fn sprite_origin(feet: Vec2, screen_h: f32, size: (f32, f32)) -> Vec2 {
    Vec2::new(feet.x - size.0 * 0.5, screen_h - feet.y - size.1)
}
