use glam::Vec2;

/// Screen-space rectangle the sprite occupies (y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteRect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl SpriteRect {
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.origin + self.size;
        point.x >= self.origin.x && point.x <= max.x && point.y >= self.origin.y && point.y <= max.y
    }
}

/// Edge-detects right clicks from polled button state.
///
/// The overlay is click-through, so it never receives mouse events itself.
#[derive(Debug, Default)]
pub struct ClickState {
    right_was_down: bool,
}

impl ClickState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True on the poll where the right button goes down over `sprite`.
    pub fn right_clicked_on(&mut self, right_down: bool, cursor: Vec2, sprite: Option<SpriteRect>) -> bool {
        let pressed = right_down && !self.right_was_down;
        self.right_was_down = right_down;
        pressed && sprite.is_some_and(|rect| rect.contains(cursor))
    }
}
