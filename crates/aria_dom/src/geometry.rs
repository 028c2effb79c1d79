//! Layout bounds reported by the host

/// An axis-aligned rectangle in host coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }

    /// Fraction of the width at `x`, clamped to `[0, 1]`
    pub fn horizontal_fraction(&self, x: f32) -> f32 {
        if self.width <= 0.0 {
            return 0.0;
        }
        ((x - self.left()) / self.width).clamp(0.0, 1.0)
    }

    /// Fraction of the height at `y` measured from the bottom, clamped to `[0, 1]`
    pub fn vertical_fraction(&self, y: f32) -> f32 {
        if self.height <= 0.0 {
            return 0.0;
        }
        ((self.bottom() - y) / self.height).clamp(0.0, 1.0)
    }
}
