use serde::Serialize;

/// Normalized screen coordinate. Both axes are always within `[0, 1]`;
/// the only constructors check it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Models answer on a 0–1000 integer grid.
    pub const SCALE: u32 = 1000;

    pub fn new(x: f64, y: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        (valid(x) && valid(y)).then_some(Self { x, y })
    }

    /// `(500, 250)` on the 0–1000 grid → `(0.5, 0.25)`.
    pub fn from_permille(x: u32, y: u32) -> Option<Self> {
        if x > Self::SCALE || y > Self::SCALE {
            return None;
        }
        Some(Self {
            x: x as f64 / Self::SCALE as f64,
            y: y as f64 / Self::SCALE as f64,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Pixel position inside an image of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> (u32, u32) {
        let px = (self.x * width as f64).round() as u32;
        let py = (self.y * height as f64).round() as u32;
        (px.min(width.saturating_sub(1)), py.min(height.saturating_sub(1)))
    }
}

/// A resolved element reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingResult {
    pub point: Point,
    pub reference: String,
}

/// Parse `"(x,y)"` with non-negative integers; whitespace around the numbers is allowed.
pub fn parse_pair(text: &str) -> Option<(u32, u32)> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (x, y) = inner.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}
