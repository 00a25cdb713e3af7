/// Integer pixel rectangle, half-open on both axes: `[xmin, xmax) x [ymin, ymax)`.
///
/// [`Rect::NONE`] is the "no area" sentinel used when an operation cannot determine a canvas.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Rect {
    /// Inclusive minimum x.
    pub xmin: i32,
    /// Exclusive maximum x.
    pub xmax: i32,
    /// Inclusive minimum y.
    pub ymin: i32,
    /// Exclusive maximum y.
    pub ymax: i32,
}

impl Rect {
    /// Empty area sentinel.
    pub const NONE: Rect = Rect {
        xmin: 0,
        xmax: 0,
        ymin: 0,
        ymax: 0,
    };

    /// Create a rectangle from its bounds.
    pub const fn new(xmin: i32, xmax: i32, ymin: i32, ymax: i32) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Rectangle `[0, width) x [0, height)`.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, width, 0, height)
    }

    /// Width in pixels, zero for inverted rectangles.
    pub fn width(&self) -> i32 {
        (self.xmax - self.xmin).max(0)
    }

    /// Height in pixels, zero for inverted rectangles.
    pub fn height(&self) -> i32 {
        (self.ymax - self.ymin).max(0)
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Return `true` when the rectangle covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.xmax <= self.xmin || self.ymax <= self.ymin
    }

    /// Return `true` when `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.xmin && x < self.xmax && y >= self.ymin && y < self.ymax
    }

    /// Return `true` when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.xmin >= self.xmin
            && other.xmax <= self.xmax
            && other.ymin >= self.ymin
            && other.ymax <= self.ymax
    }

    /// Overlapping part of both rectangles, [`Rect::NONE`] when they are disjoint.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect::new(
            self.xmin.max(other.xmin),
            self.xmax.min(other.xmax),
            self.ymin.max(other.ymin),
            self.ymax.min(other.ymax),
        );
        if r.is_empty() { Rect::NONE } else { r }
    }

    /// Smallest rectangle containing both. Empty operands are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.xmin.min(other.xmin),
            self.xmax.max(other.xmax),
            self.ymin.min(other.ymin),
            self.ymax.max(other.ymax),
        )
    }

    /// Shift by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.xmin + dx,
            self.xmax + dx,
            self.ymin + dy,
            self.ymax + dy,
        )
    }

    /// Grow every side by `dx` horizontally and `dy` vertically.
    pub fn expand(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.xmin - dx,
            self.xmax + dx,
            self.ymin - dy,
            self.ymax + dy,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/rect.rs"]
mod tests;
