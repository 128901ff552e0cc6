use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle `(x, y, width, height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area in pixels; zero for degenerate rectangles.
    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Overlapping region, `None` when the rectangles do not touch.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// True when `other` lies completely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A single detector hit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in input image pixels.
    pub bbox: Rect,
    /// Accumulated cascade score of the window.
    pub confidence: f32,
    /// Object class tag.
    pub kind: i32,
}

impl Detection {
    /// Default object class.
    pub const PEDESTRIAN: i32 = 1;

    pub fn new(bbox: Rect, confidence: f32) -> Self {
        Self::with_kind(bbox, confidence, Self::PEDESTRIAN)
    }

    pub fn with_kind(bbox: Rect, confidence: f32, kind: i32) -> Self {
        Self {
            bbox,
            confidence,
            kind,
        }
    }
}

pub(crate) fn default_kind() -> i32 {
    Detection::PEDESTRIAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 5, 5, 5)));
        assert!(a.intersects(&b));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert_eq!(a.intersection(&b), None);
        assert_eq!(Rect::new(3, 3, 0, 4).area(), 0);
    }

    #[test]
    fn default_kind_is_pedestrian() {
        let det = Detection::new(Rect::new(1, 2, 3, 4), 0.5);
        assert_eq!(det.kind, Detection::PEDESTRIAN);
    }
}
