/*!
 * Geometry primitives for page layout.
 *
 * Coordinates are page points with the origin at the top-left corner of the
 * page, so `y` grows downwards: a larger `y0` means lower on the page.
 */

use serde::{Deserialize, Serialize};

use crate::errors::GeometryError;

/// Axis-aligned rectangle in page points.
///
/// Always satisfies `x0 < x1` and `y0 < y1`; the fields are private so that a
/// rectangle cannot be altered once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RectRepr", into = "RectRepr")]
pub struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

/// Serialized form of a rectangle, validated on the way in
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RectRepr {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl TryFrom<RectRepr> for Rect {
    type Error = GeometryError;

    fn try_from(repr: RectRepr) -> Result<Self, Self::Error> {
        Rect::new(repr.x0, repr.y0, repr.x1, repr.y1)
    }
}

impl From<Rect> for RectRepr {
    fn from(rect: Rect) -> Self {
        Self {
            x0: rect.x0,
            y0: rect.y0,
            x1: rect.x1,
            y1: rect.y1,
        }
    }
}

impl Rect {
    /// Create a rectangle, rejecting degenerate or non-finite coordinates.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, GeometryError> {
        let finite = [x0, y0, x1, y1].iter().all(|v| v.is_finite());
        if !finite || x0 >= x1 || y0 >= y1 {
            return Err(GeometryError::InvalidRect { x0, y0, x1, y1 });
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn y0(&self) -> f64 {
        self.y0
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Length of the shared horizontal extent (0 when disjoint)
    pub fn horizontal_overlap(&self, other: &Rect) -> f64 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Length of the shared vertical extent (0 when disjoint)
    pub fn vertical_overlap(&self, other: &Rect) -> f64 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    /// Empty space between the two rectangles along x (0 when they overlap)
    pub fn horizontal_gap(&self, other: &Rect) -> f64 {
        (self.x0.max(other.x0) - self.x1.min(other.x1)).max(0.0)
    }

    /// Empty space between the two rectangles along y (0 when they overlap)
    pub fn vertical_gap(&self, other: &Rect) -> f64 {
        (self.y0.max(other.y0) - self.y1.min(other.y1)).max(0.0)
    }

    /// Euclidean distance between the closest points of the two rectangles
    pub fn distance(&self, other: &Rect) -> f64 {
        self.horizontal_gap(other).hypot(self.vertical_gap(other))
    }

    /// Whether this rectangle lies entirely below `other` on the page
    pub fn is_below(&self, other: &Rect) -> bool {
        self.y0 >= other.y1
    }
}

/// Rectangle expressed relative to the bounds of an enclosing column.
///
/// Every component is a fraction of the column's width or height. Only used
/// to compare positions; placement always works in page points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NormalizedRect {
    /// Offset between the top-left corners of two normalized rectangles,
    /// scaled back to points using the given frame dimensions.
    pub fn deviation_pt(&self, other: &NormalizedRect, frame_width: f64, frame_height: f64) -> f64 {
        let dx = (self.x - other.x) * frame_width;
        let dy = (self.y - other.y) * frame_height;
        dx.hypot(dy)
    }

    /// Whether every component lies in `[0, 1]`
    pub fn is_within_unit(&self) -> bool {
        [self.x, self.y, self.w, self.h]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}
