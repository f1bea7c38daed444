//! Geometric primitives in PDF user space.
//!
//! Coordinates use the PDF convention: origin at the bottom-left corner of
//! the page, y growing upwards, units in points.

use crate::error::{Error, Result};

/// A rectangle anchored at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X coordinate of the lower-left corner
    pub x: f64,
    /// Y coordinate of the lower-left corner
    pub y: f64,
    /// Width of rectangle
    pub width: f64,
    /// Height of rectangle
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_forge::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.top(), 50.0);
    /// ```
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from its lower-left `(x0, y0)` and upper-right
    /// `(x1, y1)` corners.
    ///
    /// Fails with [`Error::InvalidRectangleCoordinates`] unless `x1 > x0` and
    /// `y1 > y0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_forge::geometry::Rect;
    ///
    /// let rect = Rect::from_points(10.0, 20.0, 110.0, 70.0).unwrap();
    /// assert_eq!(rect.width, 100.0);
    /// assert!(Rect::from_points(10.0, 20.0, 10.0, 70.0).is_err());
    /// ```
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self> {
        if x1 <= x0 || y1 <= y0 {
            return Err(Error::InvalidRectangleCoordinates);
        }
        Ok(Self::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Y coordinate of the top edge.
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Corners as `[llx, lly, urx, ury]`.
    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.right(), self.top()]
    }
}
