//! Axis-aligned query extents derived from polygon layers.

use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use thiserror::Error;

/// Bounding rectangle of a query polygon in WGS84 degrees.
///
/// `x` is longitude and `y` is latitude. Extents are immutable once built.
///
/// # Examples
/// ```
/// use gbif_clip_core::SpatialExtent;
///
/// # fn main() -> Result<(), gbif_clip_core::ExtentError> {
/// let extent = SpatialExtent::new(10.0, 10.0, 20.0, 20.0)?;
/// assert_eq!(extent.max_x(), 20.0);
/// assert!(!extent.is_degenerate());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialExtent {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

/// Errors returned when building a [`SpatialExtent`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtentError {
    /// The source geometry contained no coordinates.
    #[error("extent polygon has no coordinates")]
    Empty,
    /// One of the bounds was NaN or infinite.
    #[error("extent bounds must be finite")]
    NonFinite,
    /// A minimum bound exceeded its maximum.
    #[error("extent minimum {min} exceeds maximum {max} on the {axis} axis")]
    Inverted {
        /// Axis on which the bounds are inverted (`"x"` or `"y"`).
        axis: &'static str,
        /// Supplied minimum.
        min: f64,
        /// Supplied maximum.
        max: f64,
    },
}

impl SpatialExtent {
    /// Validates and constructs an extent.
    ///
    /// Zero-width or zero-height extents are accepted; the remote service
    /// answers them with an empty result.
    ///
    /// # Errors
    /// Returns [`ExtentError::NonFinite`] or [`ExtentError::Inverted`] for
    /// unusable bounds.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, ExtentError> {
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(ExtentError::NonFinite);
        }
        if min_x > max_x {
            return Err(ExtentError::Inverted {
                axis: "x",
                min: min_x,
                max: max_x,
            });
        }
        if min_y > max_y {
            return Err(ExtentError::Inverted {
                axis: "y",
                min: min_y,
                max: max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Build an extent from a `geo` rectangle.
    pub fn from_rect(rect: Rect<f64>) -> Result<Self, ExtentError> {
        let min = rect.min();
        let max = rect.max();
        Self::new(min.x, min.y, max.x, max.y)
    }

    /// Bounding box of every polygon in `polygons`.
    ///
    /// # Errors
    /// Returns [`ExtentError::Empty`] when `polygons` has no coordinates.
    pub fn from_polygons(polygons: &MultiPolygon<f64>) -> Result<Self, ExtentError> {
        polygons
            .bounding_rect()
            .ok_or(ExtentError::Empty)
            .and_then(Self::from_rect)
    }

    /// Western bound (minimum longitude).
    #[must_use]
    pub const fn min_x(&self) -> f64 {
        self.min_x
    }

    /// Southern bound (minimum latitude).
    #[must_use]
    pub const fn min_y(&self) -> f64 {
        self.min_y
    }

    /// Eastern bound (maximum longitude).
    #[must_use]
    pub const fn max_x(&self) -> f64 {
        self.max_x
    }

    /// Northern bound (maximum latitude).
    #[must_use]
    pub const fn max_y(&self) -> f64 {
        self.max_y
    }

    /// Whether the extent has zero width or zero height.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Closed ring of the rectangle: five vertices, first equal to last.
    ///
    /// Vertices run `(minX minY), (maxX minY), (maxX maxY), (minX maxY)`.
    #[must_use]
    pub const fn ring(&self) -> [Coord<f64>; 5] {
        let south_west = Coord {
            x: self.min_x,
            y: self.min_y,
        };
        [
            south_west,
            Coord {
                x: self.max_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
            Coord {
                x: self.min_x,
                y: self.max_y,
            },
            south_west,
        ]
    }

    /// The extent as a `geo` rectangle.
    #[must_use]
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}
