//! Planar map geometry in WGS84 degrees.
//!
//! Coordinates follow the `geo` convention of `x = longitude` and
//! `y = latitude`. Both types are plain `Copy` values.

use geo::{Coord, Rect};

/// A longitude/latitude pair that may be unset.
///
/// A point whose coordinates contain NaN is "nowhere". Nodes start out
/// nowhere until a response supplies their position.
///
/// # Examples
/// ```
/// use mapsnap_core::MapPoint;
///
/// let mut point = MapPoint::new(-0.12, 51.5);
/// assert!(!point.is_nowhere());
/// point.clear();
/// assert!(point.is_nowhere());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapPoint {
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
}

impl MapPoint {
    /// The unset sentinel.
    pub const NOWHERE: Self = Self {
        x: f64::NAN,
        y: f64::NAN,
    };

    /// Construct a point from longitude and latitude.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Reset the point to [`MapPoint::NOWHERE`].
    pub const fn clear(&mut self) {
        *self = Self::NOWHERE;
    }

    /// Returns true when either coordinate is NaN.
    #[must_use]
    pub const fn is_nowhere(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    /// Euclidean distance in degrees.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "planar distance needs subtraction")]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between two points.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "midpoint averages two coordinates")]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl Default for MapPoint {
    fn default() -> Self {
        Self::NOWHERE
    }
}

impl From<Coord<f64>> for MapPoint {
    fn from(value: Coord<f64>) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<MapPoint> for Coord<f64> {
    fn from(value: MapPoint) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

/// Axis-aligned bounding box that only ever grows.
///
/// The empty box has its minimums at +inf and maximums at -inf so the first
/// [`extend`](Self::extend) collapses it onto that point.
///
/// # Examples
/// ```
/// use mapsnap_core::{MapBoundingBox, MapPoint};
///
/// let mut bbox = MapBoundingBox::EMPTY;
/// assert!(bbox.is_empty());
/// bbox.extend(&MapPoint::new(1.0, 2.0));
/// bbox.extend(&MapPoint::new(-1.0, 0.5));
/// assert!(!bbox.is_empty());
/// assert_eq!(bbox.x_min, -1.0);
/// assert_eq!(bbox.y_max, 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapBoundingBox {
    /// West edge.
    pub x_min: f64,
    /// South edge.
    pub y_min: f64,
    /// East edge.
    pub x_max: f64,
    /// North edge.
    pub y_max: f64,
}

impl MapBoundingBox {
    /// A box containing no points.
    pub const EMPTY: Self = Self {
        x_min: f64::INFINITY,
        y_min: f64::INFINITY,
        x_max: f64::NEG_INFINITY,
        y_max: f64::NEG_INFINITY,
    };

    /// Build a box from two opposite corners in any order.
    #[must_use]
    pub fn from_corners(a: MapPoint, b: MapPoint) -> Self {
        let mut bbox = Self::EMPTY;
        bbox.extend(&a);
        bbox.extend(&b);
        bbox
    }

    /// Reset to [`MapBoundingBox::EMPTY`].
    pub const fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    /// Returns true when no point has been added since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    /// Grow the box to include `point`. Never shrinks.
    pub fn extend(&mut self, point: &MapPoint) {
        if self.x_min > point.x {
            self.x_min = point.x;
        }
        if self.x_max < point.x {
            self.x_max = point.x;
        }
        if self.y_min > point.y {
            self.y_min = point.y;
        }
        if self.y_max < point.y {
            self.y_max = point.y;
        }
    }

    /// East-west extent in degrees.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "extent is the difference of edges")]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// North-south extent in degrees.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "extent is the difference of edges")]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Returns true when `point` lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, point: &MapPoint) -> bool {
        (self.x_min..=self.x_max).contains(&point.x) && (self.y_min..=self.y_max).contains(&point.y)
    }

    /// Convert into a `geo` rectangle, or `None` when empty.
    #[must_use]
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        (!self.is_empty()).then(|| {
            Rect::new(
                Coord {
                    x: self.x_min,
                    y: self.y_min,
                },
                Coord {
                    x: self.x_max,
                    y: self.y_max,
                },
            )
        })
    }
}

impl Default for MapBoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<Rect<f64>> for MapBoundingBox {
    fn from(value: Rect<f64>) -> Self {
        Self::from_corners(value.min().into(), value.max().into())
    }
}
