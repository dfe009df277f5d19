use geo::{Coord, CoordNum, Rect};

use crate::errors::{PyramidioError, Result};

pub trait Intersection {
    type Output;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output>;
}

/// Overlap with positive area; touching rectangles do not intersect.
impl<T: CoordNum + Ord> Intersection for Rect<T> {
    type Output = Rect<T>;
    fn intersection(&self, rhs: &Self) -> Result<Rect<T>> {
        let lhs_max = self.max();
        let rhs_min = rhs.min();
        if (lhs_max.x <= rhs_min.x) | (lhs_max.y <= rhs_min.y) {
            return Err(PyramidioError::NoIntersection);
        }

        let lhs_min = self.min();
        let rhs_max = rhs.max();
        if (lhs_min.x >= rhs_max.x) | (lhs_min.y >= rhs_max.y) {
            return Err(PyramidioError::NoIntersection);
        }

        let min = Coord {
            x: lhs_min.x.max(rhs_min.x),
            y: lhs_min.y.max(rhs_min.y),
        };
        let max = Coord {
            x: lhs_max.x.min(rhs_max.x),
            y: lhs_max.y.min(rhs_max.y),
        };

        Ok(Rect::new(min, max))
    }
}
