//! Parabolas and quadratic root finding

use crate::{snapped_sum, EquationError, Evaluate, Point, Precision};

/// Real roots of a polynomial of degree at most 2
///
/// Roots are sorted in ascending order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Roots {
    /// No real root (or infinitely many, for the zero polynomial)
    None,

    /// One root, possibly a double root
    One(Precision),

    /// Two distinct roots
    Two(Precision, Precision),
}
//
impl Roots {
    /// Solve `a * x^2 + b * x + c = 0`
    ///
    /// Falls back to the linear solution when `a` is zero, and treats a
    /// discriminant within rounding error of zero as a double root.
    pub fn of(a: Precision, b: Precision, c: Precision) -> Self {
        if a == 0.0 {
            return if b == 0.0 { Self::None } else { Self::One(-c / b) };
        }

        let discriminant = b * b - 4.0 * a * c;
        let scale = (b * b).max((4.0 * a * c).abs());
        if discriminant.abs() <= scale * Precision::EPSILON * 4.0 {
            return Self::One(-b / (2.0 * a));
        }
        if discriminant < 0.0 {
            return Self::None;
        }

        // Avoid catastrophic cancellation between -b and the square root
        let q = -0.5 * (b + b.signum() * discriminant.sqrt());
        let (x1, x2) = if q == 0.0 {
            (0.0, 0.0)
        } else {
            (q / a, c / q)
        };
        if x1 <= x2 {
            Self::Two(x1, x2)
        } else {
            Self::Two(x2, x1)
        }
    }

    /// Iterate over the roots in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Precision> {
        let (first, second) = match *self {
            Self::None => (None, None),
            Self::One(x) => (Some(x), None),
            Self::Two(x1, x2) => (Some(x1), Some(x2)),
        };
        first.into_iter().chain(second)
    }

    /// Number of roots
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Two(..) => 2,
        }
    }

    /// Truth that there is no root
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parabola `y = curvature * (x - vertex.x)^2 + vertex.y`
///
/// This is the shape used for curves which must converge smoothly towards a
/// final value: the slope is zero at the vertex, so nothing visibly "snaps"
/// when the curve is replaced by a constant there.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quadratic {
    /// Extremum of the parabola
    pub vertex: Point,

    /// Second-order coefficient
    pub curvature: Precision,
}
//
impl Quadratic {
    /// Unique parabola with a given vertex which goes through another point
    pub fn through_vertex_and_point(vertex: Point, other: Point) -> Result<Self, EquationError> {
        let dx = other.x - vertex.x;
        if dx == 0.0 {
            return Err(EquationError::SameAbscissa(vertex, other));
        }
        Ok(Self {
            vertex,
            curvature: (other.y - vertex.y) / (dx * dx),
        })
    }

    /// Coefficients `[a, b, c]` of the expanded form `a x^2 + b x + c`
    pub fn coefficients(&self) -> [Precision; 3] {
        let Point { x: h, y: k } = self.vertex;
        let a = self.curvature;
        [a, -2.0 * a * h, a * h * h + k]
    }

    /// Values of x where the parabola reaches y
    pub fn solve_x(&self, y: Precision) -> Roots {
        let [a, b, c] = self.coefficients();
        if a == 0.0 {
            // Flat parabola, same convention as a flat line
            return Roots::None;
        }
        Roots::of(a, b, c - y)
    }
}
//
impl Evaluate for Quadratic {
    fn evaluate(&self, x: Precision) -> Precision {
        let dx = x - self.vertex.x;
        snapped_sum(self.vertex.y, self.curvature * dx * dx)
    }
}
