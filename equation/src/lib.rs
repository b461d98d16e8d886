//! Scalar functions of a single continuous parameter
//!
//! Everything that the reaction visualizations draw is ultimately a function
//! `y = f(x)` of time or reaction progress. This crate provides a small closed
//! set of such functions, which can be combined into piecewise and
//! arithmetic compositions, as well as the concentration laws of zero, first
//! and second order reaction kinetics.

pub mod kinetics;
pub mod quadratic;

pub use kinetics::{ConcentrationEquation, KineticsError, ReactionOrder};
pub use quadratic::{Quadratic, Roots};

use std::{ops::RangeInclusive, sync::Arc};
use thiserror::Error;

/// Computation precision
pub type Precision = f64;

/// Results smaller than this fraction of the terms they were computed from
/// are reported as exactly zero
pub const SNAP_EPSILON: Precision = 1e-9;

/// Snap cancellation residue to exactly zero
///
/// Sums and differences of nearly equal terms leave rounding residue, which
/// would otherwise show up as `-0.000` once formatted. `scale` is the
/// magnitude of the largest term. Values which are small in absolute terms
/// but not next to their operands, like a solubility product, are kept.
#[inline]
pub fn snap_to_zero(value: Precision, scale: Precision) -> Precision {
    if value.abs() <= SNAP_EPSILON * scale.abs() {
        0.0
    } else {
        value
    }
}

/// Sum of two terms, with cancellation residue snapped to zero
#[inline]
pub fn snapped_sum(lhs: Precision, rhs: Precision) -> Precision {
    snap_to_zero(lhs + rhs, lhs.abs().max(rhs.abs()))
}

/// Something that can be evaluated as `y = f(x)`
///
/// Implementations must be pure: evaluating twice at the same `x` gives the
/// same `y`. They are defined for all real `x`, and will happily extrapolate
/// outside of the range which they were designed for.
pub trait Evaluate {
    /// Compute `f(x)`
    fn evaluate(&self, x: Precision) -> Precision;

    /// Sample `count` evenly spaced `(x, f(x))` pairs across `range`
    ///
    /// Both ends of the range are included when `count >= 2`. A single
    /// sample is taken at the start of the range.
    fn sample(&self, range: RangeInclusive<Precision>, count: usize) -> Vec<Point> {
        evenly_spaced(range, count)
            .map(|x| Point::new(x, self.evaluate(x)))
            .collect()
    }
}

/// `count` evenly spaced values across `range`
///
/// Both ends of the range are included when `count >= 2`, with the last
/// value being exactly the end of the range. A single value is taken at the
/// start of the range.
pub fn evenly_spaced(
    range: RangeInclusive<Precision>,
    count: usize,
) -> impl Iterator<Item = Precision> {
    let (start, end) = range.into_inner();
    let step = if count > 1 {
        (end - start) / (count - 1) as Precision
    } else {
        0.0
    };
    (0..count).map(move |idx| {
        if idx + 1 == count && count > 1 {
            end
        } else {
            start + step * idx as Precision
        }
    })
}

/// A point of the (x, y) plane
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// Abscissa, usually time
    pub x: Precision,

    /// Ordinate, usually a concentration or a fraction
    pub y: Precision,
}
//
impl Point {
    /// Build a point from its coordinates
    pub const fn new(x: Precision, y: Precision) -> Self {
        Self { x, y }
    }
}
//
impl From<(Precision, Precision)> for Point {
    fn from((x, y): (Precision, Precision)) -> Self {
        Self { x, y }
    }
}

/// Errors that can occur while building an equation
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EquationError {
    /// Two points defining a shape share the same abscissa
    #[error("points {0:?} and {1:?} have the same x coordinate")]
    SameAbscissa(Point, Point),

    /// A kinetics law could not be built
    #[error(transparent)]
    Kinetics(#[from] KineticsError),
}

/// Straight line `y = y0 + slope * (x - x0)`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Linear {
    /// Rate of change of y with respect to x
    pub slope: Precision,

    /// Any point of the line
    pub point: Point,
}
//
impl Linear {
    /// Line with a certain slope going through a certain point
    pub const fn new(slope: Precision, point: Point) -> Self {
        Self { slope, point }
    }

    /// Line going through two points
    pub fn through(first: Point, second: Point) -> Result<Self, EquationError> {
        if first.x == second.x {
            return Err(EquationError::SameAbscissa(first, second));
        }
        let slope = (second.y - first.y) / (second.x - first.x);
        Ok(Self::new(slope, first))
    }

    /// Value of x where the line reaches y, if any
    ///
    /// A flat line only "reaches" its own height, and has no unique solution
    /// there, so `None` is returned in both cases.
    pub fn solve_x(&self, y: Precision) -> Option<Precision> {
        (self.slope != 0.0).then(|| self.point.x + (y - self.point.y) / self.slope)
    }
}
//
impl Evaluate for Linear {
    fn evaluate(&self, x: Precision) -> Precision {
        snapped_sum(self.point.y, self.slope * (x - self.point.x))
    }
}

/// Binary arithmetic operation used to combine two equations
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// lhs + rhs
    Sum,

    /// lhs - rhs
    Difference,

    /// lhs * rhs
    Product,

    /// lhs / rhs, defined as zero when rhs is zero
    Quotient,
}
//
impl Operation {
    /// Apply this operation to two numbers
    ///
    /// Sums and differences snap cancellation residue to zero. Products and
    /// quotients are exact up to rounding, so they are left alone.
    pub fn apply(self, lhs: Precision, rhs: Precision) -> Precision {
        match self {
            Self::Sum => snapped_sum(lhs, rhs),
            Self::Difference => snapped_sum(lhs, -rhs),
            Self::Product => lhs * rhs,
            Self::Quotient => {
                if rhs == 0.0 {
                    0.0
                } else {
                    lhs / rhs
                }
            }
        }
    }
}

/// Scalar function of a single real parameter
///
/// The set of shapes is deliberately closed, so that constructors can
/// simplify expressions by pattern matching (e.g. folding arithmetic on
/// constants). Sub-equations are reference counted, which makes it cheap to
/// embed an existing curve into a larger piecewise history without copying
/// it, and keeps previously handed out curves valid.
#[derive(Clone, Debug, PartialEq)]
pub enum Equation {
    /// Same value everywhere
    Constant(Precision),

    /// Straight line
    Linear(Linear),

    /// Parabola defined by its vertex
    Quadratic(Quadratic),

    /// Concentration law of a reaction of order 0, 1 or 2
    Kinetics(ConcentrationEquation),

    /// `left` below `threshold`, `right` at and above it
    Switching {
        threshold: Precision,
        left: Arc<Equation>,
        right: Arc<Equation>,
    },

    /// Arithmetic combination of two equations
    Combine {
        lhs: Arc<Equation>,
        operation: Operation,
        rhs: Arc<Equation>,
    },
}
//
impl Equation {
    /// Piecewise equation that switches from `left` to `right` at `threshold`
    pub fn switching(
        threshold: Precision,
        left: impl Into<Arc<Self>>,
        right: impl Into<Arc<Self>>,
    ) -> Self {
        Self::Switching {
            threshold,
            left: left.into(),
            right: right.into(),
        }
    }

    /// Curve going from `from` to `to` along a parabola, then flat
    ///
    /// The parabola has its vertex at `to`, so the curve reaches its final
    /// value with zero slope and nothing jumps when it turns into a
    /// constant at `to.x`. Curves between equal values are constant.
    pub fn convergence(from: Point, to: Point) -> Result<Self, EquationError> {
        let parabola = Quadratic::through_vertex_and_point(to, from)?;
        if from.y == to.y {
            return Ok(Self::Constant(to.y));
        }
        Ok(Self::switching(
            to.x,
            Self::from(parabola),
            Self::Constant(to.y),
        ))
    }

    /// Arithmetic combination of two equations
    ///
    /// Operations between two constants are folded into a single constant.
    pub fn combine(
        lhs: impl Into<Arc<Self>>,
        operation: Operation,
        rhs: impl Into<Arc<Self>>,
    ) -> Self {
        let (lhs, rhs) = (lhs.into(), rhs.into());
        if let (Self::Constant(l), Self::Constant(r)) = (&*lhs, &*rhs) {
            return Self::Constant(operation.apply(*l, *r));
        }
        Self::Combine { lhs, operation, rhs }
    }

    /// Raise an equation to a non-negative integer power
    pub fn power(base: impl Into<Arc<Self>>, exponent: u32) -> Self {
        let base = base.into();
        match exponent {
            0 => Self::Constant(1.0),
            1 => Arc::unwrap_or_clone(base),
            _ => (1..exponent).fold(Arc::unwrap_or_clone(base.clone()), |acc, _| {
                Self::combine(acc, Operation::Product, base.clone())
            }),
        }
    }

    /// Truth that this equation is a constant
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}
//
impl Evaluate for Equation {
    fn evaluate(&self, x: Precision) -> Precision {
        match self {
            Self::Constant(value) => *value,
            Self::Linear(linear) => linear.evaluate(x),
            Self::Quadratic(quadratic) => quadratic.evaluate(x),
            Self::Kinetics(kinetics) => kinetics.evaluate(x),
            Self::Switching {
                threshold,
                left,
                right,
            } => {
                if x < *threshold {
                    left.evaluate(x)
                } else {
                    right.evaluate(x)
                }
            }
            Self::Combine {
                lhs,
                operation,
                rhs,
            } => operation.apply(lhs.evaluate(x), rhs.evaluate(x)),
        }
    }
}
//
impl From<Precision> for Equation {
    fn from(value: Precision) -> Self {
        Self::Constant(value)
    }
}
//
impl From<Linear> for Equation {
    fn from(linear: Linear) -> Self {
        Self::Linear(linear)
    }
}
//
impl From<Quadratic> for Equation {
    fn from(quadratic: Quadratic) -> Self {
        Self::Quadratic(quadratic)
    }
}
//
impl From<ConcentrationEquation> for Equation {
    fn from(kinetics: ConcentrationEquation) -> Self {
        Self::Kinetics(kinetics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant() {
        let eq = Equation::Constant(4.2);
        assert_eq!(eq.evaluate(-1e6), 4.2);
        assert_eq!(eq.evaluate(3.0), 4.2);
    }

    #[test]
    fn linear_through_points() {
        let line = Linear::through(Point::new(1.0, 2.0), Point::new(3.0, 6.0)).unwrap();
        assert_relative_eq!(line.slope, 2.0);
        assert_relative_eq!(line.evaluate(0.0), 0.0);
        assert_relative_eq!(line.evaluate(10.0), 20.0);
        assert_relative_eq!(line.solve_x(8.0).unwrap(), 4.0);

        let flat = Linear::new(0.0, Point::new(0.0, 1.0));
        assert_eq!(flat.solve_x(1.0), None);

        assert_eq!(
            Linear::through(Point::new(1.0, 2.0), Point::new(1.0, 3.0)),
            Err(EquationError::SameAbscissa(
                Point::new(1.0, 2.0),
                Point::new(1.0, 3.0)
            ))
        );
    }

    #[test]
    fn near_zero_results_are_snapped() {
        // 0.3 - 0.1 * 3 leaves a residue of about 5e-17
        let line = Linear::new(-0.1, Point::new(0.0, 0.3));
        assert_eq!(line.evaluate(3.0).to_bits(), 0.0f64.to_bits());
        let diff = Equation::combine(
            Equation::Linear(Linear::new(1.0, Point::new(0.0, 0.1))),
            Operation::Difference,
            Equation::Linear(Linear::new(1.0, Point::new(0.0, 0.1 + 1e-12))),
        );
        assert_eq!(diff.evaluate(5.0).to_bits(), 0.0f64.to_bits());
        assert_eq!(
            Equation::combine(
                Equation::from(0.1 + 0.2),
                Operation::Difference,
                Equation::from(0.3)
            ),
            Equation::Constant(0.0)
        );
    }

    #[test]
    fn small_results_are_kept() {
        let tiny = Linear::new(0.0, Point::new(0.0, 1e-12));
        assert_eq!(tiny.evaluate(4.0), 1e-12);
        let x = Equation::Linear(Linear::new(1e-6, Point::new(0.0, 0.0)));
        let square = Equation::combine(x.clone(), Operation::Product, x.clone());
        assert_relative_eq!(square.evaluate(1.0), 1e-12, max_relative = 1e-12);
        let ratio = Equation::combine(square, Operation::Quotient, Equation::from(1e-4));
        assert_relative_eq!(ratio.evaluate(1.0), 1e-8, max_relative = 1e-12);
        let folded = Equation::combine(
            Equation::from(1.8e-10),
            Operation::Product,
            Equation::from(1e-30),
        );
        assert!(folded.is_constant());
        assert_relative_eq!(folded.evaluate(0.0), 1.8e-40, max_relative = 1e-12);
        let difference = Equation::combine(
            Equation::from(3e-10),
            Operation::Difference,
            Equation::from(1e-10),
        );
        assert_relative_eq!(difference.evaluate(0.0), 2e-10, max_relative = 1e-12);
    }

    #[test]
    fn convergence() {
        let curve = Equation::convergence(Point::new(0.0, 1.0), Point::new(10.0, 0.5)).unwrap();
        assert_relative_eq!(curve.evaluate(0.0), 1.0);
        assert_relative_eq!(curve.evaluate(5.0), 0.625);
        assert_eq!(curve.evaluate(10.0), 0.5);
        assert_eq!(curve.evaluate(20.0), 0.5);

        let tiny = Equation::convergence(Point::new(0.0, 0.0), Point::new(10.0, 1e-10)).unwrap();
        assert_relative_eq!(tiny.evaluate(10.0), 1e-10);
        assert_relative_eq!(tiny.evaluate(5.0), 0.75e-10, max_relative = 1e-12);

        let flat = Equation::convergence(Point::new(0.0, 0.3), Point::new(10.0, 0.3)).unwrap();
        assert_eq!(flat, Equation::Constant(0.3));
        assert!(Equation::convergence(Point::new(1.0, 0.0), Point::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn switching() {
        let eq = Equation::switching(2.0, Equation::Constant(1.0), Equation::Constant(3.0));
        assert_eq!(eq.evaluate(1.999), 1.0);
        assert_eq!(eq.evaluate(2.0), 3.0);
        assert_eq!(eq.evaluate(10.0), 3.0);
    }

    #[test]
    fn combine() {
        let x = Equation::Linear(Linear::new(1.0, Point::new(0.0, 0.0)));
        let two = Equation::Constant(2.0);
        let sum = Equation::combine(x.clone(), Operation::Sum, two.clone());
        let product = Equation::combine(x.clone(), Operation::Product, two.clone());
        let quotient = Equation::combine(two.clone(), Operation::Quotient, x.clone());
        assert_relative_eq!(sum.evaluate(3.0), 5.0);
        assert_relative_eq!(product.evaluate(3.0), 6.0);
        assert_relative_eq!(quotient.evaluate(4.0), 0.5);
        assert_eq!(quotient.evaluate(0.0), 0.0);
    }

    #[test]
    fn constants_are_folded() {
        let folded = Equation::combine(
            Equation::from(2.0),
            Operation::Product,
            Equation::from(3.0),
        );
        assert_eq!(folded, Equation::Constant(6.0));
        assert!(Equation::power(Equation::Constant(2.0), 3).is_constant());
        assert_eq!(Equation::power(Equation::Constant(2.0), 3).evaluate(0.0), 8.0);
    }

    #[test]
    fn power() {
        let x = Equation::Linear(Linear::new(1.0, Point::new(0.0, 0.0)));
        assert_eq!(Equation::power(x.clone(), 0).evaluate(7.0), 1.0);
        assert_relative_eq!(Equation::power(x.clone(), 1).evaluate(7.0), 7.0);
        assert_relative_eq!(Equation::power(x, 3).evaluate(2.0), 8.0);
    }

    #[test]
    fn sample() {
        let line = Linear::new(2.0, Point::new(0.0, 0.0));
        let samples = line.sample(0.0..=1.0, 5);
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], Point::new(0.0, 0.0));
        assert_eq!(samples[4], Point::new(1.0, 2.0));
        assert_relative_eq!(samples[2].y, 1.0);
        assert_eq!(line.sample(0.0..=1.0, 1), vec![Point::new(0.0, 0.0)]);
        assert!(line.sample(0.0..=1.0, 0).is_empty());
    }
}
