//! Concentration laws of simple reaction kinetics
//!
//! A reaction of order `n` consumes its reactant at rate `k * C^n`. For the
//! orders that matter in practice, the concentration has a closed form:
//!
//! | Order | C(t)               | Half-life    |
//! |-------|--------------------|--------------|
//! | 0     | a0 - k t           | a0 / (2k)    |
//! | 1     | a0 exp(-k t)       | ln(2) / k    |
//! | 2     | 1 / (1/a0 + k t)   | 1 / (k a0)   |

use crate::{snapped_sum, Evaluate, Point, Precision};
use thiserror::Error;

/// Order of a reaction
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ReactionOrder {
    Zero,
    First,
    Second,
}
//
impl ReactionOrder {
    /// Exponent of the concentration in the rate law
    pub fn exponent(self) -> i32 {
        match self {
            Self::Zero => 0,
            Self::First => 1,
            Self::Second => 2,
        }
    }
}
//
impl TryFrom<u8> for ReactionOrder {
    type Error = KineticsError;

    fn try_from(order: u8) -> Result<Self, KineticsError> {
        match order {
            0 => Ok(Self::Zero),
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(KineticsError::UnsupportedOrder(other)),
        }
    }
}

/// Errors that can occur while setting up a concentration law
#[derive(Clone, Debug, Error, PartialEq)]
pub enum KineticsError {
    /// Only orders 0, 1 and 2 have a closed-form concentration law
    #[error("reaction order {0} is not supported")]
    UnsupportedOrder(u8),

    /// Rate constants must be strictly positive
    #[error("rate constant must be positive, got {0}")]
    NonPositiveRate(Precision),

    /// The initial concentration is out of the range allowed by the order
    #[error("initial concentration {value} is invalid for a reaction of order {order:?}")]
    InvalidInitialValue { order: ReactionOrder, value: Precision },

    /// A log- or reciprocal-based law was given a non-positive concentration
    #[error("concentration must be positive for a reaction of order {order:?}, got {value}")]
    NonPositiveConcentration { order: ReactionOrder, value: Precision },

    /// Two samples were taken at the same time
    #[error("both samples were taken at time {0}")]
    SameSampleTime(Precision),
}

/// Concentration of a reactant over time, for a reaction of order 0, 1 or 2
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConcentrationEquation {
    /// Order of the reaction
    order: ReactionOrder,

    /// Concentration at time 0
    initial_value: Precision,

    /// Rate constant k
    rate_constant: Precision,
}
//
impl ConcentrationEquation {
    /// Set up a concentration law from its initial value and rate constant
    pub fn new(
        order: ReactionOrder,
        initial_value: Precision,
        rate_constant: Precision,
    ) -> Result<Self, KineticsError> {
        if !(rate_constant > 0.0) {
            return Err(KineticsError::NonPositiveRate(rate_constant));
        }
        let valid_initial_value = match order {
            ReactionOrder::Zero | ReactionOrder::First => initial_value >= 0.0,
            ReactionOrder::Second => initial_value > 0.0,
        };
        if !valid_initial_value || !initial_value.is_finite() {
            return Err(KineticsError::InvalidInitialValue {
                order,
                value: initial_value,
            });
        }
        Ok(Self {
            order,
            initial_value,
            rate_constant,
        })
    }

    /// Derive a concentration law from two `(time, concentration)` samples
    ///
    /// The concentration must decrease between the samples, otherwise the
    /// derived rate constant would not be positive.
    pub fn from_samples(
        order: ReactionOrder,
        first: Point,
        second: Point,
    ) -> Result<Self, KineticsError> {
        let dt = second.x - first.x;
        if dt == 0.0 {
            return Err(KineticsError::SameSampleTime(first.x));
        }
        let (c1, c2) = (first.y, second.y);
        let rate_constant = match order {
            ReactionOrder::Zero => (c1 - c2) / dt,
            ReactionOrder::First => {
                Self::check_positive(order, c1)?;
                Self::check_positive(order, c2)?;
                (c1 / c2).ln() / dt
            }
            ReactionOrder::Second => {
                Self::check_positive(order, c1)?;
                Self::check_positive(order, c2)?;
                (1.0 / c2 - 1.0 / c1) / dt
            }
        };
        Self::through_point(order, rate_constant, first)
    }

    /// Concentration law with a given rate constant, which goes through
    /// `point = (time, concentration)`
    pub fn through_point(
        order: ReactionOrder,
        rate_constant: Precision,
        point: Point,
    ) -> Result<Self, KineticsError> {
        if !(rate_constant > 0.0) {
            return Err(KineticsError::NonPositiveRate(rate_constant));
        }
        let Point { x: t, y: c } = point;
        let initial_value = match order {
            ReactionOrder::Zero => c + rate_constant * t,
            ReactionOrder::First => c * (rate_constant * t).exp(),
            ReactionOrder::Second => {
                Self::check_positive(order, c)?;
                1.0 / (1.0 / c - rate_constant * t)
            }
        };
        Self::new(order, initial_value, rate_constant)
    }

    /// Same reaction, re-anchored so that the concentration is `c` at time `t`
    /// This is how a paused reaction is resumed towards a new target.
    pub fn shift_with(
        &self,
        concentration: Precision,
        time: Precision,
    ) -> Result<Self, KineticsError> {
        let anchor = Point::new(time, concentration);
        Self::through_point(self.order, self.rate_constant, anchor)
    }

    /// Order of the reaction
    pub fn order(&self) -> ReactionOrder {
        self.order
    }

    /// Concentration at time 0
    pub fn initial_value(&self) -> Precision {
        self.initial_value
    }

    /// Rate constant
    pub fn rate_constant(&self) -> Precision {
        self.rate_constant
    }

    /// Concentration at time `t`
    pub fn concentration(&self, time: Precision) -> Precision {
        self.evaluate(time)
    }

    /// Reaction rate at time `t`, i.e. `k * C(t)^order`
    pub fn rate(&self, time: Precision) -> Precision {
        self.rate_constant * self.concentration(time).powi(self.order.exponent())
    }

    /// Time it takes for the concentration to halve, starting from time 0
    pub fn half_life(&self) -> Precision {
        let (a0, k) = (self.initial_value, self.rate_constant);
        match self.order {
            ReactionOrder::Zero => a0 / (2.0 * k),
            ReactionOrder::First => std::f64::consts::LN_2 / k,
            ReactionOrder::Second => 1.0 / (k * a0),
        }
    }

    /// Time at which the concentration reaches `c`
    ///
    /// First and second order reactions only approach zero asymptotically,
    /// so `None` is returned for non-positive concentrations.
    pub fn time_for(&self, concentration: Precision) -> Option<Precision> {
        let (a0, k) = (self.initial_value, self.rate_constant);
        match self.order {
            ReactionOrder::Zero => Some((a0 - concentration) / k),
            ReactionOrder::First => {
                (concentration > 0.0 && a0 > 0.0).then(|| (a0 / concentration).ln() / k)
            }
            ReactionOrder::Second => {
                (concentration > 0.0).then(|| (1.0 / concentration - 1.0 / a0) / k)
            }
        }
    }

    fn check_positive(order: ReactionOrder, value: Precision) -> Result<(), KineticsError> {
        if value > 0.0 {
            Ok(())
        } else {
            Err(KineticsError::NonPositiveConcentration { order, value })
        }
    }
}
//
impl Evaluate for ConcentrationEquation {
    fn evaluate(&self, time: Precision) -> Precision {
        let (a0, k) = (self.initial_value, self.rate_constant);
        match self.order {
            ReactionOrder::Zero => snapped_sum(a0, -k * time),
            ReactionOrder::First => a0 * (-k * time).exp(),
            ReactionOrder::Second => 1.0 / (1.0 / a0 + k * time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ORDERS: [ReactionOrder; 3] = [
        ReactionOrder::Zero,
        ReactionOrder::First,
        ReactionOrder::Second,
    ];

    #[test]
    fn zero_order() {
        let eq = ConcentrationEquation::new(ReactionOrder::Zero, 10.0, 2.0).unwrap();
        assert_relative_eq!(eq.concentration(3.0), 4.0);
        assert_relative_eq!(eq.time_for(4.0).unwrap(), 3.0);
        assert_relative_eq!(eq.half_life(), 2.5);
        assert_relative_eq!(eq.rate(1.0), 2.0);
        assert_relative_eq!(eq.rate(4.0), 2.0);
    }

    #[test]
    fn first_order_through_sample() {
        let k = 0.3;
        let eq = ConcentrationEquation::through_point(
            ReactionOrder::First,
            k,
            Point::new(1.4, 1.23),
        )
        .unwrap();
        assert_relative_eq!(eq.concentration(1.4), 1.23, epsilon = 1e-12);
        assert_relative_eq!(eq.initial_value(), 1.23 * (k * 1.4).exp());
        assert_relative_eq!(eq.rate(1.4), k * 1.23, epsilon = 1e-12);
    }

    #[test]
    fn half_lives() {
        let first = ConcentrationEquation::new(ReactionOrder::First, 0.8, 0.25).unwrap();
        assert_relative_eq!(first.concentration(first.half_life()), 0.4, epsilon = 1e-12);

        let zero = ConcentrationEquation::new(ReactionOrder::Zero, 0.8, 0.25).unwrap();
        assert_relative_eq!(zero.concentration(zero.half_life()), 0.4, epsilon = 1e-12);

        let second = ConcentrationEquation::new(ReactionOrder::Second, 0.8, 0.25).unwrap();
        assert_relative_eq!(second.concentration(second.half_life()), 0.4, epsilon = 1e-12);
        assert_relative_eq!(second.half_life(), 5.0);
    }

    #[test]
    fn inverse_law() {
        for order in ORDERS {
            // Rate constants are scaled so that small initial values decay
            // over the same time span
            for a0 in [0.9, 1e-10] {
                let k = 0.07 * Precision::powi(a0 / 0.9, 1 - order.exponent());
                let eq = ConcentrationEquation::new(order, a0, k).unwrap();
                for t in [0.0, 0.5, 1.0, 3.7, 10.0] {
                    let c = eq.concentration(t);
                    assert!(c > 0.0);
                    assert_relative_eq!(eq.time_for(c).unwrap(), t, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn asymptotic_orders_never_reach_zero() {
        let first = ConcentrationEquation::new(ReactionOrder::First, 1.0, 1.0).unwrap();
        assert_eq!(first.time_for(0.0), None);
        let second = ConcentrationEquation::new(ReactionOrder::Second, 1.0, 1.0).unwrap();
        assert_eq!(second.time_for(-1.0), None);
        let zero = ConcentrationEquation::new(ReactionOrder::Zero, 1.0, 1.0).unwrap();
        assert_eq!(zero.time_for(0.0), Some(1.0));
    }

    #[test]
    fn from_samples() {
        for order in ORDERS {
            let reference = ConcentrationEquation::new(order, 1.0, 0.2).unwrap();
            let first = Point::new(1.0, reference.concentration(1.0));
            let second = Point::new(4.0, reference.concentration(4.0));
            let derived = ConcentrationEquation::from_samples(order, first, second).unwrap();
            assert_eq!(derived.order(), order);
            assert_relative_eq!(derived.rate_constant(), 0.2, epsilon = 1e-12);
            assert_relative_eq!(derived.initial_value(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn invalid_samples() {
        let same_time = ConcentrationEquation::from_samples(
            ReactionOrder::Zero,
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.5),
        );
        assert_eq!(same_time, Err(KineticsError::SameSampleTime(1.0)));

        let zero = ConcentrationEquation::from_samples(
            ReactionOrder::Second,
            Point::new(0.0, 1.0),
            Point::new(1.0, 0.0),
        );
        assert_eq!(
            zero,
            Err(KineticsError::NonPositiveConcentration {
                order: ReactionOrder::Second,
                value: 0.0
            })
        );

        let increasing = ConcentrationEquation::from_samples(
            ReactionOrder::First,
            Point::new(0.0, 0.5),
            Point::new(1.0, 1.0),
        );
        assert!(matches!(increasing, Err(KineticsError::NonPositiveRate(_))));
    }

    #[test]
    fn invalid_parameters() {
        assert_eq!(
            ConcentrationEquation::new(ReactionOrder::First, 1.0, 0.0),
            Err(KineticsError::NonPositiveRate(0.0))
        );
        assert!(ConcentrationEquation::new(ReactionOrder::Second, 0.0, 1.0).is_err());
        assert!(ConcentrationEquation::new(ReactionOrder::Zero, -1.0, 1.0).is_err());
        assert_eq!(
            ReactionOrder::try_from(3),
            Err(KineticsError::UnsupportedOrder(3))
        );
        assert_eq!(ReactionOrder::try_from(2), Ok(ReactionOrder::Second));
    }

    #[test]
    fn shift_with() {
        for order in ORDERS {
            let eq = ConcentrationEquation::new(order, 1.0, 0.1).unwrap();
            let shifted = eq.shift_with(0.5, 2.0).unwrap();
            assert_eq!(shifted.order(), order);
            assert_eq!(shifted.rate_constant(), 0.1);
            assert_relative_eq!(shifted.concentration(2.0), 0.5, epsilon = 1e-12);
        }
    }
}
