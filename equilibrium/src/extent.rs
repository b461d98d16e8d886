//! Reaction direction and extent
//!
//! Starting from initial concentrations `c_i`, a reaction which progressed
//! by an extent `x` has concentrations `c_i + x n_i` for the species it
//! produces and `c_i - x n_i` for the species it consumes, where `n_i` is the
//! stoichiometric coefficient. Equilibrium is reached at the extent where
//! the reaction quotient equals the equilibrium constant K.
//!
//! Instead of comparing Q to K, which is undefined when the reactant term
//! vanishes, the solver works with the cross-multiplied residual
//! `P(x) - K R(x)` (forward) or `K R(x) - P(x)` (reverse), where P and R are
//! the product and reactant terms of Q. Over the range of extents that keep
//! every concentration non-negative, this residual only increases with x, so
//! its root is unique and can be bracketed.

use crate::{
    quotient::mass_action_terms,
    species::{Side, Species, SpeciesConcentrations, SpeciesMap, StoichiometricCoefficients},
    EquilibriumError,
};
use equation::{snap_to_zero, Precision, Roots};
use log::{debug, trace, warn};

/// Direction in which a reaction proceeds towards equilibrium
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// Reactants are consumed and products are formed
    Forward,

    /// Products are consumed and reactants are formed
    Reverse,
}
//
impl Direction {
    /// Sign of the concentration change of species on a certain side
    pub fn sign(self, side: Side) -> Precision {
        match (self, side) {
            (Self::Forward, Side::Product) | (Self::Reverse, Side::Reactant) => 1.0,
            (Self::Forward, Side::Reactant) | (Self::Reverse, Side::Product) => -1.0,
        }
    }

    /// Side whose concentrations decrease
    pub fn consumed_side(self) -> Side {
        match self {
            Self::Forward => Side::Reactant,
            Self::Reverse => Side::Product,
        }
    }
}

/// Tuning of the numerical extent solver
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Bisection stops once the bracket is narrower than this fraction of
    /// its upper bound
    pub tolerance: Precision,

    /// Maximal number of bisection steps
    pub max_iterations: u32,
}
//
impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-13,
            max_iterations: 200,
        }
    }
}

/// How an extent was computed
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum SolutionMethod {
    /// Root of the quadratic residual of a unit-coefficient reaction
    ClosedForm,

    /// Bisection of the residual over the physically valid range
    Bisection,
}

/// Solved reaction progress towards equilibrium
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    /// Direction of the reaction
    pub direction: Direction,

    /// Amount of reaction progress, never negative
    pub value: Precision,

    /// How `value` was computed
    pub method: SolutionMethod,
}
//
impl Extent {
    /// Concentrations once the reaction has progressed by this extent
    pub fn concentrations<S: Species>(
        &self,
        coefficients: &StoichiometricCoefficients<S>,
        initial: &SpeciesConcentrations<S>,
    ) -> Result<SpeciesConcentrations<S>, EquilibriumError> {
        let reaction = Reaction {
            coefficients,
            initial,
            constant: 0.0,
            direction: self.direction,
        };
        SpeciesConcentrations::new(SpeciesMap::from_fn(|species| {
            let change = Precision::from(coefficients.get(species)) * self.value;
            snap_to_zero(
                reaction.concentration(species, self.value),
                initial[species].max(change),
            )
        }))
    }
}

/// Direction in which a reaction must go to reach equilibrium
///
/// The reaction goes forward if `Q0 < K`, reverse otherwise. A non-positive
/// constant cannot be reached by forward progress, so it always means
/// reverse. A vanishing reactant term with a non-zero product term behaves
/// as an infinite quotient.
pub fn direction<S: Species>(
    coefficients: &StoichiometricCoefficients<S>,
    constant: Precision,
    initial: &SpeciesConcentrations<S>,
) -> Direction {
    if !(constant > 0.0) {
        return Direction::Reverse;
    }
    let (products, reactants) = mass_action_terms(initial.as_map(), coefficients);
    let forward = if reactants == 0.0 {
        products == 0.0
    } else {
        products < constant * reactants
    };
    if forward {
        Direction::Forward
    } else {
        Direction::Reverse
    }
}

/// Extent at which a reaction reaches equilibrium
///
/// Reactions where every coefficient is 1 have a residual of degree at most
/// 2 and are solved in closed form. Others are solved by bisection.
pub fn solve_extent<S: Species>(
    coefficients: &StoichiometricCoefficients<S>,
    constant: Precision,
    initial: &SpeciesConcentrations<S>,
    config: &SolverConfig,
) -> Result<Extent, EquilibriumError> {
    let reaction = Reaction::new(coefficients, constant, initial)?;
    if coefficients.all_unit() {
        if let Some(extent) = reaction.closed_form() {
            return Ok(extent);
        }
    }
    reaction.bisection(config)
}

/// Extent at which a reaction reaches equilibrium, always using bisection
pub fn solve_extent_numerically<S: Species>(
    coefficients: &StoichiometricCoefficients<S>,
    constant: Precision,
    initial: &SpeciesConcentrations<S>,
    config: &SolverConfig,
) -> Result<Extent, EquilibriumError> {
    Reaction::new(coefficients, constant, initial)?.bisection(config)
}

/// Number of times the search range of an unbounded extent is doubled
/// before giving up
const MAX_RANGE_DOUBLINGS: u32 = 1100;

/// Equilibrium problem being solved
struct Reaction<'a, S: Species> {
    coefficients: &'a StoichiometricCoefficients<S>,
    initial: &'a SpeciesConcentrations<S>,
    constant: Precision,
    direction: Direction,
}
//
impl<'a, S: Species> Reaction<'a, S> {
    /// Check the constant and decide the direction
    fn new(
        coefficients: &'a StoichiometricCoefficients<S>,
        constant: Precision,
        initial: &'a SpeciesConcentrations<S>,
    ) -> Result<Self, EquilibriumError> {
        let direction = direction(coefficients, constant, initial);
        if !(constant >= 0.0 && constant.is_finite()) {
            return Err(EquilibriumError::Unsatisfiable {
                constant,
                direction,
            });
        }
        debug!("Reaction towards K = {constant} goes {direction:?}");
        Ok(Self {
            coefficients,
            initial,
            constant,
            direction,
        })
    }

    /// Concentration of a species after progressing by `extent`
    ///
    /// Consumed species reach exactly zero at `initial / coefficient`, the
    /// same expression as the upper bound of the extent.
    fn concentration(&self, species: S, extent: Precision) -> Precision {
        let initial = self.initial[species];
        let coefficient = Precision::from(self.coefficients.get(species));
        if species.side() == self.direction.consumed_side() {
            if extent >= initial / coefficient {
                0.0
            } else {
                initial - coefficient * extent
            }
        } else {
            initial + coefficient * extent
        }
    }

    /// Largest extent that keeps consumed species non-negative, if any
    /// species is consumed at all
    fn max_extent(&self) -> Option<Precision> {
        self.coefficients
            .iter()
            .filter(|(species, _)| species.side() == self.direction.consumed_side())
            .map(|(species, coefficient)| self.initial[species] / Precision::from(coefficient))
            .reduce(Precision::min)
    }

    /// Cross-multiplied distance to equilibrium, increasing with the extent
    fn residual(&self, extent: Precision) -> Precision {
        let concentrations = SpeciesMap::from_fn(|species| self.concentration(species, extent));
        let (products, reactants) = mass_action_terms(&concentrations, self.coefficients);
        match self.direction {
            Direction::Forward => products - self.constant * reactants,
            Direction::Reverse => self.constant * reactants - products,
        }
    }

    /// Upper bound of a range `[0, hi]` where the residual changes sign
    fn bracket(&self) -> Result<Precision, EquilibriumError> {
        let unsatisfiable = || EquilibriumError::Unsatisfiable {
            constant: self.constant,
            direction: self.direction,
        };
        if let Some(max_extent) = self.max_extent() {
            return if self.residual(max_extent) >= 0.0 {
                Ok(max_extent)
            } else {
                Err(unsatisfiable())
            };
        }

        // Nothing is consumed, e.g. a solid dissolving: the extent is only
        // bounded by the constant itself
        let mut hi = self.initial.as_map().values().sum::<Precision>().max(1.0);
        for _ in 0..MAX_RANGE_DOUBLINGS {
            if self.residual(hi) >= 0.0 {
                return Ok(hi);
            }
            hi *= 2.0;
            if !hi.is_finite() {
                break;
            }
        }
        Err(unsatisfiable())
    }

    /// Solve by bisection of the residual
    fn bisection(&self, config: &SolverConfig) -> Result<Extent, EquilibriumError> {
        let extent = |value| Extent {
            direction: self.direction,
            value,
            method: SolutionMethod::Bisection,
        };
        if self.residual(0.0) >= 0.0 {
            debug!("Reaction is already at equilibrium");
            return Ok(extent(0.0));
        }

        let (mut lo, mut hi) = (0.0, self.bracket()?);
        for iteration in 0..config.max_iterations {
            if hi - lo <= config.tolerance * hi {
                break;
            }
            let mid = lo + (hi - lo) / 2.0;
            if mid <= lo || mid >= hi {
                break;
            }
            let residual = self.residual(mid);
            trace!("Bisection step {iteration}: residual({mid}) = {residual}");
            if residual < 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let value = lo + (hi - lo) / 2.0;
        debug!("Extent {value} found by bisection");
        Ok(extent(value))
    }

    /// Solve a unit-coefficient reaction with the quadratic formula
    ///
    /// Returns `None` if the residual is not quadratic or if no root lies in
    /// the physically valid range.
    fn closed_form(&self) -> Option<Extent> {
        // Expand the residual as a polynomial in x, lowest degree first
        let side_polynomial = |side: Side| {
            self.coefficients
                .iter()
                .filter(|(species, _)| species.side() == side)
                .fold(vec![1.0], |poly, (species, _)| {
                    multiply(&poly, self.initial[species], self.direction.sign(side))
                })
        };
        let products = side_polynomial(Side::Product);
        let reactants = side_polynomial(Side::Reactant);
        let sign = match self.direction {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        };
        let terms = products.len().max(reactants.len());
        let residual = (0..terms)
            .map(|power| {
                let p = products.get(power).copied().unwrap_or(0.0);
                let r = reactants.get(power).copied().unwrap_or(0.0);
                sign * (p - self.constant * r)
            })
            .collect::<Vec<_>>();
        let [c, b, a] = match residual[..] {
            [c] => [c, 0.0, 0.0],
            [c, b] => [c, b, 0.0],
            [c, b, a] => [c, b, a],
            _ => return None,
        };

        let upper = self.max_extent().unwrap_or(Precision::INFINITY);
        let slack = 1e-9 * upper.min(1.0).max(Precision::MIN_POSITIVE);
        let roots = Roots::of(a, b, c);
        let best = roots
            .iter()
            .filter(|&x| x >= -slack && x <= upper + slack)
            .map(|x| x.clamp(0.0, upper))
            .min_by(|&x, &y| {
                self.residual(x)
                    .abs()
                    .total_cmp(&self.residual(y).abs())
            });
        match best {
            Some(value) => {
                debug!("Extent {value} found in closed form");
                Some(Extent {
                    direction: self.direction,
                    value,
                    method: SolutionMethod::ClosedForm,
                })
            }
            None => {
                warn!(
                    "No root of the equilibrium quadratic {roots:?} lies within [0, {upper}], \
                     falling back to bisection"
                );
                None
            }
        }
    }
}

/// Multiply a polynomial by `(constant + slope x)`
fn multiply(poly: &[Precision], constant: Precision, slope: Precision) -> Vec<Precision> {
    let mut result = vec![0.0; poly.len() + 1];
    for (power, &coefficient) in poly.iter().enumerate() {
        result[power] += coefficient * constant;
        result[power + 1] += coefficient * slope;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        quotient::reaction_quotient,
        species::{AqueousSpecies, DissolvedSpecies},
    };
    use approx::assert_relative_eq;

    type AqueousCoefficients = StoichiometricCoefficients<AqueousSpecies>;
    type DissolvedCoefficients = StoichiometricCoefficients<DissolvedSpecies>;

    fn aqueous(values: [Precision; 4]) -> SpeciesConcentrations<AqueousSpecies> {
        SpeciesConcentrations::from_slice(&values).unwrap()
    }

    fn dissolved(values: [Precision; 2]) -> SpeciesConcentrations<DissolvedSpecies> {
        SpeciesConcentrations::from_slice(&values).unwrap()
    }

    fn solve<S: Species>(
        coefficients: &StoichiometricCoefficients<S>,
        constant: Precision,
        initial: &SpeciesConcentrations<S>,
    ) -> Extent {
        solve_extent(coefficients, constant, initial, &SolverConfig::default()).unwrap()
    }

    fn assert_at_equilibrium<S: Species>(
        coefficients: &StoichiometricCoefficients<S>,
        constant: Precision,
        initial: &SpeciesConcentrations<S>,
        extent: &Extent,
    ) {
        let at_equilibrium = extent.concentrations(coefficients, initial).unwrap();
        assert_relative_eq!(
            reaction_quotient(at_equilibrium.as_map(), coefficients),
            constant,
            max_relative = 1e-6
        );
    }

    #[test]
    fn dissolution_from_pure_water() {
        let coefficients = DissolvedCoefficients::unit();
        let initial = dissolved([0.0, 0.0]);
        let extent = solve(&coefficients, 1e-3, &initial);
        assert_eq!(extent.direction, Direction::Forward);
        assert_eq!(extent.method, SolutionMethod::ClosedForm);
        assert_relative_eq!(extent.value, 1e-3f64.sqrt(), max_relative = 1e-12);
        assert_relative_eq!(extent.value, 0.0316, epsilon = 1e-4);
    }

    #[test]
    fn precipitation() {
        let coefficients = DissolvedCoefficients::unit();
        let initial = dissolved([0.1, 0.1]);
        let extent = solve(&coefficients, 1e-3, &initial);
        assert_eq!(extent.direction, Direction::Reverse);
        assert_relative_eq!(extent.value, 0.1 - 1e-3f64.sqrt(), max_relative = 1e-12);
        assert_at_equilibrium(&coefficients, 1e-3, &initial, &extent);
    }

    #[test]
    fn uneven_dissolution() {
        // x (2x)^2 = 4e-3 gives x = 0.1
        let coefficients = DissolvedCoefficients::from_slice(&[1, 2]).unwrap();
        let initial = dissolved([0.0, 0.0]);
        let extent = solve(&coefficients, 4e-3, &initial);
        assert_eq!(extent.method, SolutionMethod::Bisection);
        assert_relative_eq!(extent.value, 0.1, max_relative = 1e-10);
    }

    #[test]
    fn aqueous_directions() {
        let coefficients = AqueousCoefficients::unit();

        let forward = solve(&coefficients, 1.0, &aqueous([1.0, 1.0, 0.0, 0.0]));
        assert_eq!(forward.direction, Direction::Forward);
        assert_relative_eq!(forward.value, 0.5, max_relative = 1e-12);

        let reverse = solve(&coefficients, 1.0, &aqueous([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(reverse.direction, Direction::Reverse);
        assert_relative_eq!(reverse.value, 0.5, max_relative = 1e-12);

        let settled = solve(&coefficients, 1.0, &aqueous([0.5, 0.5, 0.5, 0.5]));
        assert_eq!(settled.direction, Direction::Reverse);
        assert_eq!(settled.value, 0.0);
    }

    #[test]
    fn direction_edge_cases() {
        let coefficients = AqueousCoefficients::unit();
        let initial = aqueous([0.2, 0.3, 0.1, 0.1]);
        assert_eq!(direction(&coefficients, 0.0, &initial), Direction::Reverse);
        assert_eq!(direction(&coefficients, -1.0, &initial), Direction::Reverse);
        assert_eq!(direction(&coefficients, 1.0, &initial), Direction::Forward);
        let no_reactant = aqueous([0.0, 0.3, 0.1, 0.1]);
        assert_eq!(direction(&coefficients, 1e9, &no_reactant), Direction::Reverse);
    }

    #[test]
    fn closed_form_agrees_with_bisection() {
        let config = SolverConfig::default();
        let aqueous_cases = [
            (1.0, [1.0, 1.0, 0.0, 0.0]),
            (0.25, [0.6, 0.3, 0.1, 0.0]),
            (7.5, [0.2, 0.9, 0.4, 0.05]),
            (1e-4, [0.0, 0.1, 0.5, 0.5]),
        ];
        for (constant, values) in aqueous_cases {
            let coefficients = AqueousCoefficients::unit();
            let initial = aqueous(values);
            let closed = solve_extent(&coefficients, constant, &initial, &config).unwrap();
            let numeric =
                solve_extent_numerically(&coefficients, constant, &initial, &config).unwrap();
            assert_eq!(closed.method, SolutionMethod::ClosedForm);
            assert_eq!(numeric.method, SolutionMethod::Bisection);
            assert_eq!(closed.direction, numeric.direction);
            assert_relative_eq!(closed.value, numeric.value, max_relative = 1e-9);
            assert_at_equilibrium(&coefficients, constant, &initial, &closed);
        }

        for (constant, values) in [(1e-3, [0.0, 0.0]), (2e-5, [0.01, 0.0]), (0.5, [1.0, 2.0])] {
            let coefficients = DissolvedCoefficients::unit();
            let initial = dissolved(values);
            let closed = solve_extent(&coefficients, constant, &initial, &config).unwrap();
            let numeric =
                solve_extent_numerically(&coefficients, constant, &initial, &config).unwrap();
            assert_relative_eq!(closed.value, numeric.value, max_relative = 1e-9);
        }
    }

    #[test]
    fn extent_grows_with_disequilibrium() {
        let coefficients = AqueousCoefficients::unit();
        let initial = aqueous([1.0, 1.0, 0.0, 0.0]);
        let mut previous = 0.0;
        for constant in [1e-3, 0.1, 1.0, 10.0, 1e3] {
            let extent = solve(&coefficients, constant, &initial);
            assert!(extent.value >= previous);
            // x^2 / (1 - x)^2 = K
            let root = constant.sqrt();
            assert_relative_eq!(extent.value, root / (1.0 + root), max_relative = 1e-9);
            previous = extent.value;
        }

        let coefficients = AqueousCoefficients::from_slice(&[2, 1, 1, 2]).unwrap();
        let initial = aqueous([0.1, 0.2, 0.8, 0.9]);
        let mut previous = 0.0;
        for constant in [10.0, 1.0, 0.1, 1e-2, 1e-3] {
            let extent = solve(&coefficients, constant, &initial);
            assert_eq!(extent.direction, Direction::Reverse);
            assert!(extent.value >= previous);
            previous = extent.value;
        }
    }

    #[test]
    fn general_coefficients_reach_equilibrium() {
        let cases = [
            ([2, 1, 3, 1], 2.0, [1.0, 1.0, 0.1, 0.1]),
            ([1, 3, 2, 1], 0.05, [0.4, 0.9, 0.0, 0.0]),
            ([2, 2, 1, 1], 100.0, [0.3, 0.5, 0.2, 0.1]),
            ([1, 1, 2, 2], 1e-2, [0.05, 0.05, 0.6, 0.6]),
        ];
        for (coefficients, constant, values) in cases {
            let coefficients = AqueousCoefficients::from_slice(&coefficients).unwrap();
            let initial = aqueous(values);
            let extent = solve(&coefficients, constant, &initial);
            assert_eq!(extent.method, SolutionMethod::Bisection);
            assert_at_equilibrium(&coefficients, constant, &initial, &extent);
        }
    }

    #[test]
    fn negative_constant_is_unsatisfiable() {
        let coefficients = AqueousCoefficients::unit();
        let initial = aqueous([0.2, 0.3, 0.1, 0.1]);
        assert_eq!(
            solve_extent(&coefficients, -1.0, &initial, &SolverConfig::default()),
            Err(EquilibriumError::Unsatisfiable {
                constant: -1.0,
                direction: Direction::Reverse
            })
        );
        assert!(solve_extent_numerically(
            &coefficients,
            Precision::NAN,
            &initial,
            &SolverConfig::default()
        )
        .is_err());
    }

    #[test]
    fn zero_constant_consumes_products() {
        let coefficients = AqueousCoefficients::unit();
        let initial = aqueous([0.2, 0.3, 0.1, 0.4]);
        let extent = solve(&coefficients, 0.0, &initial);
        assert_eq!(extent.direction, Direction::Reverse);
        assert_relative_eq!(extent.value, 0.1, max_relative = 1e-9);
        let at_equilibrium = extent.concentrations(&coefficients, &initial).unwrap();
        assert_eq!(at_equilibrium[AqueousSpecies::C], 0.0);
    }
}
