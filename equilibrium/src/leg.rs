//! Convergence of concentrations towards equilibrium over a time window

use crate::{
    extent::{solve_extent, Direction, Extent, SolverConfig},
    quotient::{quotient_equation, reaction_quotient},
    species::{Species, SpeciesConcentrations, SpeciesMap, StoichiometricCoefficients},
    EquilibriumError,
};
use equation::{Equation, EquationError, Evaluate, Point, Precision};
use log::debug;

/// Time interval over which a reaction converges to equilibrium
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeWindow {
    /// Time at which the reaction starts
    start: Precision,

    /// Time at which equilibrium is reached
    equilibrium: Precision,
}
//
impl TimeWindow {
    /// Set up a time window, which must not be empty
    pub fn new(start: Precision, equilibrium: Precision) -> Result<Self, EquilibriumError> {
        if !(start < equilibrium) {
            return Err(EquilibriumError::InvalidTimeWindow { start, equilibrium });
        }
        Ok(Self { start, equilibrium })
    }

    /// Time at which the reaction starts
    pub fn start(&self) -> Precision {
        self.start
    }

    /// Time at which equilibrium is reached
    pub fn equilibrium(&self) -> Precision {
        self.equilibrium
    }

    /// Duration of the convergence
    pub fn duration(&self) -> Precision {
        self.equilibrium - self.start
    }
}

/// One forward or reverse convergence towards equilibrium
///
/// Every species follows a parabola from its initial concentration at the
/// start of the window to its equilibrium concentration, which is the
/// vertex of the parabola, then stays flat. When the leg continues a
/// previous leg, the previous curves are used before the start of the
/// window.
#[derive(Clone, Debug, PartialEq)]
pub struct EquilibriumLeg<S: Species> {
    /// Stoichiometry of the reaction
    coefficients: StoichiometricCoefficients<S>,

    /// Equilibrium constant
    constant: Precision,

    /// Convergence time window
    window: TimeWindow,

    /// Concentrations at the start of the window
    initial: SpeciesConcentrations<S>,

    /// Solved reaction progress
    extent: Extent,

    /// Concentrations at equilibrium
    at_equilibrium: SpeciesConcentrations<S>,

    /// Concentration curves
    curves: SpeciesMap<S, Equation>,
}
//
impl<S: Species> EquilibriumLeg<S> {
    /// Solve a reaction leg with the default solver configuration
    pub fn new(
        coefficients: StoichiometricCoefficients<S>,
        constant: Precision,
        initial: SpeciesConcentrations<S>,
        window: TimeWindow,
    ) -> Result<Self, EquilibriumError> {
        Self::with_config(
            coefficients,
            constant,
            initial,
            window,
            &SolverConfig::default(),
        )
    }

    /// Solve a reaction leg with a custom solver configuration
    pub fn with_config(
        coefficients: StoichiometricCoefficients<S>,
        constant: Precision,
        initial: SpeciesConcentrations<S>,
        window: TimeWindow,
        config: &SolverConfig,
    ) -> Result<Self, EquilibriumError> {
        let extent = solve_extent(&coefficients, constant, &initial, config)?;
        let at_equilibrium = extent.concentrations(&coefficients, &initial)?;
        let curves = SpeciesMap::try_from_fn(|species| {
            convergence_curve(window, initial[species], at_equilibrium[species])
        })?;
        debug!(
            "Solved {:?} leg over [{}, {}] with extent {}: {:?} -> {:?}",
            extent.direction,
            window.start,
            window.equilibrium,
            extent.value,
            initial.as_map().values().collect::<Vec<_>>(),
            at_equilibrium.as_map().values().collect::<Vec<_>>(),
        );
        Ok(Self {
            coefficients,
            constant,
            window,
            initial,
            extent,
            at_equilibrium,
            curves,
        })
    }

    /// Continue a previous leg of the same reaction
    ///
    /// The new leg starts from `initial`, which usually comes from sampling
    /// the previous leg at the new start time, possibly with some species
    /// added or removed. The equilibrium constant may differ from the one
    /// of the previous leg.
    pub fn chained(
        previous: &Self,
        constant: Precision,
        initial: SpeciesConcentrations<S>,
        window: TimeWindow,
    ) -> Result<Self, EquilibriumError> {
        if window.start < previous.window.start {
            return Err(EquilibriumError::InvalidTimeWindow {
                start: window.start,
                equilibrium: window.equilibrium,
            });
        }
        let mut leg = Self::new(previous.coefficients.clone(), constant, initial, window)?;
        leg.curves = leg.curves.map(|species, curve| {
            Equation::switching(
                window.start,
                previous.curves[species].clone(),
                curve.clone(),
            )
        });
        Ok(leg)
    }

    /// Stoichiometry of the reaction
    pub fn coefficients(&self) -> &StoichiometricCoefficients<S> {
        &self.coefficients
    }

    /// Equilibrium constant
    pub fn constant(&self) -> Precision {
        self.constant
    }

    /// Convergence time window
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Direction of the reaction
    pub fn direction(&self) -> Direction {
        self.extent.direction
    }

    /// Solved reaction progress
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Concentrations at the start of the window
    pub fn initial_concentrations(&self) -> &SpeciesConcentrations<S> {
        &self.initial
    }

    /// Concentrations at equilibrium
    pub fn final_concentrations(&self) -> &SpeciesConcentrations<S> {
        &self.at_equilibrium
    }

    /// Concentration of a species as a function of time
    pub fn concentration(&self, species: S) -> &Equation {
        &self.curves[species]
    }

    /// Concentration curves of every species
    pub fn concentrations(&self) -> &SpeciesMap<S, Equation> {
        &self.curves
    }

    /// Concentration of every species at a certain time
    pub fn concentrations_at(&self, time: Precision) -> SpeciesMap<S, Precision> {
        self.curves.map(|_, curve| curve.evaluate(time))
    }

    /// Reaction quotient at a certain time
    pub fn quotient_at(&self, time: Precision) -> Precision {
        reaction_quotient(&self.concentrations_at(time), &self.coefficients)
    }

    /// Reaction quotient as a function of time
    pub fn quotient_equation(&self) -> Equation {
        quotient_equation(&self.curves, &self.coefficients)
    }
}

/// Curve from `start` at the beginning of the window to `end` at
/// equilibrium, flat afterwards
fn convergence_curve(
    window: TimeWindow,
    start: Precision,
    end: Precision,
) -> Result<Equation, EquationError> {
    Equation::convergence(
        Point::new(window.start, start),
        Point::new(window.equilibrium, end),
    )
}
