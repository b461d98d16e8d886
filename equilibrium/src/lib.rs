//! Chemical equilibrium legs
//!
//! A reaction with known stoichiometry and equilibrium constant is driven
//! from a set of initial concentrations to equilibrium over a time window.
//! This crate decides in which direction the reaction goes, solves for how
//! far it goes (the extent), and builds smooth per-species concentration
//! curves that reach the equilibrium concentrations at the end of the
//! window. Legs can be chained into a longer reaction history, and their
//! outcome can be turned into molecule counts on a discrete grid.

pub mod extent;
pub mod leg;
pub mod molecules;
pub mod quotient;
pub mod species;

pub use extent::{
    direction, solve_extent, solve_extent_numerically, Direction, Extent, SolutionMethod,
    SolverConfig,
};
pub use leg::{EquilibriumLeg, TimeWindow};
pub use molecules::{balance_leg, initial_molecules, MoleculeGrid};
pub use quotient::{quotient_equation, reaction_quotient};
pub use species::{
    AqueousSpecies, DissolvedSpecies, Side, Species, SpeciesConcentrations, SpeciesMap,
    StoichiometricCoefficients,
};

use equation::{EquationError, Precision};
use grid::GridError;
use thiserror::Error;

/// Errors that can occur while setting up or solving an equilibrium
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EquilibriumError {
    /// Stoichiometric coefficients must be at least 1
    #[error("species {species} has invalid stoichiometric coefficient {coefficient}")]
    InvalidCoefficient {
        species: &'static str,
        coefficient: u32,
    },

    /// Concentrations must be finite and non-negative
    #[error("species {species} has invalid concentration {value}")]
    InvalidConcentration {
        species: &'static str,
        value: Precision,
    },

    /// A per-species list did not have one entry per species
    #[error("expected {expected} species values, got {actual}")]
    WrongSpeciesCount { expected: usize, actual: usize },

    /// Equilibrium must be reached strictly after the reaction starts
    #[error("equilibrium time {equilibrium} must come after start time {start}")]
    InvalidTimeWindow {
        start: Precision,
        equilibrium: Precision,
    },

    /// No physically valid extent brings the reaction quotient to the
    /// equilibrium constant
    #[error("no reaction extent reaches equilibrium constant {constant} going {direction:?}")]
    Unsatisfiable {
        constant: Precision,
        direction: Direction,
    },

    /// A concentration curve could not be built
    #[error(transparent)]
    Curve(#[from] EquationError),

    /// Molecules could not be placed on the grid
    #[error(transparent)]
    Grid(#[from] GridError),
}
