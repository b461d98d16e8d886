//! Molecules drawn on a grid for a reaction leg
//!
//! Concentrations are interpreted as fractions of the grid: a concentration
//! of 0.25 on a 100-position grid is drawn as 25 molecules.

use crate::{
    leg::EquilibriumLeg,
    species::{Species, SpeciesMap},
    EquilibriumError,
};
use equation::Precision;
use grid::{BalancedGridElement, GridBalancer, GridCoordinate, GridElementToBalance, GridPool};
use log::warn;

/// Place the molecules of every species before any reaction has happened
///
/// Species are served in order, each taking the next unused positions of
/// the pool. If the grid is too small, later species get fewer molecules.
pub fn initial_molecules<S: Species>(
    concentrations: &SpeciesMap<S, Precision>,
    pool: &GridPool,
) -> Result<SpeciesMap<S, Vec<GridCoordinate>>, EquilibriumError> {
    let mut remaining = pool.ordering();
    let mut molecules = Vec::with_capacity(S::ALL.len());
    for (species, &concentration) in concentrations.iter() {
        let wanted = pool.count_for_fraction(concentration)?;
        let count = wanted.min(remaining.len());
        if count < wanted {
            warn!(
                "Only {count} of {wanted} {} molecules fit on the grid",
                species.name()
            );
        }
        let (taken, rest) = remaining.split_at(count);
        molecules.push(taken.to_vec());
        remaining = rest;
    }
    SpeciesMap::try_from(molecules)
}

/// Move molecules between species so that they follow a reaction leg
///
/// `held` are the positions currently drawn for each species, for example
/// the output of [`initial_molecules`] or the final positions of the
/// previous leg. Molecule counts go from there to the equilibrium
/// concentrations of the leg over its time window.
pub fn balance_leg<S: Species>(
    leg: &EquilibriumLeg<S>,
    pool: &GridPool,
    held: &SpeciesMap<S, Vec<GridCoordinate>>,
) -> Result<MoleculeGrid<S>, EquilibriumError> {
    let window = leg.window();
    let balancer = GridBalancer::new(window.start(), window.equilibrium())?;
    let targets = S::ALL
        .iter()
        .map(|&species| {
            GridElementToBalance::from_fraction(
                held[species].clone(),
                leg.final_concentrations()[species],
                pool,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let balance = balancer.balance(pool, &targets)?;
    let count_clamped = balance.count_clamped();
    Ok(MoleculeGrid {
        elements: SpeciesMap::try_from(balance.into_elements())?,
        count_clamped,
    })
}

/// Molecules of every species over one reaction leg
#[derive(Clone, Debug, PartialEq)]
pub struct MoleculeGrid<S: Species> {
    /// Balanced positions of each species
    elements: SpeciesMap<S, BalancedGridElement>,

    /// Truth that some molecule counts had to be reduced to fit the grid
    count_clamped: bool,
}
//
impl<S: Species> MoleculeGrid<S> {
    /// Balanced positions of a species
    pub fn element(&self, species: S) -> &BalancedGridElement {
        &self.elements[species]
    }

    /// Number of molecules of each species drawn at a certain time
    pub fn visible_counts(&self, time: Precision) -> SpeciesMap<S, usize> {
        self.elements.map(|_, element| element.visible_count(time))
    }

    /// Positions drawn at the end of the leg, to feed the next leg
    pub fn final_coords(&self) -> SpeciesMap<S, Vec<GridCoordinate>> {
        self.elements.map(|_, element| element.final_coords().to_vec())
    }

    /// Truth that some molecule counts had to be reduced to fit the grid
    pub fn count_clamped(&self) -> bool {
        self.count_clamped
    }
}
